//! Federation-Routing-Tabelle
//!
//! Pro Kanal die Menge der Nachbarserver, die an diesem Kanal interessiert
//! sind. Nachbarn existieren genau einmal in der Registry; Eintraege
//! referenzieren sie ueber ihren Endpunkt, sodass ein `last_active`-Update
//! in jedem Eintrag sichtbar ist.

use duckfed_core::ChannelName;
use std::collections::{BTreeMap, BTreeSet};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Ein benachbarter Server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighbor {
    pub endpoint: SocketAddr,
    /// Zeitpunkt des letzten empfangenen Datagramms
    pub last_active: Instant,
    /// `false` nachdem der Nachbar wegen Stille entfernt wurde
    pub active: bool,
}

/// Interessierte Nachbarn eines Kanals
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingEntry {
    nachbarn: BTreeSet<SocketAddr>,
}

impl RoutingEntry {
    pub fn nachbarn(&self) -> impl Iterator<Item = SocketAddr> + '_ {
        self.nachbarn.iter().copied()
    }

    pub fn enthaelt(&self, endpoint: SocketAddr) -> bool {
        self.nachbarn.contains(&endpoint)
    }

    pub fn len(&self) -> usize {
        self.nachbarn.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nachbarn.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct RoutingTable {
    registry: BTreeMap<SocketAddr, Neighbor>,
    eintraege: BTreeMap<ChannelName, RoutingEntry>,
}

impl RoutingTable {
    pub fn neu() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Nachbar-Registry
    // -----------------------------------------------------------------------

    /// Nimmt einen Nachbarn in die Registry auf
    ///
    /// Gibt `true` zurueck, wenn der Endpunkt neu war. Bekannte Nachbarn
    /// bleiben unveraendert.
    pub fn nachbar_registrieren(&mut self, endpoint: SocketAddr, now: Instant) -> bool {
        if self.registry.contains_key(&endpoint) {
            return false;
        }
        self.registry.insert(
            endpoint,
            Neighbor {
                endpoint,
                last_active: now,
                active: true,
            },
        );
        tracing::info!(nachbar = %endpoint, "Nachbar registriert");
        true
    }

    /// Vermerkt Aktivitaet eines bekannten Nachbarn
    ///
    /// Gibt `false` zurueck, wenn der Endpunkt kein Nachbar ist.
    pub fn refresh(&mut self, endpoint: SocketAddr, now: Instant) -> bool {
        match self.registry.get_mut(&endpoint) {
            Some(nachbar) => {
                if !nachbar.active {
                    tracing::info!(nachbar = %endpoint, "Nachbar wieder aktiv");
                }
                nachbar.last_active = now;
                nachbar.active = true;
                true
            }
            None => false,
        }
    }

    pub fn is_neighbor(&self, endpoint: SocketAddr) -> bool {
        self.registry.contains_key(&endpoint)
    }

    /// Alle bekannten Nachbarn in stabiler Reihenfolge
    pub fn known_neighbors(&self) -> Vec<SocketAddr> {
        self.registry.keys().copied().collect()
    }

    pub fn nachbar(&self, endpoint: SocketAddr) -> Option<&Neighbor> {
        self.registry.get(&endpoint)
    }

    // -----------------------------------------------------------------------
    // Eintraege
    // -----------------------------------------------------------------------

    pub fn entry_for(&self, kanal: &ChannelName) -> Option<&RoutingEntry> {
        self.eintraege.get(kanal)
    }

    pub fn get_or_create(&mut self, kanal: &ChannelName) -> &mut RoutingEntry {
        self.eintraege.entry(kanal.clone()).or_insert_with(|| {
            tracing::debug!(kanal = %kanal, "Routing-Eintrag angelegt");
            RoutingEntry::default()
        })
    }

    /// Traegt einen Nachbarn als interessiert ein (idempotent)
    ///
    /// Unbekannte Endpunkte werden dabei registriert, bekannte aufgefrischt.
    pub fn add_neighbor(&mut self, kanal: &ChannelName, endpoint: SocketAddr, now: Instant) {
        if !self.nachbar_registrieren(endpoint, now) {
            self.refresh(endpoint, now);
        }
        if self.get_or_create(kanal).nachbarn.insert(endpoint) {
            tracing::debug!(kanal = %kanal, nachbar = %endpoint, "Nachbar zum Routing-Eintrag");
        }
    }

    /// Entfernt einen Nachbarn aus einem Eintrag
    pub fn remove_neighbor(&mut self, kanal: &ChannelName, endpoint: SocketAddr) -> bool {
        let entfernt = self
            .eintraege
            .get_mut(kanal)
            .is_some_and(|e| e.nachbarn.remove(&endpoint));
        if entfernt {
            tracing::debug!(kanal = %kanal, nachbar = %endpoint, "Nachbar aus Routing-Eintrag");
        }
        entfernt
    }

    /// Loescht einen Eintrag bedingungslos
    pub fn delete_entry(&mut self, kanal: &ChannelName) -> Option<RoutingEntry> {
        let eintrag = self.eintraege.remove(kanal);
        if eintrag.is_some() {
            tracing::debug!(kanal = %kanal, "Routing-Eintrag geloescht");
        }
        eintrag
    }

    /// Loescht den Eintrag, falls er keine Nachbarn und der Kanal keine
    /// lokalen Mitglieder hat
    pub fn delete_if_unused(&mut self, kanal: &ChannelName, lokale_mitglieder: usize) -> bool {
        let leer = self.eintraege.get(kanal).is_some_and(RoutingEntry::is_empty);
        if leer && lokale_mitglieder == 0 {
            self.delete_entry(kanal);
            return true;
        }
        false
    }

    /// Kanaele mit Routing-Eintrag
    pub fn kanaele(&self) -> Vec<ChannelName> {
        self.eintraege.keys().cloned().collect()
    }

    pub fn eintrag_anzahl(&self) -> usize {
        self.eintraege.len()
    }

    /// Entfernt alle Nachbarn, die laenger als `timeout` still sind, aus
    /// allen Eintraegen und markiert sie als inaktiv
    ///
    /// Gibt die entfernten (Kanal, Nachbar)-Paare zurueck. Leere Eintraege
    /// bleiben stehen; das Aufraeumen braucht die lokale Mitgliederzahl.
    pub fn veraltete_entfernen(
        &mut self,
        now: Instant,
        timeout: Duration,
    ) -> Vec<(ChannelName, SocketAddr)> {
        let veraltet: BTreeSet<SocketAddr> = self
            .registry
            .values()
            .filter(|n| now.saturating_duration_since(n.last_active) > timeout)
            .map(|n| n.endpoint)
            .collect();
        if veraltet.is_empty() {
            return Vec::new();
        }

        let mut entfernt = Vec::new();
        for (kanal, eintrag) in self.eintraege.iter_mut() {
            eintrag.nachbarn.retain(|ep| {
                if veraltet.contains(ep) {
                    entfernt.push((kanal.clone(), *ep));
                    false
                } else {
                    true
                }
            });
        }

        for (_, endpoint) in &entfernt {
            if let Some(nachbar) = self.registry.get_mut(endpoint) {
                nachbar.active = false;
            }
        }
        entfernt
    }
}
