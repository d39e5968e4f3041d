//! Relay-State – gesamter In-Memory-Zustand eines Servers
//!
//! Verzeichnis, Routing-Tabelle und Duplikat-Speicher gehoeren exklusiv
//! einem [`RelayState`]. Empfangs-Loop und Timer teilen ihn ueber einen
//! [`RelayHandle`] (ein `parking_lot::Mutex`, nie ueber ein `.await`
//! gehalten).

use duckfed_core::ChannelName;
use duckfed_observability::DuckfedMetrics;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::dedup::{DuplicateCache, STANDARD_KAPAZITAET};
use crate::directory::Directory;
use crate::outbound::Postausgang;
use crate::routing::RoutingTable;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Zeitgeber und Grenzen des Relays
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Takt des Soft-State-Timers
    pub tick: Duration,
    /// Abstand zwischen zwei Erneuerungen aller Routing-Eintraege
    pub erneuerung: Duration,
    /// Stille, nach der ein Nachbar aus den Eintraegen entfernt wird
    pub nachbar_timeout: Duration,
    /// Zeit nach dem Start, in der nicht geprunt wird
    pub schonfrist: Duration,
    /// Kapazitaet des Duplikat-Speichers
    pub duplikat_kapazitaet: usize,
    /// Kanal, der ab dem Start existiert und nie geloescht wird
    pub standard_kanal: ChannelName,
    /// Groesse der Send-Queue
    pub send_queue_groesse: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            erneuerung: Duration::from_secs(60),
            nachbar_timeout: Duration::from_secs(120),
            schonfrist: Duration::from_secs(119),
            duplikat_kapazitaet: STANDARD_KAPAZITAET,
            standard_kanal: ChannelName::standard(),
            send_queue_groesse: 1024,
        }
    }
}

// ---------------------------------------------------------------------------
// RelayState
// ---------------------------------------------------------------------------

pub struct RelayState {
    pub(crate) config: RelayConfig,
    pub(crate) directory: Directory,
    pub(crate) routing: RoutingTable,
    pub(crate) dedup: DuplicateCache,
    pub(crate) metriken: DuckfedMetrics,
    /// Startzeitpunkt (Bezug fuer die Schonfrist)
    pub(crate) start: Instant,
    /// Zeitpunkt der letzten Erneuerung, `None` vor dem ersten Tick
    pub(crate) letzte_erneuerung: Option<Instant>,
}

impl RelayState {
    /// Erstellt einen leeren Zustand mit Standardkanal
    pub fn neu(config: RelayConfig, metriken: DuckfedMetrics, start: Instant) -> Self {
        let state = Self {
            directory: Directory::neu(config.standard_kanal.clone()),
            routing: RoutingTable::neu(),
            dedup: DuplicateCache::neu(config.duplikat_kapazitaet),
            metriken,
            start,
            letzte_erneuerung: None,
            config,
        };
        state.gauges_aktualisieren();
        state
    }

    /// Traegt einen statisch konfigurierten Nachbarn ein
    pub fn nachbar_hinzufuegen(&mut self, endpoint: SocketAddr, now: Instant) {
        self.routing.nachbar_registrieren(endpoint, now);
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    pub fn dedup(&self) -> &DuplicateCache {
        &self.dedup
    }

    pub fn metriken(&self) -> &DuckfedMetrics {
        &self.metriken
    }

    pub(crate) fn gauges_aktualisieren(&self) {
        self.metriken
            .users
            .set(self.directory.benutzer_anzahl() as i64);
        self.metriken
            .channels
            .set(self.directory.kanal_anzahl() as i64);
        self.metriken
            .routing_entries
            .set(self.routing.eintrag_anzahl() as i64);
    }
}

// ---------------------------------------------------------------------------
// RelayHandle
// ---------------------------------------------------------------------------

/// Geteilter Zugriff auf den Relay-State
///
/// `Clone`-faehig (innerer Arc). Jede Methode haelt den Lock nur fuer die
/// Dauer der synchronen Zustandsoperation.
#[derive(Clone)]
pub struct RelayHandle {
    inner: Arc<Mutex<RelayState>>,
}

impl RelayHandle {
    pub fn neu(state: RelayState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    /// Verarbeitet ein eingehendes Datagramm
    pub fn verarbeiten(&self, daten: &[u8], absender: SocketAddr) -> Postausgang {
        self.inner.lock().verarbeiten(daten, absender, Instant::now())
    }

    /// Fuehrt einen Soft-State-Tick aus
    pub fn tick(&self) -> Postausgang {
        self.inner.lock().tick(Instant::now())
    }

    /// Liest den Zustand unter dem Lock
    pub fn lesen<T>(&self, f: impl FnOnce(&RelayState) -> T) -> T {
        f(&self.inner.lock())
    }

    /// Veraendert den Zustand unter dem Lock
    pub fn aendern<T>(&self, f: impl FnOnce(&mut RelayState) -> T) -> T {
        f(&mut self.inner.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn standardwerte() {
        let config = RelayConfig::default();
        assert_eq!(config.tick, Duration::from_secs(1));
        assert_eq!(config.erneuerung, Duration::from_secs(60));
        assert_eq!(config.nachbar_timeout, Duration::from_secs(120));
        assert_eq!(config.schonfrist, Duration::from_secs(119));
        assert_eq!(config.duplikat_kapazitaet, 100);
        assert_eq!(config.standard_kanal.as_str(), "Common");
    }

    #[test]
    fn neuer_zustand_hat_standardkanal() {
        let metriken = DuckfedMetrics::neu().unwrap();
        let state = RelayState::neu(RelayConfig::default(), metriken.clone(), Instant::now());
        assert_eq!(state.directory().channels(), vec![ChannelName::standard()]);
        assert_eq!(metriken.channels.get(), 1);
    }

    #[test]
    fn handle_klone_teilen_zustand() {
        let metriken = DuckfedMetrics::neu().unwrap();
        let handle = RelayHandle::neu(RelayState::neu(
            RelayConfig::default(),
            metriken,
            Instant::now(),
        ));
        let klon = handle.clone();
        let nachbar = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 4000);
        klon.aendern(|s| s.nachbar_hinzufuegen(nachbar, Instant::now()));
        assert!(handle.lesen(|s| s.routing().is_neighbor(nachbar)));
    }
}
