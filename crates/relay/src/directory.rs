//! Sitzungs- und Kanalverzeichnis der lokalen Benutzer
//!
//! Eine Sitzung wird allein ueber den UDP-Endpunkt identifiziert. Kanaele
//! halten ihre Mitglieder als Endpunkt-Schluessel, die Benutzerdaten liegen
//! nur einmal im Sitzungsindex.
//!
//! ## Invarianten
//! - Ein Kanal ohne Mitglieder existiert nicht, ausser dem Standardkanal.
//! - Jeder Mitglieds-Endpunkt eines Kanals hat eine Sitzung.

use duckfed_core::{ChannelName, Username};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::SocketAddr;

use crate::error::{RelayError, Result};

/// Ein angemeldeter lokaler Benutzer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Benutzer {
    pub username: Username,
    pub endpoint: SocketAddr,
}

/// Ergebnis eines JOIN
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinErgebnis {
    /// Kanal wurde neu angelegt
    Erstellt,
    /// Bestehendem Kanal beigetreten
    Beigetreten,
}

/// Ergebnis eines LEAVE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveErgebnis {
    /// Kanal hat weiterhin lokale Mitglieder
    Verlassen,
    /// Letztes lokales Mitglied ist gegangen
    Geleert,
}

#[derive(Debug)]
pub struct Directory {
    benutzer: HashMap<SocketAddr, Benutzer>,
    kanaele: BTreeMap<ChannelName, BTreeSet<SocketAddr>>,
    standard_kanal: ChannelName,
}

impl Directory {
    /// Legt ein Verzeichnis an, in dem der Standardkanal bereits existiert
    pub fn neu(standard_kanal: ChannelName) -> Self {
        let mut kanaele = BTreeMap::new();
        kanaele.insert(standard_kanal.clone(), BTreeSet::new());
        Self {
            benutzer: HashMap::new(),
            kanaele,
            standard_kanal,
        }
    }

    pub fn standard_kanal(&self) -> &ChannelName {
        &self.standard_kanal
    }

    /// Meldet einen Benutzer an
    ///
    /// Gehoert der Endpunkt bereits einer Sitzung, bleibt alles unveraendert
    /// und es wird `false` zurueckgegeben.
    pub fn login(&mut self, username: Username, endpoint: SocketAddr) -> bool {
        if let Some(vorhanden) = self.benutzer.get(&endpoint) {
            tracing::warn!(
                endpunkt = %endpoint,
                vorhanden = %vorhanden.username,
                angefragt = %username,
                "Doppelter Login ignoriert"
            );
            return false;
        }
        tracing::info!(benutzer = %username, endpunkt = %endpoint, "Benutzer angemeldet");
        self.benutzer
            .insert(endpoint, Benutzer { username, endpoint });
        true
    }

    /// Meldet einen Benutzer ab und entfernt ihn aus allen Kanaelen
    ///
    /// Gibt die Kanaele zurueck, deren letztes Mitglied er war. Bei
    /// unbekanntem Endpunkt `None`.
    pub fn logout(&mut self, endpoint: SocketAddr) -> Option<(Benutzer, Vec<ChannelName>)> {
        let Some(benutzer) = self.benutzer.remove(&endpoint) else {
            tracing::warn!(endpunkt = %endpoint, "Logout von unbekanntem Endpunkt");
            return None;
        };

        let seine_kanaele: Vec<ChannelName> = self
            .kanaele
            .iter()
            .filter(|(_, mitglieder)| mitglieder.contains(&endpoint))
            .map(|(name, _)| name.clone())
            .collect();

        let mut geleert = Vec::new();
        for kanal in seine_kanaele {
            if self.mitglied_entfernen(&kanal, endpoint) == LeaveErgebnis::Geleert {
                geleert.push(kanal);
            }
        }

        tracing::info!(
            benutzer = %benutzer.username,
            endpunkt = %endpoint,
            geleerte_kanaele = geleert.len(),
            "Benutzer abgemeldet"
        );
        Some((benutzer, geleert))
    }

    /// Fuegt den Benutzer eines Endpunkts einem Kanal hinzu
    pub fn join(&mut self, endpoint: SocketAddr, kanal: &ChannelName) -> Result<JoinErgebnis> {
        let benutzer = self
            .benutzer
            .get(&endpoint)
            .ok_or(RelayError::NichtAngemeldet)?;

        let ergebnis = match self.kanaele.get_mut(kanal) {
            Some(mitglieder) => {
                if !mitglieder.insert(endpoint) {
                    return Err(RelayError::BereitsMitglied(kanal.clone()));
                }
                JoinErgebnis::Beigetreten
            }
            None => {
                self.kanaele
                    .insert(kanal.clone(), BTreeSet::from([endpoint]));
                tracing::info!(kanal = %kanal, "Kanal angelegt");
                JoinErgebnis::Erstellt
            }
        };

        tracing::info!(benutzer = %benutzer.username, kanal = %kanal, "Kanal beigetreten");
        Ok(ergebnis)
    }

    /// Entfernt den Benutzer eines Endpunkts aus einem Kanal
    pub fn leave(&mut self, endpoint: SocketAddr, kanal: &ChannelName) -> Result<LeaveErgebnis> {
        let benutzer = self
            .benutzer
            .get(&endpoint)
            .ok_or(RelayError::NichtAngemeldet)?;
        let mitglieder = self
            .kanaele
            .get(kanal)
            .ok_or_else(|| RelayError::UnbekannterKanal(kanal.clone()))?;
        if !mitglieder.contains(&endpoint) {
            return Err(RelayError::NichtMitglied(kanal.clone()));
        }

        tracing::info!(benutzer = %benutzer.username, kanal = %kanal, "Kanal verlassen");
        Ok(self.mitglied_entfernen(kanal, endpoint))
    }

    /// Sitzung eines Endpunkts
    pub fn lookup(&self, endpoint: SocketAddr) -> Option<&Benutzer> {
        self.benutzer.get(&endpoint)
    }

    /// Namen aller lokalen Kanaele
    pub fn channels(&self) -> Vec<ChannelName> {
        self.kanaele.keys().cloned().collect()
    }

    /// Benutzernamen der Mitglieder eines Kanals, `None` wenn unbekannt
    pub fn members(&self, kanal: &ChannelName) -> Option<Vec<Username>> {
        let mitglieder = self.kanaele.get(kanal)?;
        Some(
            mitglieder
                .iter()
                .filter_map(|ep| self.benutzer.get(ep))
                .map(|b| b.username.clone())
                .collect(),
        )
    }

    /// Endpunkte der Mitglieder eines Kanals
    pub fn member_endpoints(&self, kanal: &ChannelName) -> Vec<SocketAddr> {
        self.kanaele
            .get(kanal)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn member_count(&self, kanal: &ChannelName) -> usize {
        self.kanaele.get(kanal).map_or(0, BTreeSet::len)
    }

    pub fn kanal_existiert(&self, kanal: &ChannelName) -> bool {
        self.kanaele.contains_key(kanal)
    }

    pub fn ist_mitglied(&self, endpoint: SocketAddr, kanal: &ChannelName) -> bool {
        self.kanaele
            .get(kanal)
            .is_some_and(|m| m.contains(&endpoint))
    }

    pub fn benutzer_anzahl(&self) -> usize {
        self.benutzer.len()
    }

    pub fn kanal_anzahl(&self) -> usize {
        self.kanaele.len()
    }

    // -----------------------------------------------------------------------
    // Interne Hilfsfunktionen
    // -----------------------------------------------------------------------

    fn mitglied_entfernen(&mut self, kanal: &ChannelName, endpoint: SocketAddr) -> LeaveErgebnis {
        let Some(mitglieder) = self.kanaele.get_mut(kanal) else {
            return LeaveErgebnis::Geleert;
        };
        mitglieder.remove(&endpoint);
        if !mitglieder.is_empty() {
            return LeaveErgebnis::Verlassen;
        }
        if kanal != &self.standard_kanal {
            self.kanaele.remove(kanal);
            tracing::info!(kanal = %kanal, "Leerer Kanal entfernt");
        }
        LeaveErgebnis::Geleert
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn endpunkt(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    }

    fn kanal(name: &str) -> ChannelName {
        ChannelName::neu(name).unwrap()
    }

    fn user(name: &str) -> Username {
        Username::neu(name).unwrap()
    }

    fn verzeichnis() -> Directory {
        Directory::neu(ChannelName::standard())
    }

    #[test]
    fn standardkanal_existiert_ab_start() {
        let dir = verzeichnis();
        assert_eq!(dir.channels(), vec![ChannelName::standard()]);
        assert_eq!(dir.member_count(&ChannelName::standard()), 0);
    }

    #[test]
    fn doppelter_login_aendert_nichts() {
        let mut dir = verzeichnis();
        assert!(dir.login(user("alice"), endpunkt(1)));
        dir.join(endpunkt(1), &kanal("g")).unwrap();

        assert!(!dir.login(user("mallory"), endpunkt(1)));
        assert_eq!(dir.lookup(endpunkt(1)).unwrap().username, user("alice"));
        assert_eq!(dir.members(&kanal("g")), Some(vec![user("alice")]));
    }

    #[test]
    fn join_legt_kanal_an() {
        let mut dir = verzeichnis();
        dir.login(user("alice"), endpunkt(1));
        dir.login(user("bob"), endpunkt(2));

        assert_eq!(dir.join(endpunkt(1), &kanal("g")), Ok(JoinErgebnis::Erstellt));
        assert_eq!(dir.join(endpunkt(2), &kanal("g")), Ok(JoinErgebnis::Beigetreten));
        assert_eq!(dir.member_count(&kanal("g")), 2);
    }

    #[test]
    fn zweiter_join_ist_fehler() {
        let mut dir = verzeichnis();
        dir.login(user("alice"), endpunkt(1));
        dir.join(endpunkt(1), &kanal("g")).unwrap();
        assert_eq!(
            dir.join(endpunkt(1), &kanal("g")),
            Err(RelayError::BereitsMitglied(kanal("g")))
        );
    }

    #[test]
    fn join_ohne_sitzung() {
        let mut dir = verzeichnis();
        assert_eq!(
            dir.join(endpunkt(9), &kanal("g")),
            Err(RelayError::NichtAngemeldet)
        );
        assert!(!dir.kanal_existiert(&kanal("g")));
    }

    #[test]
    fn letzter_leave_entfernt_kanal() {
        let mut dir = verzeichnis();
        dir.login(user("alice"), endpunkt(1));
        dir.login(user("bob"), endpunkt(2));
        dir.join(endpunkt(1), &kanal("g")).unwrap();
        dir.join(endpunkt(2), &kanal("g")).unwrap();

        assert_eq!(dir.leave(endpunkt(1), &kanal("g")), Ok(LeaveErgebnis::Verlassen));
        assert!(dir.kanal_existiert(&kanal("g")));
        assert_eq!(dir.leave(endpunkt(2), &kanal("g")), Ok(LeaveErgebnis::Geleert));
        assert!(!dir.kanal_existiert(&kanal("g")));
    }

    #[test]
    fn standardkanal_bleibt_leer_bestehen() {
        let mut dir = verzeichnis();
        let common = ChannelName::standard();
        dir.login(user("alice"), endpunkt(1));
        dir.join(endpunkt(1), &common).unwrap();
        assert_eq!(dir.leave(endpunkt(1), &common), Ok(LeaveErgebnis::Geleert));
        assert!(dir.kanal_existiert(&common));
    }

    #[test]
    fn leave_fehlerfaelle() {
        let mut dir = verzeichnis();
        dir.login(user("alice"), endpunkt(1));
        dir.login(user("bob"), endpunkt(2));
        dir.join(endpunkt(2), &kanal("g")).unwrap();

        assert_eq!(
            dir.leave(endpunkt(1), &kanal("nirgends")),
            Err(RelayError::UnbekannterKanal(kanal("nirgends")))
        );
        assert_eq!(
            dir.leave(endpunkt(1), &kanal("g")),
            Err(RelayError::NichtMitglied(kanal("g")))
        );
        assert_eq!(dir.member_count(&kanal("g")), 1);
    }

    #[test]
    fn logout_meldet_geleerte_kanaele() {
        let mut dir = verzeichnis();
        dir.login(user("alice"), endpunkt(1));
        dir.login(user("bob"), endpunkt(2));
        dir.join(endpunkt(1), &kanal("a")).unwrap();
        dir.join(endpunkt(1), &kanal("b")).unwrap();
        dir.join(endpunkt(2), &kanal("b")).unwrap();

        let (benutzer, geleert) = dir.logout(endpunkt(1)).unwrap();
        assert_eq!(benutzer.username, user("alice"));
        assert_eq!(geleert, vec![kanal("a")]);
        assert!(dir.lookup(endpunkt(1)).is_none());
        assert!(!dir.kanal_existiert(&kanal("a")));
        assert_eq!(dir.members(&kanal("b")), Some(vec![user("bob")]));
    }

    #[test]
    fn logout_unbekannt() {
        let mut dir = verzeichnis();
        assert!(dir.logout(endpunkt(5)).is_none());
    }

    #[test]
    fn member_endpoints_und_members() {
        let mut dir = verzeichnis();
        dir.login(user("alice"), endpunkt(1));
        dir.login(user("bob"), endpunkt(2));
        dir.join(endpunkt(1), &kanal("g")).unwrap();
        dir.join(endpunkt(2), &kanal("g")).unwrap();

        let mut eps = dir.member_endpoints(&kanal("g"));
        eps.sort();
        assert_eq!(eps, vec![endpunkt(1), endpunkt(2)]);
        assert!(dir.members(&kanal("x")).is_none());
        assert!(dir.member_endpoints(&kanal("x")).is_empty());
        assert!(dir.ist_mitglied(endpunkt(2), &kanal("g")));
    }
}
