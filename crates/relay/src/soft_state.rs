//! Soft-State – periodische Erneuerung und Bereinigung der Routing-Tabelle
//!
//! Ein einziger Tick (Standard: 1 s) treibt beides, in dieser Reihenfolge:
//! - Bereinigung bei jedem Tick nach Ablauf der Schonfrist: Nachbarn, die
//!   laenger als `nachbar_timeout` still sind, verlassen alle Eintraege.
//! - Erneuerung beim ersten Tick und danach alle `erneuerung`: S2S_JOIN fuer
//!   jeden verbliebenen Routing-Eintrag an alle bekannten Nachbarn.

use duckfed_core::ChannelName;
use duckfed_protocol::S2sMessage;
use std::collections::BTreeSet;
use std::time::Instant;

use crate::outbound::Postausgang;
use crate::state::RelayState;

impl RelayState {
    /// Ein Timer-Tick
    pub fn tick(&mut self, now: Instant) -> Postausgang {
        let mut post = Postausgang::neu();

        if now.saturating_duration_since(self.start) >= self.config.schonfrist {
            self.prune(now);
        }

        let faellig = self
            .letzte_erneuerung
            .map_or(true, |zuletzt| now.saturating_duration_since(zuletzt) >= self.config.erneuerung);
        if faellig {
            self.renew(&mut post);
            self.letzte_erneuerung = Some(now);
        }

        self.gauges_aktualisieren();
        post
    }

    /// Kuendigt jeden Kanal mit Routing-Eintrag erneut bei allen bekannten
    /// Nachbarn an
    pub fn renew(&mut self, post: &mut Postausgang) {
        let kanaele = self.routing.kanaele();
        let nachbarn = self.routing.known_neighbors();
        if kanaele.is_empty() || nachbarn.is_empty() {
            return;
        }
        tracing::debug!(
            kanaele = kanaele.len(),
            nachbarn = nachbarn.len(),
            "Routing-Eintraege erneuert"
        );
        for kanal in &kanaele {
            for nachbar in &nachbarn {
                self.s2s_senden(*nachbar, S2sMessage::Join { channel: kanal.clone() }, post);
            }
        }
    }

    /// Entfernt stille Nachbarn aus allen Eintraegen, ohne Weitergabe
    ///
    /// Eintraege ohne Nachbarn und ohne lokale Mitglieder werden geloescht.
    pub fn prune(&mut self, now: Instant) {
        let entfernt = self
            .routing
            .veraltete_entfernen(now, self.config.nachbar_timeout);
        if entfernt.is_empty() {
            return;
        }

        let mut betroffen = BTreeSet::<ChannelName>::new();
        for (kanal, nachbar) in entfernt {
            tracing::info!(kanal = %kanal, nachbar = %nachbar, "Stiller Nachbar entfernt");
            self.metriken.neighbors_pruned_total.inc();
            betroffen.insert(kanal);
        }
        for kanal in betroffen {
            let lokale = self.directory.member_count(&kanal);
            self.routing.delete_if_unused(&kanal, lokale);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbound::Nachricht;
    use crate::state::RelayConfig;
    use duckfed_core::Username;
    use duckfed_observability::DuckfedMetrics;
    use duckfed_protocol::Request;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::time::Duration;

    fn endpunkt(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    }

    fn kanal(name: &str) -> ChannelName {
        ChannelName::neu(name).unwrap()
    }

    fn sek(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn server(t0: Instant) -> RelayState {
        let mut s = RelayState::neu(RelayConfig::default(), DuckfedMetrics::neu().unwrap(), t0);
        s.nachbar_hinzufuegen(endpunkt(6001), t0);
        s.nachbar_hinzufuegen(endpunkt(6002), t0);
        s
    }

    fn joins(post: &Postausgang) -> usize {
        post.iter()
            .filter(|a| matches!(a.nachricht, Nachricht::Federation(S2sMessage::Join { .. })))
            .count()
    }

    #[test]
    fn erster_tick_erneuert_sofort() {
        let t0 = Instant::now();
        let mut s = server(t0);
        s.verarbeiten(&S2sMessage::Join { channel: kanal("g") }.encode(), endpunkt(6001), t0);

        let post = s.tick(t0);
        assert_eq!(joins(&post), 2, "ein JOIN pro bekanntem Nachbarn");
        assert_eq!(post.an(endpunkt(6001)).count(), 1);
    }

    #[test]
    fn erneuerung_alle_60_sekunden() {
        let t0 = Instant::now();
        let mut s = server(t0);
        s.verarbeiten(&S2sMessage::Join { channel: kanal("g") }.encode(), endpunkt(6001), t0);

        assert_eq!(joins(&s.tick(t0)), 2);
        assert_eq!(joins(&s.tick(t0 + sek(1))), 0);
        assert_eq!(joins(&s.tick(t0 + sek(59))), 0);
        assert_eq!(joins(&s.tick(t0 + sek(60))), 2);
        assert_eq!(joins(&s.tick(t0 + sek(61))), 0);
    }

    #[test]
    fn keine_bereinigung_in_der_schonfrist() {
        let t0 = Instant::now();
        let mut s = server(t0);
        // Beide Nachbarn schweigen ab t0
        s.verarbeiten(&S2sMessage::Join { channel: kanal("g") }.encode(), endpunkt(6001), t0);
        s.config.nachbar_timeout = sek(10);

        s.tick(t0 + sek(118));
        assert_eq!(s.routing().entry_for(&kanal("g")).unwrap().len(), 2);

        s.tick(t0 + sek(119));
        assert!(s.routing().entry_for(&kanal("g")).is_none());
    }

    #[test]
    fn stiller_nachbar_wird_nach_120_sekunden_entfernt() {
        let t0 = Instant::now();
        let mut s = server(t0);
        s.verarbeiten(&S2sMessage::Join { channel: kanal("g") }.encode(), endpunkt(6001), t0);

        // 6001 bleibt aktiv, 6002 schweigt
        s.verarbeiten(
            &S2sMessage::Join { channel: kanal("g") }.encode(),
            endpunkt(6001),
            t0 + sek(100),
        );

        s.tick(t0 + sek(120));
        assert_eq!(s.routing().entry_for(&kanal("g")).unwrap().len(), 2);

        s.tick(t0 + sek(121));
        let eintrag = s.routing().entry_for(&kanal("g")).unwrap();
        assert_eq!(eintrag.nachbarn().collect::<Vec<_>>(), vec![endpunkt(6001)]);
        assert!(!s.routing().nachbar(endpunkt(6002)).unwrap().active);
        assert_eq!(s.metriken().neighbors_pruned_total.get(), 1);
    }

    #[test]
    fn bereinigung_sendet_nichts() {
        let t0 = Instant::now();
        let mut s = server(t0);
        s.verarbeiten(&S2sMessage::Join { channel: kanal("g") }.encode(), endpunkt(6001), t0);
        s.tick(t0);

        let post = s.tick(t0 + sek(200));
        // Erneuerung faellig, aber der Eintrag ist bereits entfernt
        assert!(post.is_empty());
        assert!(s.routing().entry_for(&kanal("g")).is_none());
    }

    #[test]
    fn eintrag_mit_lokalen_mitgliedern_bleibt() {
        let t0 = Instant::now();
        let mut s = server(t0);
        s.verarbeiten(
            &Request::Login { username: Username::neu("alice").unwrap() }.encode(),
            endpunkt(5001),
            t0,
        );
        s.verarbeiten(&Request::Join { channel: kanal("g") }.encode(), endpunkt(5001), t0);

        s.tick(t0 + sek(300));
        let eintrag = s.routing().entry_for(&kanal("g")).unwrap();
        assert!(eintrag.is_empty());
        assert_eq!(s.directory().member_count(&kanal("g")), 1);
    }
}
