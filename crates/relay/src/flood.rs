//! Flooding von JOIN, LEAVE und SAY ueber die Nachbarserver
//!
//! ## Regeln
//! - Lokales JOIN: S2S_JOIN an alle bekannten Nachbarn, alle werden
//!   vorlaeufig in den Routing-Eintrag aufgenommen.
//! - S2S_JOIN von N: N eintragen. Gab es noch keinen Eintrag, wird an alle
//!   anderen Nachbarn weitergeflutet.
//! - Lokaler Kanal geleert: S2S_LEAVE an alle Nachbarn des Eintrags.
//! - S2S_LEAVE von N: N austragen. Ohne lokale Mitglieder und ohne
//!   verbliebene Nachbarn wird der Eintrag geloescht.
//! - Lokales SAY: neue Message-ID, S2S_SAY an die Nachbarn des Eintrags.
//! - S2S_SAY von N: Duplikate oder Sackgassen werden mit S2S_LEAVE an N
//!   beantwortet, sonst lokal verteilen und an alle ausser N weiterleiten.

use duckfed_core::{ChannelName, MessageId, Username};
use duckfed_protocol::S2sMessage;
use std::net::SocketAddr;
use std::time::Instant;

use crate::broadcast::broadcast;
use crate::directory::LeaveErgebnis;
use crate::error::{RelayError, Result};
use crate::outbound::Postausgang;
use crate::state::RelayState;

impl RelayState {
    // -----------------------------------------------------------------------
    // Lokale Operationen
    // -----------------------------------------------------------------------

    /// Ein lokaler Benutzer tritt einem Kanal bei
    ///
    /// Jeder Beitritt kuendigt den Kanal erneut bei allen Nachbarn an, auch
    /// wenn der Kanal bereits lokale Mitglieder hat.
    pub(crate) fn local_join(
        &mut self,
        absender: SocketAddr,
        kanal: ChannelName,
        now: Instant,
        post: &mut Postausgang,
    ) -> Result<()> {
        self.directory.join(absender, &kanal)?;

        self.routing.get_or_create(&kanal);
        for nachbar in self.routing.known_neighbors() {
            self.routing.add_neighbor(&kanal, nachbar, now);
            self.s2s_senden(nachbar, S2sMessage::Join { channel: kanal.clone() }, post);
        }
        Ok(())
    }

    /// Ein lokaler Benutzer verlaesst einen Kanal
    pub(crate) fn local_leave(
        &mut self,
        absender: SocketAddr,
        kanal: ChannelName,
        post: &mut Postausgang,
    ) -> Result<()> {
        if self.directory.leave(absender, &kanal)? == LeaveErgebnis::Geleert {
            self.kanal_geleert(&kanal, post);
        }
        Ok(())
    }

    /// Der Kanal hat keine lokalen Mitglieder mehr
    ///
    /// S2S_LEAVE geht an alle Nachbarn des Eintrags, unabhaengig davon, ob
    /// sie selbst noch Interesse haben.
    pub(crate) fn kanal_geleert(&mut self, kanal: &ChannelName, post: &mut Postausgang) {
        let nachbarn: Vec<SocketAddr> = match self.routing.entry_for(kanal) {
            Some(eintrag) => eintrag.nachbarn().collect(),
            None => return,
        };
        for nachbar in nachbarn {
            self.s2s_senden(nachbar, S2sMessage::Leave { channel: kanal.clone() }, post);
        }
        self.routing.delete_if_unused(kanal, 0);
    }

    /// Ein lokaler Benutzer schreibt in einen Kanal
    pub(crate) fn local_say(
        &mut self,
        absender: SocketAddr,
        kanal: ChannelName,
        text: String,
        now: Instant,
        post: &mut Postausgang,
    ) -> Result<()> {
        if !self.directory.kanal_existiert(&kanal) {
            return Err(RelayError::UnbekannterKanal(kanal));
        }
        if !self.directory.ist_mitglied(absender, &kanal) {
            return Err(RelayError::NichtMitglied(kanal));
        }
        let username = self
            .directory
            .lookup(absender)
            .map(|b| b.username.clone())
            .ok_or(RelayError::NichtAngemeldet)?;

        broadcast(&self.directory, &kanal, &username, &text, post);

        let id = MessageId::generieren();
        self.dedup.is_duplicate_and_record(id, now);

        let nachbarn: Vec<SocketAddr> = self
            .routing
            .entry_for(&kanal)
            .map(|e| e.nachbarn().collect())
            .unwrap_or_default();
        for nachbar in nachbarn {
            self.s2s_senden(
                nachbar,
                S2sMessage::Say {
                    id,
                    username: username.clone(),
                    channel: kanal.clone(),
                    text: text.clone(),
                },
                post,
            );
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Nachrichten von Nachbarn
    // -----------------------------------------------------------------------

    pub(crate) fn remote_join(
        &mut self,
        absender: SocketAddr,
        kanal: ChannelName,
        now: Instant,
        post: &mut Postausgang,
    ) {
        tracing::debug!(nachbar = %absender, kanal = %kanal, "S2S_JOIN empfangen");

        let war_bekannt = self.routing.entry_for(&kanal).is_some();
        self.routing.add_neighbor(&kanal, absender, now);
        if war_bekannt {
            return;
        }

        for nachbar in self.routing.known_neighbors() {
            if nachbar == absender {
                continue;
            }
            self.routing.add_neighbor(&kanal, nachbar, now);
            self.s2s_senden(nachbar, S2sMessage::Join { channel: kanal.clone() }, post);
        }
    }

    pub(crate) fn remote_leave(&mut self, absender: SocketAddr, kanal: ChannelName) {
        tracing::debug!(nachbar = %absender, kanal = %kanal, "S2S_LEAVE empfangen");

        self.routing.remove_neighbor(&kanal, absender);

        // Ohne Nachbarn bleibt niemand, an den das LEAVE weitergehen koennte
        let lokale = self.directory.member_count(&kanal);
        if self.routing.delete_if_unused(&kanal, lokale) {
            tracing::debug!(kanal = %kanal, "Zweig ohne Interesse abgebaut");
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn remote_say(
        &mut self,
        absender: SocketAddr,
        id: MessageId,
        username: Username,
        kanal: ChannelName,
        text: String,
        now: Instant,
        post: &mut Postausgang,
    ) {
        tracing::debug!(
            nachbar = %absender,
            kanal = %kanal,
            benutzer = %username,
            id = %id,
            "S2S_SAY empfangen"
        );

        if self.dedup.is_duplicate_and_record(id, now) {
            self.metriken.duplicate_says_total.inc();
            tracing::debug!(nachbar = %absender, id = %id, kanal = %kanal, "Duplikat, Schleife abgebaut");
            self.abbestellen(absender, &kanal, post);
            return;
        }

        let lokale = self.directory.member_count(&kanal);
        if lokale > 0 {
            broadcast(&self.directory, &kanal, &username, &text, post);
        }

        let ziele: Vec<SocketAddr> = self
            .routing
            .entry_for(&kanal)
            .map(|e| e.nachbarn().filter(|n| *n != absender).collect())
            .unwrap_or_default();

        if ziele.is_empty() && lokale == 0 {
            tracing::debug!(nachbar = %absender, kanal = %kanal, "Sackgasse, Zweig abgebaut");
            self.abbestellen(absender, &kanal, post);
            return;
        }

        for nachbar in ziele {
            self.s2s_senden(
                nachbar,
                S2sMessage::Say {
                    id,
                    username: username.clone(),
                    channel: kanal.clone(),
                    text: text.clone(),
                },
                post,
            );
        }
    }

    // -----------------------------------------------------------------------
    // Interne Hilfsfunktionen
    // -----------------------------------------------------------------------

    /// Antwortet N mit S2S_LEAVE und traegt N aus dem Eintrag aus
    fn abbestellen(&mut self, nachbar: SocketAddr, kanal: &ChannelName, post: &mut Postausgang) {
        self.s2s_senden(nachbar, S2sMessage::Leave { channel: kanal.clone() }, post);
        self.routing.remove_neighbor(kanal, nachbar);
        let lokale = self.directory.member_count(kanal);
        self.routing.delete_if_unused(kanal, lokale);
    }

    pub(crate) fn s2s_senden(&self, ziel: SocketAddr, nachricht: S2sMessage, post: &mut Postausgang) {
        tracing::debug!(
            nachbar = %ziel,
            art = %nachricht.art(),
            kanal = %nachricht.channel(),
            "S2S senden"
        );
        post.federation(ziel, nachricht);
    }
}
