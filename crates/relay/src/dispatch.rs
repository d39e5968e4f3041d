//! Einziger Dispatch-Punkt fuer eingehende Datagramme
//!
//! ```text
//! Datagramm
//!     |
//!     v
//! RoutingTable::refresh()    <- jede Aktivitaet eines Nachbarn zaehlt
//!     |
//!     v
//! Datagram::decode()         <- Fehler: ERROR an Clients, Nachbarn ignoriert
//!     |
//!     +--> Client(Request)      -> Verzeichnis / Broadcast / Flooding
//!     +--> Federation(S2s...)   -> Flooding
//! ```

use duckfed_core::ChannelName;
use duckfed_protocol::{Datagram, Request, Response, S2sMessage};
use std::net::SocketAddr;
use std::time::Instant;

use crate::error::{RelayError, Result};
use crate::outbound::Postausgang;
use crate::state::RelayState;

impl RelayState {
    /// Verarbeitet ein eingehendes Datagramm und liefert alle daraus
    /// entstehenden ausgehenden Datagramme
    pub fn verarbeiten(&mut self, daten: &[u8], absender: SocketAddr, now: Instant) -> Postausgang {
        self.metriken.datagrams_received_total.inc();
        let ist_nachbar = self.routing.refresh(absender, now);
        let mut post = Postausgang::neu();

        let datagramm = match Datagram::decode(daten) {
            Ok(d) => d,
            Err(e) => {
                self.metriken.datagrams_malformed_total.inc();
                if ist_nachbar {
                    tracing::debug!(
                        fehler = %e,
                        nachbar = %absender,
                        bytes = daten.len(),
                        "Ungueltiges Datagramm von Nachbar verworfen"
                    );
                } else {
                    tracing::warn!(
                        fehler = %e,
                        absender = %absender,
                        bytes = daten.len(),
                        "Ungueltiges Datagramm"
                    );
                    post.antwort(absender, Response::error(RelayError::from(e).to_string()));
                }
                return post;
            }
        };

        tracing::trace!(art = %datagramm.art(), absender = %absender, "Datagramm empfangen");

        match datagramm {
            Datagram::Client(anfrage) => {
                if let Err(e) = self.client_anfrage(anfrage, absender, now, &mut post) {
                    tracing::warn!(fehler = %e, absender = %absender, "Anfrage abgelehnt");
                    post.antwort(absender, Response::error(e.to_string()));
                }
            }
            Datagram::Federation(nachricht) => {
                if self.routing.nachbar_registrieren(absender, now) {
                    tracing::info!(nachbar = %absender, "Neuer Nachbar durch S2S-Nachricht");
                }
                self.federation_nachricht(nachricht, absender, now, &mut post);
            }
        }

        self.gauges_aktualisieren();
        post
    }

    fn client_anfrage(
        &mut self,
        anfrage: Request,
        absender: SocketAddr,
        now: Instant,
        post: &mut Postausgang,
    ) -> Result<()> {
        let ist_login = matches!(anfrage, Request::Login { .. });
        if !ist_login && self.directory.lookup(absender).is_none() {
            return Err(RelayError::NichtAngemeldet);
        }

        match anfrage {
            Request::Login { username } => {
                self.directory.login(username, absender);
                Ok(())
            }
            Request::Logout => {
                self.logout(absender, post);
                Ok(())
            }
            Request::Join { channel } => self.local_join(absender, channel, now, post),
            Request::Leave { channel } => self.local_leave(absender, channel, post),
            Request::Say { channel, text } => self.local_say(absender, channel, text, now, post),
            Request::List => {
                post.antwort(
                    absender,
                    Response::List {
                        channels: self.directory.channels(),
                    },
                );
                Ok(())
            }
            Request::Who { channel } => self.who(absender, channel, post),
            Request::KeepAlive => {
                tracing::trace!(absender = %absender, "Keep-Alive");
                Ok(())
            }
        }
    }

    fn federation_nachricht(
        &mut self,
        nachricht: S2sMessage,
        absender: SocketAddr,
        now: Instant,
        post: &mut Postausgang,
    ) {
        match nachricht {
            S2sMessage::Join { channel } => self.remote_join(absender, channel, now, post),
            S2sMessage::Leave { channel } => self.remote_leave(absender, channel),
            S2sMessage::Say {
                id,
                username,
                channel,
                text,
            } => self.remote_say(absender, id, username, channel, text, now, post),
        }
    }

    /// Meldet eine Sitzung ab; jeder dabei geleerte Kanal loest ein
    /// lokales LEAVE gegenueber den Nachbarn aus
    pub(crate) fn logout(&mut self, absender: SocketAddr, post: &mut Postausgang) {
        if let Some((_, geleert)) = self.directory.logout(absender) {
            for kanal in geleert {
                self.kanal_geleert(&kanal, post);
            }
        }
    }

    /// WHO: lokale Mitglieder eines bestehenden Kanals
    fn who(&self, absender: SocketAddr, kanal: ChannelName, post: &mut Postausgang) -> Result<()> {
        let users = self
            .directory
            .members(&kanal)
            .ok_or_else(|| RelayError::UnbekannterKanal(kanal.clone()))?;
        post.antwort(
            absender,
            Response::Who {
                channel: kanal,
                users,
            },
        );
        Ok(())
    }
}
