//! Lokale Verteilung einer Kanal-Nachricht an alle Mitglieder

use duckfed_core::{ChannelName, Username};
use duckfed_protocol::Response;

use crate::directory::Directory;
use crate::outbound::Postausgang;

/// Legt eine SAY-Antwort fuer jedes lokale Mitglied des Kanals in den
/// Postausgang
///
/// Jedes Datagramm wird einzeln gesendet, ein Sendefehler an ein Mitglied
/// betrifft die anderen nicht. Gibt die Anzahl der Empfaenger zurueck.
pub fn broadcast(
    directory: &Directory,
    kanal: &ChannelName,
    absender: &Username,
    text: &str,
    post: &mut Postausgang,
) -> usize {
    let empfaenger = directory.member_endpoints(kanal);
    for ziel in &empfaenger {
        post.antwort(
            *ziel,
            Response::Say {
                channel: kanal.clone(),
                username: absender.clone(),
                text: text.to_owned(),
            },
        );
    }
    tracing::trace!(
        kanal = %kanal,
        absender = %absender,
        empfaenger = empfaenger.len(),
        "Lokal verteilt"
    );
    empfaenger.len()
}
