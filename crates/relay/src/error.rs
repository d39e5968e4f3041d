//! Fehlertypen des Relays
//!
//! Der `Display`-Text jedes Fehlers geht unveraendert (auf 63 Bytes
//! gekuerzt) als ERROR-Antwort an den Client.

use duckfed_core::ChannelName;
use duckfed_protocol::DecodeError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// Anfrage von einem Endpunkt ohne Sitzung
    #[error("Nicht angemeldet")]
    NichtAngemeldet,

    /// JOIN auf einen Kanal, in dem der Benutzer bereits ist
    #[error("Bereits in Kanal {0}")]
    BereitsMitglied(ChannelName),

    /// SAY/LEAVE auf einen Kanal, in dem der Benutzer nicht ist
    #[error("Nicht in Kanal {0}")]
    NichtMitglied(ChannelName),

    /// Kanal existiert auf diesem Server nicht
    #[error("Kanal {0} existiert nicht")]
    UnbekannterKanal(ChannelName),

    /// Datagramm konnte nicht dekodiert werden
    #[error("{0}")]
    Dekodierung(#[from] DecodeError),
}

pub type Result<T> = std::result::Result<T, RelayError>;
