//! duckfed-core – Gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen duckfed-Crates gemeinsam genutzt werden: begrenzte Namen fuer
//! Benutzer und Kanaele, Message-IDs fuer die Duplikat-Erkennung und den
//! zentralen Fehlertyp.

pub mod error;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{DuckfedError, Result};
pub use types::{
    ChannelName, MessageId, Username, CHANNEL_MAX, SAY_MAX, STANDARD_KANAL, USERNAME_MAX,
};
