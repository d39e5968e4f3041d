//! Fehlertypen fuer duckfed
//!
//! Zentraler Fehler-Enum fuer Validierung und Konfiguration.
//! Protokoll- und Relay-Crates definieren eigene Fehler und konvertieren
//! bei Bedarf via `#[from]`.

use thiserror::Error;

/// Globaler Result-Alias fuer duckfed
pub type Result<T> = std::result::Result<T, DuckfedError>;

/// Alle gemeinsam genutzten Fehler im duckfed-System
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DuckfedError {
    // --- Namen & Felder ---
    #[error("{feld} ist leer")]
    LeererName { feld: &'static str },

    #[error("{feld} zu lang: {laenge} Bytes (Maximum: {maximum})")]
    NameZuLang {
        feld: &'static str,
        laenge: usize,
        maximum: usize,
    },

    #[error("{feld} enthaelt ein NUL-Byte")]
    NulImNamen { feld: &'static str },

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl DuckfedError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Erstellt einen Konfigurationsfehler
    pub fn konfiguration(msg: impl Into<String>) -> Self {
        Self::Konfiguration(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = DuckfedError::NameZuLang {
            feld: "Kanalname",
            laenge: 40,
            maximum: 31,
        };
        assert_eq!(e.to_string(), "Kanalname zu lang: 40 Bytes (Maximum: 31)");
    }

    #[test]
    fn konfiguration_fehler() {
        let e = DuckfedError::konfiguration("Port fehlt");
        assert_eq!(e.to_string(), "Konfigurationsfehler: Port fehlt");
    }
}
