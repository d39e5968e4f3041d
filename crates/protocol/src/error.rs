//! Fehlertypen fuer das Dekodieren von Datagrammen

use thiserror::Error;

use crate::response::AntwortArt;
use crate::wire::Art;

/// Grund, warum ein String-Feld abgelehnt wurde
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeldFehler {
    /// Kein NUL-Terminator innerhalb der Feldkapazitaet
    #[error("nicht terminiert")]
    NichtTerminiert,

    /// Inhalt ist kein gueltiges UTF-8
    #[error("kein gueltiges UTF-8")]
    KeinUtf8,

    /// Inhalt verletzt die Namensregeln (leer, zu lang, ...)
    #[error("{0}")]
    Ungueltig(String),
}

/// Fehler beim Dekodieren eines eingehenden Datagramms
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Datagramm ist kuerzer als das Art-Tag selbst
    #[error("Datagramm ohne Nachrichtenart ({laenge} Bytes)")]
    OhneArt { laenge: usize },

    /// Art-Tag ist keiner bekannten Nachricht zugeordnet
    #[error("Unbekannte Nachrichtenart: {0}")]
    UnbekannteArt(u32),

    /// Datagramm ist kuerzer als die Mindestgroesse seiner Art
    #[error("{art}: Datagramm zu kurz ({laenge} Bytes, erwartet {erwartet})")]
    ZuKurz {
        art: Art,
        laenge: usize,
        erwartet: usize,
    },

    /// Ein String-Feld ist ungueltig
    #[error("{art}: {feld} {grund}")]
    UngueltigesFeld {
        art: Art,
        feld: &'static str,
        grund: FeldFehler,
    },

    /// Antwort-Tag ist unbekannt
    #[error("Unbekannte Antwortart: {0}")]
    UnbekannteAntwort(u32),

    /// Antwort ist kuerzer als ihre Grundgroesse
    #[error("{art}: Antwort zu kurz ({laenge} Bytes, erwartet {erwartet})")]
    AntwortZuKurz {
        art: AntwortArt,
        laenge: usize,
        erwartet: usize,
    },

    /// Ein String-Feld einer Antwort ist ungueltig
    #[error("{art}: {feld} {grund}")]
    UngueltigeAntwort {
        art: AntwortArt,
        feld: &'static str,
        grund: FeldFehler,
    },

    /// Laengenangabe in einer Antwort passt nicht zur Datagrammgroesse
    #[error("{art}: Anzahl {anzahl} passt nicht zu {laenge} Bytes")]
    FalscheAnzahl {
        art: AntwortArt,
        anzahl: usize,
        laenge: usize,
    },
}

impl DecodeError {
    /// Art des eingehenden Datagramms, falls das Tag lesbar war
    pub fn art(&self) -> Option<Art> {
        match self {
            Self::ZuKurz { art, .. } | Self::UngueltigesFeld { art, .. } => Some(*art),
            _ => None,
        }
    }
}
