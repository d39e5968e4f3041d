//! Gemeinsame Identifikationstypen fuer duckfed
//!
//! Benutzer- und Kanalnamen sind auf dem Wire Felder fester Kapazitaet mit
//! NUL-Terminator. Die Newtypes hier garantieren, dass jeder Name in sein
//! Feld passt, sodass Encoder nie abschneiden muessen.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DuckfedError, Result};

/// Feldkapazitaet fuer Benutzernamen inklusive NUL-Terminator
pub const USERNAME_MAX: usize = 32;

/// Feldkapazitaet fuer Kanalnamen inklusive NUL-Terminator
pub const CHANNEL_MAX: usize = 32;

/// Feldkapazitaet fuer Nachrichtentexte inklusive NUL-Terminator
pub const SAY_MAX: usize = 64;

/// Name des Standardkanals, der ab dem Start existiert
pub const STANDARD_KANAL: &str = "Common";

fn pruefen(wert: &str, feld: &'static str, kapazitaet: usize) -> Result<()> {
    if wert.is_empty() {
        return Err(DuckfedError::LeererName { feld });
    }
    if wert.len() >= kapazitaet {
        return Err(DuckfedError::NameZuLang {
            feld,
            laenge: wert.len(),
            maximum: kapazitaet - 1,
        });
    }
    if wert.contains('\0') {
        return Err(DuckfedError::NulImNamen { feld });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Username
// ---------------------------------------------------------------------------

/// Benutzername (1..=31 Bytes, ohne NUL)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Validiert und erstellt einen Benutzernamen
    pub fn neu(wert: impl Into<String>) -> Result<Self> {
        let wert = wert.into();
        pruefen(&wert, "Benutzername", USERNAME_MAX)?;
        Ok(Self(wert))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Username {
    type Error = DuckfedError;

    fn try_from(wert: String) -> Result<Self> {
        Self::neu(wert)
    }
}

impl From<Username> for String {
    fn from(name: Username) -> Self {
        name.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// ChannelName
// ---------------------------------------------------------------------------

/// Kanalname (1..=31 Bytes, Gross-/Kleinschreibung relevant)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelName(String);

impl ChannelName {
    /// Validiert und erstellt einen Kanalnamen
    pub fn neu(wert: impl Into<String>) -> Result<Self> {
        let wert = wert.into();
        pruefen(&wert, "Kanalname", CHANNEL_MAX)?;
        Ok(Self(wert))
    }

    /// Der Standardkanal `Common`
    pub fn standard() -> Self {
        Self(STANDARD_KANAL.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ChannelName {
    type Error = DuckfedError;

    fn try_from(wert: String) -> Result<Self> {
        Self::neu(wert)
    }
}

impl From<ChannelName> for String {
    fn from(name: ChannelName) -> Self {
        name.0
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// MessageId
// ---------------------------------------------------------------------------

/// Global eindeutige ID einer S2S-Say-Nachricht
///
/// Wird vom Ursprungsserver aus zwei unabhaengigen 32-Bit-Zufallswerten
/// zusammengesetzt. Kollisionen sind unwahrscheinlich, aber nicht
/// ausgeschlossen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl MessageId {
    /// Erzeugt eine neue zufaellige ID
    pub fn generieren() -> Self {
        let hoch = rand::random::<u32>() as u64;
        let tief = rand::random::<u32>() as u64;
        Self((hoch << 32) | tief)
    }

    pub fn inner(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
