//! Antworten an lokale Clients (Server -> Client)
//!
//! ```text
//! Art     Tag  Groesse    Felder
//! ------  ---  ---------  ------
//! SAY      0   132        tag, channel[32], username[32], text[64]
//! LIST     1   8 + 32n    tag, count(u32), channel[32] * n
//! WHO      2   40 + 32n   tag, count(u32), channel[32], username[32] * n
//! ERROR    3   68         tag, text[64]
//! ```

use bytes::{Buf, BufMut, Bytes};
use duckfed_core::{ChannelName, Username, CHANNEL_MAX, SAY_MAX, USERNAME_MAX};
use std::fmt;

use crate::error::{DecodeError, FeldFehler};
use crate::wire::{self, TAG_GROESSE};

/// Groesse des Zaehlerfelds in LIST und WHO
const ANZAHL_GROESSE: usize = 4;

/// Art einer Antwort (eigener Tag-Raum)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum AntwortArt {
    Say = 0,
    List = 1,
    Who = 2,
    Error = 3,
}

impl AntwortArt {
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(Self::Say),
            1 => Some(Self::List),
            2 => Some(Self::Who),
            3 => Some(Self::Error),
            _ => None,
        }
    }

    pub fn tag(self) -> u32 {
        self as u32
    }

    /// Groesse ohne variable Eintraege
    pub fn grundgroesse(self) -> usize {
        match self {
            Self::Say => TAG_GROESSE + CHANNEL_MAX + USERNAME_MAX + SAY_MAX,
            Self::List => TAG_GROESSE + ANZAHL_GROESSE,
            Self::Who => TAG_GROESSE + ANZAHL_GROESSE + CHANNEL_MAX,
            Self::Error => TAG_GROESSE + SAY_MAX,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Say => "TXT_SAY",
            Self::List => "TXT_LIST",
            Self::Who => "TXT_WHO",
            Self::Error => "TXT_ERROR",
        }
    }
}

impl fmt::Display for AntwortArt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Antwort an einen lokalen Client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Zugestellte Kanal-Nachricht
    Say {
        channel: ChannelName,
        username: Username,
        text: String,
    },
    /// Alle Kanaele dieses Servers
    List { channels: Vec<ChannelName> },
    /// Lokale Mitglieder eines Kanals
    Who {
        channel: ChannelName,
        users: Vec<Username>,
    },
    /// Fehlermeldung
    Error { message: String },
}

impl Response {
    /// Fehlerantwort, auf die Feldkapazitaet gekuerzt
    pub fn error(message: impl AsRef<str>) -> Self {
        Self::Error {
            message: wire::abschneiden(message.as_ref(), SAY_MAX - 1).to_owned(),
        }
    }

    pub fn art(&self) -> AntwortArt {
        match self {
            Self::Say { .. } => AntwortArt::Say,
            Self::List { .. } => AntwortArt::List,
            Self::Who { .. } => AntwortArt::Who,
            Self::Error { .. } => AntwortArt::Error,
        }
    }

    /// Exakte Groesse des serialisierten Datagramms
    pub fn groesse(&self) -> usize {
        let basis = self.art().grundgroesse();
        match self {
            Self::List { channels } => basis + CHANNEL_MAX * channels.len(),
            Self::Who { users, .. } => basis + USERNAME_MAX * users.len(),
            Self::Say { .. } | Self::Error { .. } => basis,
        }
    }

    /// Serialisiert die Antwort
    pub fn encode(&self) -> Bytes {
        let mut buf = wire::puffer_mit_tag(self.art().tag(), self.groesse());
        match self {
            Self::Say {
                channel,
                username,
                text,
            } => {
                wire::feld_schreiben(&mut buf, channel.as_str(), CHANNEL_MAX);
                wire::feld_schreiben(&mut buf, username.as_str(), USERNAME_MAX);
                wire::feld_schreiben(&mut buf, text, SAY_MAX);
            }
            Self::List { channels } => {
                buf.put_u32_le(channels.len() as u32);
                for kanal in channels {
                    wire::feld_schreiben(&mut buf, kanal.as_str(), CHANNEL_MAX);
                }
            }
            Self::Who { channel, users } => {
                buf.put_u32_le(users.len() as u32);
                wire::feld_schreiben(&mut buf, channel.as_str(), CHANNEL_MAX);
                for user in users {
                    wire::feld_schreiben(&mut buf, user.as_str(), USERNAME_MAX);
                }
            }
            Self::Error { message } => {
                wire::feld_schreiben(&mut buf, message, SAY_MAX);
            }
        }
        buf.freeze()
    }

    /// Dekodiert eine Antwort (Client-Seite)
    ///
    /// Bei LIST und WHO muss die Datagrammgroesse die angegebene Anzahl
    /// Eintraege fassen.
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < TAG_GROESSE {
            return Err(DecodeError::OhneArt { laenge: buf.len() });
        }
        let mut rest = buf;
        let tag = rest.get_u32_le();
        let art = AntwortArt::from_tag(tag).ok_or(DecodeError::UnbekannteAntwort(tag))?;
        if buf.len() < art.grundgroesse() {
            return Err(DecodeError::AntwortZuKurz {
                art,
                laenge: buf.len(),
                erwartet: art.grundgroesse(),
            });
        }
        let rest = &mut rest;

        let antwort = match art {
            AntwortArt::Say => {
                let channel = kanal_lesen(rest, art)?;
                let username = username_lesen(rest, art)?;
                let text = text_lesen(rest, art)?;
                Self::Say {
                    channel,
                    username,
                    text,
                }
            }
            AntwortArt::List => {
                let anzahl = rest.get_u32_le() as usize;
                anzahl_pruefen(art, anzahl, CHANNEL_MAX, buf.len())?;
                let channels = (0..anzahl)
                    .map(|_| kanal_lesen(rest, art))
                    .collect::<Result<Vec<_>, _>>()?;
                Self::List { channels }
            }
            AntwortArt::Who => {
                let anzahl = rest.get_u32_le() as usize;
                anzahl_pruefen(art, anzahl, USERNAME_MAX, buf.len())?;
                let channel = kanal_lesen(rest, art)?;
                let users = (0..anzahl)
                    .map(|_| username_lesen(rest, art))
                    .collect::<Result<Vec<_>, _>>()?;
                Self::Who { channel, users }
            }
            AntwortArt::Error => Self::Error {
                message: text_lesen(rest, art)?,
            },
        };
        Ok(antwort)
    }
}

fn anzahl_pruefen(
    art: AntwortArt,
    anzahl: usize,
    eintrag: usize,
    laenge: usize,
) -> Result<(), DecodeError> {
    let benoetigt = anzahl
        .checked_mul(eintrag)
        .and_then(|n| n.checked_add(art.grundgroesse()));
    match benoetigt {
        Some(n) if n <= laenge => Ok(()),
        _ => Err(DecodeError::FalscheAnzahl {
            art,
            anzahl,
            laenge,
        }),
    }
}

fn ungueltig(art: AntwortArt, feld: &'static str) -> impl FnOnce(FeldFehler) -> DecodeError {
    move |grund| DecodeError::UngueltigeAntwort { art, feld, grund }
}

fn kanal_lesen(rest: &mut &[u8], art: AntwortArt) -> Result<ChannelName, DecodeError> {
    let roh = wire::feld_lesen(rest, CHANNEL_MAX).map_err(ungueltig(art, "Kanal"))?;
    ChannelName::neu(roh).map_err(|e| ungueltig(art, "Kanal")(FeldFehler::Ungueltig(e.to_string())))
}

fn username_lesen(rest: &mut &[u8], art: AntwortArt) -> Result<Username, DecodeError> {
    let roh = wire::feld_lesen(rest, USERNAME_MAX).map_err(ungueltig(art, "Benutzername"))?;
    Username::neu(roh)
        .map_err(|e| ungueltig(art, "Benutzername")(FeldFehler::Ungueltig(e.to_string())))
}

fn text_lesen(rest: &mut &[u8], art: AntwortArt) -> Result<String, DecodeError> {
    wire::feld_lesen(rest, SAY_MAX).map_err(ungueltig(art, "Text"))
}
