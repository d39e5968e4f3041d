//! Client-Anfragen (Client -> Server)

use bytes::Bytes;
use duckfed_core::{ChannelName, Username, CHANNEL_MAX, SAY_MAX, USERNAME_MAX};

use crate::error::DecodeError;
use crate::wire::{self, Art};

/// Anfrage eines lokalen Clients
///
/// Die Sitzung wird allein ueber den UDP-Endpunkt des Absenders
/// identifiziert, deshalb traegt keine Anfrage ein Token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Login { username: Username },
    Logout,
    Join { channel: ChannelName },
    Leave { channel: ChannelName },
    Say { channel: ChannelName, text: String },
    List,
    Who { channel: ChannelName },
    /// Lebenszeichen des Clients, ohne Wirkung auf den Zustand
    KeepAlive,
}

impl Request {
    pub fn art(&self) -> Art {
        match self {
            Self::Login { .. } => Art::Login,
            Self::Logout => Art::Logout,
            Self::Join { .. } => Art::Join,
            Self::Leave { .. } => Art::Leave,
            Self::Say { .. } => Art::Say,
            Self::List => Art::List,
            Self::Who { .. } => Art::Who,
            Self::KeepAlive => Art::KeepAlive,
        }
    }

    /// Dekodiert ein vollstaendiges Datagramm als Client-Anfrage
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let (art, mut rest) = wire::kopf_lesen(buf)?;
        Self::decode_rumpf(art, &mut rest)
    }

    /// Dekodiert den Rumpf hinter dem Tag (Mindestgroesse bereits geprueft)
    pub(crate) fn decode_rumpf(art: Art, rest: &mut &[u8]) -> Result<Self, DecodeError> {
        let anfrage = match art {
            Art::Login => Self::Login {
                username: wire::username_lesen(rest, art, "Benutzername")?,
            },
            Art::Logout => Self::Logout,
            Art::Join => Self::Join {
                channel: wire::kanal_lesen(rest, art, "Kanal")?,
            },
            Art::Leave => Self::Leave {
                channel: wire::kanal_lesen(rest, art, "Kanal")?,
            },
            Art::Say => {
                let channel = wire::kanal_lesen(rest, art, "Kanal")?;
                let text = wire::text_lesen(rest, art, SAY_MAX)?;
                Self::Say { channel, text }
            }
            Art::List => Self::List,
            Art::Who => Self::Who {
                channel: wire::kanal_lesen(rest, art, "Kanal")?,
            },
            Art::KeepAlive => Self::KeepAlive,
            Art::S2sJoin | Art::S2sLeave | Art::S2sSay => {
                return Err(DecodeError::UnbekannteArt(art.tag()))
            }
        };
        Ok(anfrage)
    }

    /// Serialisiert die Anfrage
    pub fn encode(&self) -> Bytes {
        let art = self.art();
        let mut buf = wire::puffer_mit_tag(art.tag(), art.groesse());
        match self {
            Self::Login { username } => {
                wire::feld_schreiben(&mut buf, username.as_str(), USERNAME_MAX)
            }
            Self::Join { channel } | Self::Leave { channel } | Self::Who { channel } => {
                wire::feld_schreiben(&mut buf, channel.as_str(), CHANNEL_MAX)
            }
            Self::Say { channel, text } => {
                wire::feld_schreiben(&mut buf, channel.as_str(), CHANNEL_MAX);
                wire::feld_schreiben(&mut buf, text, SAY_MAX);
            }
            Self::Logout | Self::List | Self::KeepAlive => {}
        }
        buf.freeze()
    }
}
