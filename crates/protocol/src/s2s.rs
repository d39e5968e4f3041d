//! Server-zu-Server-Nachrichten
//!
//! Nachbarserver tauschen nur drei Nachrichten aus: Interesse an einem
//! Kanal anmelden (`S2S_JOIN`), Interesse abmelden (`S2S_LEAVE`) und eine
//! Kanal-Nachricht fluten (`S2S_SAY`). Jede geflutete Nachricht traegt eine
//! vom Ursprungsserver vergebene 64-Bit-ID fuer die Schleifen-Erkennung.

use bytes::{Buf, BufMut, Bytes};
use duckfed_core::{ChannelName, MessageId, Username, CHANNEL_MAX, SAY_MAX, USERNAME_MAX};

use crate::error::DecodeError;
use crate::wire::{self, Art};

/// Nachricht eines Nachbarservers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum S2sMessage {
    Join {
        channel: ChannelName,
    },
    Leave {
        channel: ChannelName,
    },
    Say {
        id: MessageId,
        username: Username,
        channel: ChannelName,
        text: String,
    },
}

impl S2sMessage {
    pub fn art(&self) -> Art {
        match self {
            Self::Join { .. } => Art::S2sJoin,
            Self::Leave { .. } => Art::S2sLeave,
            Self::Say { .. } => Art::S2sSay,
        }
    }

    /// Kanal, auf den sich die Nachricht bezieht
    pub fn channel(&self) -> &ChannelName {
        match self {
            Self::Join { channel } | Self::Leave { channel } | Self::Say { channel, .. } => {
                channel
            }
        }
    }

    /// Dekodiert ein vollstaendiges Datagramm als S2S-Nachricht
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let (art, mut rest) = wire::kopf_lesen(buf)?;
        Self::decode_rumpf(art, &mut rest)
    }

    pub(crate) fn decode_rumpf(art: Art, rest: &mut &[u8]) -> Result<Self, DecodeError> {
        let nachricht = match art {
            Art::S2sJoin => Self::Join {
                channel: wire::kanal_lesen(rest, art, "Kanal")?,
            },
            Art::S2sLeave => Self::Leave {
                channel: wire::kanal_lesen(rest, art, "Kanal")?,
            },
            Art::S2sSay => {
                let id = MessageId(rest.get_u64_le());
                let username = wire::username_lesen(rest, art, "Benutzername")?;
                let channel = wire::kanal_lesen(rest, art, "Kanal")?;
                let text = wire::text_lesen(rest, art, SAY_MAX)?;
                Self::Say {
                    id,
                    username,
                    channel,
                    text,
                }
            }
            andere => return Err(DecodeError::UnbekannteArt(andere.tag())),
        };
        Ok(nachricht)
    }

    /// Serialisiert die Nachricht
    pub fn encode(&self) -> Bytes {
        let art = self.art();
        let mut buf = wire::puffer_mit_tag(art.tag(), art.groesse());
        match self {
            Self::Join { channel } | Self::Leave { channel } => {
                wire::feld_schreiben(&mut buf, channel.as_str(), CHANNEL_MAX)
            }
            Self::Say {
                id,
                username,
                channel,
                text,
            } => {
                buf.put_u64_le(id.inner());
                wire::feld_schreiben(&mut buf, username.as_str(), USERNAME_MAX);
                wire::feld_schreiben(&mut buf, channel.as_str(), CHANNEL_MAX);
                wire::feld_schreiben(&mut buf, text, SAY_MAX);
            }
        }
        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn say_traegt_id_little_endian() {
        let nachricht = S2sMessage::Say {
            id: MessageId(0x0102_0304_0506_0708),
            username: Username::neu("bob").unwrap(),
            channel: ChannelName::neu("g").unwrap(),
            text: "hello".into(),
        };
        let bytes = nachricht.encode();
        assert_eq!(&bytes[..4], &[10, 0, 0, 0]);
        assert_eq!(&bytes[4..12], &[8, 7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(&bytes[12..16], b"bob\0");
        assert_eq!(&bytes[44..46], b"g\0");
        assert_eq!(&bytes[76..82], b"hello\0");
        assert_eq!(S2sMessage::decode(&bytes), Ok(nachricht));
    }

    #[test]
    fn kanal_accessor() {
        let kanal = ChannelName::neu("x").unwrap();
        let leave = S2sMessage::Leave {
            channel: kanal.clone(),
        };
        assert_eq!(leave.channel(), &kanal);
        assert_eq!(leave.art(), Art::S2sLeave);
    }

    #[test]
    fn client_tag_ist_keine_s2s_nachricht() {
        let bytes = crate::Request::List.encode();
        assert_eq!(S2sMessage::decode(&bytes), Err(DecodeError::UnbekannteArt(5)));
    }

    #[test]
    fn s2s_say_zu_kurz() {
        let bytes = vec![10, 0, 0, 0, 1, 2, 3];
        assert!(matches!(
            S2sMessage::decode(&bytes),
            Err(DecodeError::ZuKurz {
                art: Art::S2sSay,
                erwartet: 140,
                ..
            })
        ));
    }
}
