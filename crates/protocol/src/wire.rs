//! Wire-Format fuer UDP-Datagramme
//!
//! Jedes Datagramm ist ein gepackter Record fester Groesse. Zahlen sind
//! little-endian, Strings sind NUL-terminierte Felder fester Kapazitaet.
//!
//! ## Layouts (Client -> Server und Server -> Server)
//!
//! ```text
//! Art          Tag  Groesse  Felder
//! -----------  ---  -------  ------
//! LOGIN         0     36     tag, username[32]
//! LOGOUT        1      4     tag
//! JOIN          2     36     tag, channel[32]
//! LEAVE         3     36     tag, channel[32]
//! SAY           4    100     tag, channel[32], text[64]
//! LIST          5      4     tag
//! WHO           6     36     tag, channel[32]
//! KEEP_ALIVE    7      4     tag
//! S2S_JOIN      8     36     tag, channel[32]
//! S2S_LEAVE     9     36     tag, channel[32]
//! S2S_SAY      10    140     tag, id(u64), username[32], channel[32], text[64]
//! ```
//!
//! Server -> Client Antworten haben einen eigenen Tag-Raum, siehe
//! [`crate::response`].

use bytes::{Buf, BufMut, Bytes, BytesMut};
use duckfed_core::{ChannelName, Username, CHANNEL_MAX, USERNAME_MAX};
use std::fmt;

use crate::error::{DecodeError, FeldFehler};
use crate::request::Request;
use crate::s2s::S2sMessage;

/// Groesse des Art-Tags in Bytes
pub const TAG_GROESSE: usize = 4;

/// Empfangspuffer: groesser als jedes gueltige Datagramm
pub const MAX_DATAGRAMM_GROESSE: usize = 1024;

// ---------------------------------------------------------------------------
// Art
// ---------------------------------------------------------------------------

/// Art eines eingehenden Datagramms (Client-Anfrage oder Federation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Art {
    Login = 0,
    Logout = 1,
    Join = 2,
    Leave = 3,
    Say = 4,
    List = 5,
    Who = 6,
    KeepAlive = 7,
    S2sJoin = 8,
    S2sLeave = 9,
    S2sSay = 10,
}

impl Art {
    /// Konvertiert ein Tag in eine `Art`
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(Self::Login),
            1 => Some(Self::Logout),
            2 => Some(Self::Join),
            3 => Some(Self::Leave),
            4 => Some(Self::Say),
            5 => Some(Self::List),
            6 => Some(Self::Who),
            7 => Some(Self::KeepAlive),
            8 => Some(Self::S2sJoin),
            9 => Some(Self::S2sLeave),
            10 => Some(Self::S2sSay),
            _ => None,
        }
    }

    pub fn tag(self) -> u32 {
        self as u32
    }

    /// Mindestgroesse eines Datagramms dieser Art
    pub fn groesse(self) -> usize {
        use duckfed_core::SAY_MAX;
        match self {
            Self::Logout | Self::List | Self::KeepAlive => TAG_GROESSE,
            Self::Login => TAG_GROESSE + USERNAME_MAX,
            Self::Join | Self::Leave | Self::Who | Self::S2sJoin | Self::S2sLeave => {
                TAG_GROESSE + CHANNEL_MAX
            }
            Self::Say => TAG_GROESSE + CHANNEL_MAX + SAY_MAX,
            Self::S2sSay => TAG_GROESSE + 8 + USERNAME_MAX + CHANNEL_MAX + SAY_MAX,
        }
    }

    /// Server-zu-Server-Nachricht?
    pub fn ist_federation(self) -> bool {
        matches!(self, Self::S2sJoin | Self::S2sLeave | Self::S2sSay)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Login => "LOGIN",
            Self::Logout => "LOGOUT",
            Self::Join => "JOIN",
            Self::Leave => "LEAVE",
            Self::Say => "SAY",
            Self::List => "LIST",
            Self::Who => "WHO",
            Self::KeepAlive => "KEEP_ALIVE",
            Self::S2sJoin => "S2S_JOIN",
            Self::S2sLeave => "S2S_LEAVE",
            Self::S2sSay => "S2S_SAY",
        }
    }
}

impl fmt::Display for Art {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Datagram
// ---------------------------------------------------------------------------

/// Ein dekodiertes eingehendes Datagramm
///
/// Der einzige Dispatch-Punkt im Server matcht exhaustiv auf diesem Typ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Datagram {
    /// Anfrage eines lokalen Clients
    Client(Request),
    /// Nachricht eines Nachbarservers
    Federation(S2sMessage),
}

impl Datagram {
    /// Dekodiert ein Datagramm
    ///
    /// Prueft zuerst Tag und Mindestlaenge, erst danach werden Felder gelesen.
    ///
    /// # Fehler
    /// - `OhneArt` wenn weniger als 4 Bytes vorliegen
    /// - `UnbekannteArt` bei unbekanntem Tag
    /// - `ZuKurz` wenn das Datagramm kuerzer als seine Art ist
    /// - `UngueltigesFeld` bei nicht terminierten oder ungueltigen Strings
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let (art, mut rest) = kopf_lesen(buf)?;
        if art.ist_federation() {
            S2sMessage::decode_rumpf(art, &mut rest).map(Self::Federation)
        } else {
            Request::decode_rumpf(art, &mut rest).map(Self::Client)
        }
    }

    /// Serialisiert das Datagramm
    pub fn encode(&self) -> Bytes {
        match self {
            Self::Client(anfrage) => anfrage.encode(),
            Self::Federation(nachricht) => nachricht.encode(),
        }
    }

    pub fn art(&self) -> Art {
        match self {
            Self::Client(anfrage) => anfrage.art(),
            Self::Federation(nachricht) => nachricht.art(),
        }
    }
}

/// Liest Tag und prueft die Mindestgroesse
///
/// Gibt die Art und den Rest hinter dem Tag zurueck.
pub(crate) fn kopf_lesen(buf: &[u8]) -> Result<(Art, &[u8]), DecodeError> {
    if buf.len() < TAG_GROESSE {
        return Err(DecodeError::OhneArt { laenge: buf.len() });
    }
    let mut rest = buf;
    let tag = rest.get_u32_le();
    let art = Art::from_tag(tag).ok_or(DecodeError::UnbekannteArt(tag))?;
    if buf.len() < art.groesse() {
        return Err(DecodeError::ZuKurz {
            art,
            laenge: buf.len(),
            erwartet: art.groesse(),
        });
    }
    Ok((art, rest))
}

// ---------------------------------------------------------------------------
// Feld-Codierung
// ---------------------------------------------------------------------------

/// Liest ein NUL-terminiertes String-Feld fester Kapazitaet
///
/// Der Aufrufer muss sicherstellen, dass mindestens `kapazitaet` Bytes
/// vorliegen (durch die Mindestgroessen-Pruefung garantiert).
pub(crate) fn feld_lesen(buf: &mut &[u8], kapazitaet: usize) -> Result<String, FeldFehler> {
    let roh = feld_roh_lesen(buf, kapazitaet)?;
    std::str::from_utf8(roh)
        .map(str::to_owned)
        .map_err(|_| FeldFehler::KeinUtf8)
}

/// Liest die Bytes eines NUL-terminierten Felds (ohne Terminator)
fn feld_roh_lesen<'a>(buf: &mut &'a [u8], kapazitaet: usize) -> Result<&'a [u8], FeldFehler> {
    let rest: &'a [u8] = *buf;
    let (feld, danach) = rest.split_at(kapazitaet);
    *buf = danach;

    let ende = feld
        .iter()
        .position(|&b| b == 0)
        .ok_or(FeldFehler::NichtTerminiert)?;
    Ok(&feld[..ende])
}

/// Liest ein Benutzernamen-Feld
pub(crate) fn username_lesen(
    buf: &mut &[u8],
    art: Art,
    feld: &'static str,
) -> Result<Username, DecodeError> {
    let roh = feld_lesen(buf, USERNAME_MAX)
        .map_err(|grund| DecodeError::UngueltigesFeld { art, feld, grund })?;
    Username::neu(roh).map_err(|e| DecodeError::UngueltigesFeld {
        art,
        feld,
        grund: FeldFehler::Ungueltig(e.to_string()),
    })
}

/// Liest ein Kanalnamen-Feld
pub(crate) fn kanal_lesen(
    buf: &mut &[u8],
    art: Art,
    feld: &'static str,
) -> Result<ChannelName, DecodeError> {
    let roh = feld_lesen(buf, CHANNEL_MAX)
        .map_err(|grund| DecodeError::UngueltigesFeld { art, feld, grund })?;
    ChannelName::neu(roh).map_err(|e| DecodeError::UngueltigesFeld {
        art,
        feld,
        grund: FeldFehler::Ungueltig(e.to_string()),
    })
}

/// Liest ein Text-Feld (darf leer sein)
///
/// Text wird unveraendert weitergereicht; ungueltige UTF-8-Sequenzen werden
/// durch U+FFFD ersetzt statt das Datagramm abzulehnen.
pub(crate) fn text_lesen(
    buf: &mut &[u8],
    art: Art,
    kapazitaet: usize,
) -> Result<String, DecodeError> {
    let roh = feld_roh_lesen(buf, kapazitaet).map_err(|grund| DecodeError::UngueltigesFeld {
        art,
        feld: "Text",
        grund,
    })?;
    Ok(String::from_utf8_lossy(roh).into_owned())
}

/// Kuerzt einen String auf hoechstens `max` Bytes an einer Zeichengrenze
pub fn abschneiden(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut ende = max;
    while !text.is_char_boundary(ende) {
        ende -= 1;
    }
    &text[..ende]
}

/// Schreibt ein String-Feld fester Kapazitaet (mit NUL aufgefuellt)
///
/// Zu lange Werte werden an einer Zeichengrenze gekuerzt, sodass immer
/// mindestens ein NUL-Terminator bleibt.
pub(crate) fn feld_schreiben(buf: &mut BytesMut, wert: &str, kapazitaet: usize) {
    let inhalt = abschneiden(wert, kapazitaet - 1).as_bytes();
    buf.put_slice(inhalt);
    buf.put_bytes(0, kapazitaet - inhalt.len());
}

/// Legt einen Puffer fuer eine Art an und schreibt das Tag
pub(crate) fn puffer_mit_tag(tag: u32, groesse: usize) -> BytesMut {
    let mut buf = BytesMut::with_capacity(groesse);
    buf.put_u32_le(tag);
    buf
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use duckfed_core::MessageId;

    fn kanal(name: &str) -> ChannelName {
        ChannelName::neu(name).unwrap()
    }

    #[test]
    fn groessen_entsprechen_layout() {
        assert_eq!(Art::Login.groesse(), 36);
        assert_eq!(Art::Logout.groesse(), 4);
        assert_eq!(Art::Say.groesse(), 100);
        assert_eq!(Art::Who.groesse(), 36);
        assert_eq!(Art::S2sJoin.groesse(), 36);
        assert_eq!(Art::S2sSay.groesse(), 140);
    }

    #[test]
    fn encode_erzeugt_exakte_groesse() {
        let join = Datagram::Client(Request::Join { channel: kanal("g") });
        assert_eq!(join.encode().len(), Art::Join.groesse());

        let say = Datagram::Federation(S2sMessage::Say {
            id: MessageId(7),
            username: Username::neu("alice").unwrap(),
            channel: kanal("g"),
            text: "hallo".into(),
        });
        assert_eq!(say.encode().len(), Art::S2sSay.groesse());
    }

    #[test]
    fn tag_ist_little_endian() {
        let bytes = Datagram::Federation(S2sMessage::Leave { channel: kanal("x") }).encode();
        assert_eq!(&bytes[..4], &[9, 0, 0, 0]);
        assert_eq!(&bytes[4..6], b"x\0");
    }

    #[test]
    fn zu_kurzes_datagramm_wird_abgelehnt() {
        let mut bytes = Datagram::Client(Request::Join { channel: kanal("g") })
            .encode()
            .to_vec();
        bytes.truncate(20);
        assert_eq!(
            Datagram::decode(&bytes),
            Err(DecodeError::ZuKurz {
                art: Art::Join,
                laenge: 20,
                erwartet: 36
            })
        );
    }

    #[test]
    fn datagramm_ohne_tag() {
        assert_eq!(
            Datagram::decode(&[1, 0]),
            Err(DecodeError::OhneArt { laenge: 2 })
        );
    }

    #[test]
    fn unbekannte_art() {
        assert_eq!(
            Datagram::decode(&[42, 0, 0, 0, 0, 0]),
            Err(DecodeError::UnbekannteArt(42))
        );
    }

    #[test]
    fn nicht_terminiertes_feld_wird_abgelehnt() {
        let mut bytes = vec![2, 0, 0, 0];
        bytes.extend_from_slice(&[b'a'; 32]);
        assert_eq!(
            Datagram::decode(&bytes),
            Err(DecodeError::UngueltigesFeld {
                art: Art::Join,
                feld: "Kanal",
                grund: FeldFehler::NichtTerminiert
            })
        );
    }

    #[test]
    fn leerer_kanalname_wird_abgelehnt() {
        let mut bytes = vec![2, 0, 0, 0];
        bytes.extend_from_slice(&[0; 32]);
        assert!(matches!(
            Datagram::decode(&bytes),
            Err(DecodeError::UngueltigesFeld {
                grund: FeldFehler::Ungueltig(_),
                ..
            })
        ));
    }

    #[test]
    fn ueberlange_datagramme_werden_akzeptiert() {
        // Zusaetzliche Bytes hinter dem Record stoeren nicht
        let mut bytes = Datagram::Client(Request::List).encode().to_vec();
        bytes.extend_from_slice(&[0xFF; 16]);
        assert_eq!(Datagram::decode(&bytes), Ok(Datagram::Client(Request::List)));
    }

    #[test]
    fn feld_schreiben_kuerzt_an_zeichengrenze() {
        let mut buf = BytesMut::new();
        // 'ä' belegt zwei Bytes -> darf nicht halbiert werden
        let wert = format!("{}ä", "a".repeat(30));
        feld_schreiben(&mut buf, &wert, 32);
        assert_eq!(buf.len(), 32);
        assert_eq!(&buf[..30], "a".repeat(30).as_bytes());
        assert_eq!(buf[30], 0);
    }

    #[test]
    fn abschneiden_laesst_kurze_texte_unveraendert() {
        assert_eq!(abschneiden("kurz", 63), "kurz");
        assert_eq!(abschneiden("abcdef", 3), "abc");
    }
}
