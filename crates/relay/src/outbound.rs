//! Postausgang – ausgehende Datagramme einer Zustandsoperation
//!
//! Zustandsoperationen senden nie selbst. Sie sammeln Ziel und Nachricht
//! im [`Postausgang`], den die UDP-Schicht erst nach Freigabe des
//! Zustands-Locks kodiert und verschickt.

use bytes::Bytes;
use duckfed_protocol::{Response, S2sMessage};
use std::net::SocketAddr;

/// Nachricht an einen lokalen Client oder einen Nachbarserver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Nachricht {
    Antwort(Response),
    Federation(S2sMessage),
}

impl Nachricht {
    pub fn encode(&self) -> Bytes {
        match self {
            Self::Antwort(antwort) => antwort.encode(),
            Self::Federation(nachricht) => nachricht.encode(),
        }
    }
}

/// Ein einzelnes ausgehendes Datagramm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ausgehend {
    pub ziel: SocketAddr,
    pub nachricht: Nachricht,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Postausgang {
    eintraege: Vec<Ausgehend>,
}

impl Postausgang {
    pub fn neu() -> Self {
        Self::default()
    }

    pub fn antwort(&mut self, ziel: SocketAddr, antwort: Response) {
        self.eintraege.push(Ausgehend {
            ziel,
            nachricht: Nachricht::Antwort(antwort),
        });
    }

    pub fn federation(&mut self, ziel: SocketAddr, nachricht: S2sMessage) {
        self.eintraege.push(Ausgehend {
            ziel,
            nachricht: Nachricht::Federation(nachricht),
        });
    }

    /// Haengt einen anderen Postausgang an
    pub fn anhaengen(&mut self, andere: Postausgang) {
        self.eintraege.extend(andere.eintraege);
    }

    pub fn len(&self) -> usize {
        self.eintraege.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eintraege.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ausgehend> {
        self.eintraege.iter()
    }

    /// Alle Nachrichten an ein bestimmtes Ziel
    pub fn an(&self, ziel: SocketAddr) -> impl Iterator<Item = &Nachricht> {
        self.eintraege
            .iter()
            .filter(move |a| a.ziel == ziel)
            .map(|a| &a.nachricht)
    }
}

impl IntoIterator for Postausgang {
    type Item = Ausgehend;
    type IntoIter = std::vec::IntoIter<Ausgehend>;

    fn into_iter(self) -> Self::IntoIter {
        self.eintraege.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duckfed_core::ChannelName;
    use std::net::{IpAddr, Ipv4Addr};

    fn endpunkt(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    }

    #[test]
    fn filter_nach_ziel() {
        let kanal = ChannelName::neu("g").unwrap();
        let mut post = Postausgang::neu();
        post.federation(endpunkt(1), S2sMessage::Join { channel: kanal.clone() });
        post.antwort(endpunkt(2), Response::error("x"));
        post.federation(endpunkt(1), S2sMessage::Leave { channel: kanal });

        assert_eq!(post.len(), 3);
        assert_eq!(post.an(endpunkt(1)).count(), 2);
        assert_eq!(post.an(endpunkt(3)).count(), 0);
    }

    #[test]
    fn anhaengen_behaelt_reihenfolge() {
        let mut a = Postausgang::neu();
        a.antwort(endpunkt(1), Response::error("eins"));
        let mut b = Postausgang::neu();
        b.antwort(endpunkt(2), Response::error("zwei"));
        a.anhaengen(b);

        let ziele: Vec<_> = a.into_iter().map(|x| x.ziel).collect();
        assert_eq!(ziele, vec![endpunkt(1), endpunkt(2)]);
    }
}
