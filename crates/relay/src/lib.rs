//! duckfed-relay – Federation-Relay fuer Kanal-Chat
//!
//! Ein Server bedient lokale Clients ueber UDP und flutet Kanalverkehr an
//! benachbarte Server, sodass ein Kanal ueber mehrere Server hinweg
//! Mitglieder haben kann.
//!
//! ## Module
//! - [`directory`] – Sitzungen und Kanaele der lokalen Benutzer
//! - [`broadcast`] – Verteilung einer Nachricht an lokale Mitglieder
//! - [`routing`] – Federation-Routing-Tabelle und Nachbar-Registry
//! - [`dedup`] – Duplikat-Erkennung fuer geflutete Nachrichten
//! - [`flood`] – JOIN/LEAVE/SAY-Flooding ueber die Nachbarn
//! - [`soft_state`] – Periodische Erneuerung und Bereinigung
//! - [`dispatch`] – Einziger Dispatch-Punkt fuer eingehende Datagramme
//! - [`state`] – Gesamtzustand und geteilter Zugriff
//! - [`udp`] – UDP-Empfangs-Loop, Timer und Send-Queue

pub mod broadcast;
pub mod dedup;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod flood;
pub mod outbound;
pub mod routing;
pub mod soft_state;
pub mod state;
pub mod udp;

pub use error::RelayError;
pub use outbound::{Ausgehend, Nachricht, Postausgang};
pub use state::{RelayConfig, RelayHandle, RelayState};
pub use udp::RelayServer;
