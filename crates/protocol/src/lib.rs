//! duckfed-protocol – Netzwerkprotokoll-Definitionen
//!
//! Dieses Crate definiert alle Datagramme, die zwischen Client und Server
//! sowie zwischen benachbarten Servern ausgetauscht werden. Jedes Datagramm
//! ist ein Binaer-Record fester Groesse, der mit einem 32-Bit-Art-Tag beginnt.
//!
//! ## Module
//! - [`wire`] – Art-Tags, Groessen, Feld-Codierung und `Datagram`-Dispatch
//! - [`request`] – Client-Anfragen (LOGIN, JOIN, SAY, ...)
//! - [`response`] – Server-Antworten an Clients (SAY, LIST, WHO, ERROR)
//! - [`s2s`] – Server-zu-Server-Nachrichten (S2S_JOIN, S2S_LEAVE, S2S_SAY)
//! - [`error`] – Decode-Fehler

pub mod error;
pub mod request;
pub mod response;
pub mod s2s;
pub mod wire;

pub use error::DecodeError;
pub use request::Request;
pub use response::{AntwortArt, Response};
pub use s2s::S2sMessage;
pub use wire::{Art, Datagram};
