//! UDP Relay Server – Empfangs-Loop, Soft-State-Timer und Send-Queue
//!
//! ## Architektur
//!
//! ```text
//! UDP Socket (recv_from)              tokio::time::interval
//!     |                                   |
//!     v                                   v
//! RelayHandle::verarbeiten()          RelayHandle::tick()
//!     |   (Lock nur fuer die               |
//!     |    synchrone Operation)            |
//!     +-------------+---------------------+
//!                   v
//!             Postausgang
//!                   |
//!                   v
//!     SenderHandle (mpsc) --> UDP send_to Task
//! ```
//!
//! Der Zustands-Lock wird nie ueber ein `.await` gehalten. Gesendet wird
//! erst, nachdem die Zustandsoperation abgeschlossen ist.

use bytes::Bytes;
use duckfed_observability::DuckfedMetrics;
use duckfed_protocol::wire::MAX_DATAGRAMM_GROESSE;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;

use crate::outbound::{Ausgehend, Nachricht, Postausgang};
use crate::state::RelayHandle;

// ---------------------------------------------------------------------------
// SenderHandle – gemeinsame Send-Queue
// ---------------------------------------------------------------------------

/// Handle fuer den Sende-Task
///
/// Klone teilen dieselbe Queue. Der Task endet, wenn alle Klone gedroppt
/// sind.
#[derive(Clone)]
pub struct SenderHandle {
    tx: mpsc::Sender<(SocketAddr, Bytes)>,
    metriken: DuckfedMetrics,
}

impl SenderHandle {
    /// Startet den Sende-Task
    ///
    /// Liest aus der mpsc-Queue und sendet via UDP. Ein Sendefehler betrifft
    /// nur das eine Datagramm.
    pub fn starten(
        socket: Arc<UdpSocket>,
        queue_groesse: usize,
        metriken: DuckfedMetrics,
    ) -> (Self, tokio::task::JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<(SocketAddr, Bytes)>(queue_groesse.max(1));

        let task = tokio::spawn(async move {
            while let Some((ziel, daten)) = rx.recv().await {
                match socket.send_to(&daten, ziel).await {
                    Ok(_) => {
                        tracing::trace!(bytes = daten.len(), ziel = %ziel, "UDP-Datagramm gesendet");
                    }
                    Err(e) => {
                        tracing::warn!(fehler = %e, ziel = %ziel, "UDP-Sendefehler");
                    }
                }
            }
            tracing::debug!("Sende-Task beendet");
        });

        (Self { tx, metriken }, task)
    }

    /// Kodiert und reiht alle Datagramme eines Postausgangs ein
    ///
    /// Nicht-blockierend: bei voller Queue wird verworfen (UDP-Semantik).
    pub fn senden(&self, post: Postausgang) {
        for Ausgehend { ziel, nachricht } in post {
            let daten = nachricht.encode();
            match self.tx.try_send((ziel, daten)) {
                Ok(()) => {
                    if let Nachricht::Federation(m) = &nachricht {
                        self.metriken.s2s_gesendet(m.art().name());
                    }
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    self.metriken.send_queue_dropped_total.inc();
                    tracing::warn!(ziel = %ziel, "Send-Queue voll – Datagramm verworfen");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!(ziel = %ziel, "Send-Queue geschlossen");
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// RelayServer
// ---------------------------------------------------------------------------

/// UDP Relay Server
///
/// Ein Socket fuer Clients und Nachbarserver gleichermassen.
pub struct RelayServer {
    socket: Arc<UdpSocket>,
    state: RelayHandle,
    sender: SenderHandle,
    tick: Duration,
    sende_task: tokio::task::JoinHandle<()>,
}

impl RelayServer {
    /// Bindet den UDP-Socket und erstellt einen neuen RelayServer
    pub async fn binden(bind_addr: SocketAddr, state: RelayHandle) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(bind_addr).await?;
        tracing::info!(addr = %socket.local_addr()?, "UDP Relay Server gebunden");
        Ok(Self::mit_socket(socket, state))
    }

    /// Erstellt einen RelayServer auf einem bereits gebundenen Socket
    pub fn mit_socket(socket: UdpSocket, state: RelayHandle) -> Self {
        let (tick, queue_groesse, metriken) = state.lesen(|s| {
            (
                s.config().tick,
                s.config().send_queue_groesse,
                s.metriken().clone(),
            )
        });
        let socket = Arc::new(socket);
        let (sender, sende_task) = SenderHandle::starten(Arc::clone(&socket), queue_groesse, metriken);
        Self {
            socket,
            state,
            sender,
            tick,
            sende_task,
        }
    }

    /// Gibt die lokale Bind-Adresse zurueck
    pub fn lokale_adresse(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn state(&self) -> &RelayHandle {
        &self.state
    }

    /// Startet Timer und Empfangs-Loop (laeuft bis `shutdown_rx` ein Signal
    /// sendet oder sein Sender gedroppt wird)
    pub async fn starten(&self, mut shutdown_rx: oneshot::Receiver<()>) {
        let timer = self.timer_starten();

        let mut buf = [0u8; MAX_DATAGRAMM_GROESSE];
        tracing::info!("Relay-Empfangs-Loop gestartet");

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buf) => {
                    match result {
                        Ok((len, absender)) => {
                            tracing::trace!(bytes = len, absender = %absender, "UDP-Datagramm empfangen");
                            let post = self.state.verarbeiten(&buf[..len], absender);
                            self.sender.senden(post);
                        }
                        Err(e) => {
                            // ICMP-Fehler frueherer Sendungen landen hier (z.B. Port unerreichbar)
                            tracing::debug!(fehler = %e, "UDP-Empfangsfehler");
                            tokio::time::sleep(Duration::from_millis(1)).await;
                        }
                    }
                }

                _ = &mut shutdown_rx => {
                    tracing::info!("Relay-Server: Shutdown-Signal empfangen");
                    break;
                }
            }
        }

        timer.abort();
        tracing::info!("Relay-Empfangs-Loop beendet");
    }

    fn timer_starten(&self) -> tokio::task::JoinHandle<()> {
        let state = self.state.clone();
        let sender = self.sender.clone();
        let tick = self.tick;

        tokio::spawn(async move {
            let mut intervall = tokio::time::interval(tick);
            intervall.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                intervall.tick().await;
                let post = state.tick();
                sender.senden(post);
            }
        })
    }
}

impl Drop for RelayServer {
    fn drop(&mut self) {
        self.sende_task.abort();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{RelayConfig, RelayState};
    use duckfed_core::{ChannelName, Username};
    use duckfed_protocol::{Request, Response};
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Instant;

    fn localhost(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    }

    fn handle() -> RelayHandle {
        RelayHandle::neu(RelayState::neu(
            RelayConfig::default(),
            DuckfedMetrics::neu().unwrap(),
            Instant::now(),
        ))
    }

    async fn empfangen(sock: &UdpSocket) -> Response {
        let mut buf = [0u8; MAX_DATAGRAMM_GROESSE];
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), sock.recv_from(&mut buf))
            .await
            .expect("Timeout beim Warten auf Antwort")
            .unwrap();
        Response::decode(&buf[..len]).expect("Antwort muss dekodierbar sein")
    }

    #[tokio::test]
    async fn relay_server_binden() {
        let server = RelayServer::binden(localhost(0), handle())
            .await
            .expect("Server muss binden koennen");
        let addr = server.lokale_adresse().expect("Adresse muss verfuegbar sein");
        assert_ne!(addr.port(), 0, "OS muss einen Port zuweisen");
    }

    #[tokio::test]
    async fn client_say_round_trip() {
        let server = Arc::new(RelayServer::binden(localhost(0), handle()).await.unwrap());
        let server_addr = server.lokale_adresse().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server_clone = Arc::clone(&server);
        let recv_task = tokio::spawn(async move {
            server_clone.starten(shutdown_rx).await;
        });

        let client = UdpSocket::bind(localhost(0)).await.unwrap();
        let g = ChannelName::neu("g").unwrap();
        for anfrage in [
            Request::Login { username: Username::neu("alice").unwrap() },
            Request::Join { channel: g.clone() },
            Request::Say { channel: g.clone(), text: "hallo".into() },
        ] {
            client.send_to(&anfrage.encode(), server_addr).await.unwrap();
        }

        assert_eq!(
            empfangen(&client).await,
            Response::Say {
                channel: g.clone(),
                username: Username::neu("alice").unwrap(),
                text: "hallo".into(),
            }
        );

        client.send_to(&Request::List.encode(), server_addr).await.unwrap();
        match empfangen(&client).await {
            Response::List { mut channels } => {
                channels.sort();
                assert_eq!(channels, vec![ChannelName::standard(), g]);
            }
            andere => panic!("LIST erwartet, erhalten: {andere:?}"),
        }

        let _ = shutdown_tx.send(());
        recv_task.await.unwrap();
    }

    #[tokio::test]
    async fn ungueltiges_datagramm_erhaelt_error() {
        let server = Arc::new(RelayServer::binden(localhost(0), handle()).await.unwrap());
        let server_addr = server.lokale_adresse().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server_clone = Arc::clone(&server);
        let recv_task = tokio::spawn(async move {
            server_clone.starten(shutdown_rx).await;
        });

        let client = UdpSocket::bind(localhost(0)).await.unwrap();
        client.send_to(&[4, 0, 0, 0, b'g'], server_addr).await.unwrap();

        match empfangen(&client).await {
            Response::Error { message } => assert!(message.contains("zu kurz"), "{message}"),
            andere => panic!("ERROR erwartet, erhalten: {andere:?}"),
        }
        assert_eq!(
            server.state().lesen(|s| s.metriken().datagrams_malformed_total.get()),
            1
        );

        let _ = shutdown_tx.send(());
        recv_task.await.unwrap();
    }

    #[test]
    fn empfangspuffer_fasst_groesstes_datagramm() {
        use duckfed_protocol::Art;
        assert!(MAX_DATAGRAMM_GROESSE >= Art::S2sSay.groesse());
    }
}
