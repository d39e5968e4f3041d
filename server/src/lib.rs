//! duckfed-server – Bibliotheks-Root
//!
//! Verdrahtet Konfiguration, Relay, Metriken und Health-Check und stellt
//! den oeffentlichen Einstiegspunkt fuer Integrationstests bereit.

pub mod config;

use anyhow::{Context, Result};
use config::{NachbarEinstellungen, ServerConfig};
use duckfed_observability::{observability_server_starten, DuckfedMetrics, HealthState};
use duckfed_relay::{RelayHandle, RelayServer, RelayState};
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Subsysteme und laeuft bis zum Shutdown-Signal (Ctrl-C)
    pub async fn starten(self) -> Result<()> {
        let laufend = self.hochfahren().await?;

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");

        laufend.beenden().await
    }

    /// Startet alle Subsysteme und kehrt sofort zurueck
    ///
    /// Reihenfolge:
    /// 1. Nachbarn aufloesen
    /// 2. Metriken und Relay-State anlegen
    /// 3. UDP-Socket binden, Empfangs-Loop und Timer starten
    /// 4. Optional den Observability-Server starten
    pub async fn hochfahren(self) -> Result<LaufenderServer> {
        let config = self.config;
        let relay_config = config.relay_config()?;

        let bind_addr = aufloesen(&config.udp_bind_adresse(), None)
            .await
            .context("Bind-Adresse ungueltig")?;

        let mut nachbarn = Vec::with_capacity(config.nachbarn.len());
        for nachbar in &config.nachbarn {
            match nachbar_aufloesen(nachbar, bind_addr).await {
                Ok(addr) => nachbarn.push(addr),
                Err(e) => {
                    tracing::warn!(fehler = %format!("{e:#}"), "Nachbar uebersprungen");
                }
            }
        }

        let metriken = DuckfedMetrics::neu()?;
        let health = HealthState::neu();

        let jetzt = Instant::now();
        let mut state = RelayState::neu(relay_config, metriken.clone(), jetzt);
        for nachbar in &nachbarn {
            state.nachbar_hinzufuegen(*nachbar, jetzt);
        }

        let relay = RelayServer::binden(bind_addr, RelayHandle::neu(state))
            .await
            .with_context(|| format!("UDP-Socket auf {bind_addr} nicht bindbar"))?;
        let adresse = relay.lokale_adresse()?;
        let handle = relay.state().clone();

        tracing::info!(
            server_name = %config.server.name,
            udp = %adresse,
            nachbarn = nachbarn.len(),
            "Server startet"
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let relay_health = health.clone();
        relay_health.relay_status_setzen(true);
        let relay_task = tokio::spawn(async move {
            relay.starten(shutdown_rx).await;
            relay_health.relay_status_setzen(false);
        });

        let observability_task = if config.observability.aktiviert {
            let obs_addr = aufloesen(&config.observability_bind_adresse(), None)
                .await
                .context("Observability-Adresse ungueltig")?;
            let metriken = metriken.clone();
            let health = health.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = observability_server_starten(obs_addr, metriken, health).await {
                    tracing::error!(fehler = %e, "Observability-Server beendet");
                }
            }))
        } else {
            None
        };

        Ok(LaufenderServer {
            adresse,
            state: handle,
            metriken,
            health,
            shutdown_tx: Some(shutdown_tx),
            relay_task,
            observability_task,
        })
    }
}

/// Ein gestarteter Server
pub struct LaufenderServer {
    adresse: SocketAddr,
    state: RelayHandle,
    metriken: DuckfedMetrics,
    health: HealthState,
    shutdown_tx: Option<oneshot::Sender<()>>,
    relay_task: JoinHandle<()>,
    observability_task: Option<JoinHandle<()>>,
}

impl LaufenderServer {
    /// Tatsaechlich gebundene UDP-Adresse
    pub fn adresse(&self) -> SocketAddr {
        self.adresse
    }

    pub fn state(&self) -> &RelayHandle {
        &self.state
    }

    pub fn metriken(&self) -> &DuckfedMetrics {
        &self.metriken
    }

    pub fn health(&self) -> &HealthState {
        &self.health
    }

    /// Stoppt Empfangs-Loop und Timer und wartet auf ihr Ende
    pub async fn beenden(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.observability_task.take() {
            task.abort();
        }
        (&mut self.relay_task)
            .await
            .context("Relay-Task abgebrochen")?;
        tracing::info!(udp = %self.adresse, "Server beendet");
        Ok(())
    }
}

/// Loest einen Nachbarn auf, bevorzugt in der Adressfamilie des eigenen Sockets
async fn nachbar_aufloesen(nachbar: &NachbarEinstellungen, bind_addr: SocketAddr) -> Result<SocketAddr> {
    let addr = aufloesen(&nachbar.host_port(), Some(bind_addr))
        .await
        .with_context(|| format!("Nachbar '{}' nicht aufloesbar", nachbar.host_port()))?;
    tracing::info!(nachbar = %addr, host = %nachbar.adresse, "Nachbar konfiguriert");
    Ok(addr)
}

async fn aufloesen(host_port: &str, familie_von: Option<SocketAddr>) -> Result<SocketAddr> {
    let kandidaten: Vec<SocketAddr> = tokio::net::lookup_host(host_port).await?.collect();
    let passend = familie_von
        .and_then(|eigen| kandidaten.iter().find(|k| k.is_ipv4() == eigen.is_ipv4()))
        .or_else(|| kandidaten.first());
    passend
        .copied()
        .ok_or_else(|| anyhow::anyhow!("keine Adresse fuer '{host_port}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn localhost_wird_ipv4_aufgeloest() {
        let eigen: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let addr = aufloesen("localhost:4002", Some(eigen)).await.unwrap();
        assert!(addr.is_ipv4());
        assert_eq!(addr.port(), 4002);
    }

    #[tokio::test]
    async fn unaufloesbarer_nachbar_wird_uebersprungen() {
        let mut config = ServerConfig::default();
        config.netzwerk.bind_adresse = "127.0.0.1".into();
        config.netzwerk.port = 0;
        config.nachbarn = vec![
            NachbarEinstellungen {
                adresse: "host.ungueltig.invalid".into(),
                port: 4002,
            },
            NachbarEinstellungen {
                adresse: "127.0.0.1".into(),
                port: 4003,
            },
        ];

        let laufend = Server::neu(config).hochfahren().await.unwrap();
        let nachbarn = laufend.state().lesen(|s| s.routing().known_neighbors());
        assert_eq!(nachbarn, vec!["127.0.0.1:4003".parse::<SocketAddr>().unwrap()]);
        laufend.beenden().await.unwrap();
    }

    #[tokio::test]
    async fn hochfahren_und_beenden() {
        let mut config = ServerConfig::default();
        config.netzwerk.bind_adresse = "127.0.0.1".into();
        config.netzwerk.port = 0;

        let laufend = Server::neu(config).hochfahren().await.unwrap();
        assert_ne!(laufend.adresse().port(), 0);
        assert!(laufend.health().relay_laeuft());

        let health = laufend.health().clone();
        laufend.beenden().await.unwrap();
        assert!(!health.relay_laeuft());
    }
}
