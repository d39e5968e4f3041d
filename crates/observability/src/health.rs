//! Health-Check-Endpunkt fuer duckfed
//!
//! Endpoint: `GET /health`
//! Response: JSON mit Status, Version, Uptime und Relay-Status

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub relay_running: bool,
}

/// Geteilter Zustand fuer den Health-Check-Handler
#[derive(Clone)]
pub struct HealthState {
    start_time: Arc<Instant>,
    relay_running: Arc<AtomicBool>,
}

impl HealthState {
    pub fn neu() -> Self {
        Self {
            start_time: Arc::new(Instant::now()),
            relay_running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn relay_laeuft(&self) -> bool {
        self.relay_running.load(Ordering::Relaxed)
    }

    /// Wird vom Server gesetzt, sobald die Empfangs-Loop laeuft bzw. endet
    pub fn relay_status_setzen(&self, laeuft: bool) {
        self.relay_running.store(laeuft, Ordering::Relaxed);
    }

    fn antwort(&self) -> HealthResponse {
        let relay_running = self.relay_laeuft();
        HealthResponse {
            status: if relay_running {
                HealthStatus::Healthy
            } else {
                HealthStatus::Unhealthy
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.uptime_seconds(),
            relay_running,
        }
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::neu()
    }
}

/// Axum-Router fuer den `/health`-Endpunkt
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /health` – gibt den Serverstatus zurueck
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let response = state.antwort();
    let http_status = match response.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (http_status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_state_frisch_erstellt() {
        let state = HealthState::neu();
        assert!(state.uptime_seconds() < 5);
        assert!(!state.relay_laeuft());
    }

    #[test]
    fn relay_status_bestimmt_health() {
        let state = HealthState::neu();
        assert_eq!(state.antwort().status, HealthStatus::Unhealthy);

        let klon = state.clone();
        klon.relay_status_setzen(true);
        assert_eq!(state.antwort().status, HealthStatus::Healthy);
        assert!(state.antwort().relay_running);
    }

    #[test]
    fn health_response_serialisierung() {
        let response = HealthResponse {
            status: HealthStatus::Healthy,
            version: "0.1.0".to_string(),
            uptime_seconds: 3600,
            relay_running: true,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(json.contains("\"version\":\"0.1.0\""));
        assert!(json.contains("\"uptime_seconds\":3600"));
        assert!(json.contains("\"relay_running\":true"));
    }

    #[test]
    fn health_response_deserialisierung() {
        let json =
            r#"{"status":"unhealthy","version":"0.1.0","uptime_seconds":100,"relay_running":false}"#;
        let response: HealthResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.status, HealthStatus::Unhealthy);
        assert_eq!(response.uptime_seconds, 100);
        assert!(!response.relay_running);
    }
}
