//! Prometheus-kompatible Metriken fuer duckfed
//!
//! Registrierte Metriken:
//! - `duckfed_datagrams_received_total` – Counter: Empfangene Datagramme
//! - `duckfed_datagrams_malformed_total` – Counter: Nicht dekodierbare Datagramme
//! - `duckfed_s2s_sent_total` – Counter: Gesendete S2S-Nachrichten (kind)
//! - `duckfed_duplicate_says_total` – Counter: Erkannte Duplikate (S2S_SAY)
//! - `duckfed_neighbors_pruned_total` – Counter: Wegen Stille entfernte Nachbarn
//! - `duckfed_send_queue_dropped_total` – Counter: Wegen voller Queue verworfene Datagramme
//! - `duckfed_users` – Gauge: Angemeldete lokale Benutzer
//! - `duckfed_channels` – Gauge: Lokale Kanaele
//! - `duckfed_routing_entries` – Gauge: Eintraege in der Routing-Tabelle

use anyhow::Result;
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Alle duckfed-Prometheus-Metriken
///
/// `Clone` teilt die Registry, alle Klone zaehlen in dieselben Metriken.
#[derive(Clone)]
pub struct DuckfedMetrics {
    pub registry: Arc<Registry>,

    // Transport
    pub datagrams_received_total: IntCounter,
    pub datagrams_malformed_total: IntCounter,
    pub send_queue_dropped_total: IntCounter,

    // Federation
    pub s2s_sent_total: IntCounterVec,
    pub duplicate_says_total: IntCounter,
    pub neighbors_pruned_total: IntCounter,

    // Zustand
    pub users: IntGauge,
    pub channels: IntGauge,
    pub routing_entries: IntGauge,
}

impl DuckfedMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let datagrams_received_total = IntCounter::with_opts(Opts::new(
            "duckfed_datagrams_received_total",
            "Gesamtanzahl empfangener Datagramme",
        ))?;
        registry.register(Box::new(datagrams_received_total.clone()))?;

        let datagrams_malformed_total = IntCounter::with_opts(Opts::new(
            "duckfed_datagrams_malformed_total",
            "Datagramme, die nicht dekodiert werden konnten",
        ))?;
        registry.register(Box::new(datagrams_malformed_total.clone()))?;

        let send_queue_dropped_total = IntCounter::with_opts(Opts::new(
            "duckfed_send_queue_dropped_total",
            "Wegen voller Send-Queue verworfene Datagramme",
        ))?;
        registry.register(Box::new(send_queue_dropped_total.clone()))?;

        let s2s_sent_total = IntCounterVec::new(
            Opts::new(
                "duckfed_s2s_sent_total",
                "Gesendete Server-zu-Server-Nachrichten",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(s2s_sent_total.clone()))?;

        let duplicate_says_total = IntCounter::with_opts(Opts::new(
            "duckfed_duplicate_says_total",
            "Empfangene S2S_SAY mit bereits bekannter Message-ID",
        ))?;
        registry.register(Box::new(duplicate_says_total.clone()))?;

        let neighbors_pruned_total = IntCounter::with_opts(Opts::new(
            "duckfed_neighbors_pruned_total",
            "Wegen Zeitueberschreitung entfernte Nachbar-Eintraege",
        ))?;
        registry.register(Box::new(neighbors_pruned_total.clone()))?;

        let users = IntGauge::with_opts(Opts::new(
            "duckfed_users",
            "Anzahl angemeldeter lokaler Benutzer",
        ))?;
        registry.register(Box::new(users.clone()))?;

        let channels = IntGauge::with_opts(Opts::new(
            "duckfed_channels",
            "Anzahl lokaler Kanaele",
        ))?;
        registry.register(Box::new(channels.clone()))?;

        let routing_entries = IntGauge::with_opts(Opts::new(
            "duckfed_routing_entries",
            "Anzahl Eintraege in der Federation-Routing-Tabelle",
        ))?;
        registry.register(Box::new(routing_entries.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            datagrams_received_total,
            datagrams_malformed_total,
            send_queue_dropped_total,
            s2s_sent_total,
            duplicate_says_total,
            neighbors_pruned_total,
            users,
            channels,
            routing_entries,
        })
    }

    /// Zaehlt eine gesendete S2S-Nachricht
    pub fn s2s_gesendet(&self, art: &str) {
        self.s2s_sent_total.with_label_values(&[art]).inc();
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: DuckfedMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<DuckfedMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
