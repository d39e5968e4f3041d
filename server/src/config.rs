//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist (dann allerdings ohne Nachbarn).

use duckfed_core::{ChannelName, DuckfedError, STANDARD_KANAL};
use duckfed_observability::logging::{log_format_gueltig, log_level_gueltig};
use duckfed_relay::RelayConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Statisch konfigurierte Nachbarserver
    pub nachbarn: Vec<NachbarEinstellungen>,
    /// Zeitgeber und Grenzen der Federation
    pub federation: FederationEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Metriken, Health)
    pub observability: ObservabilityEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers (nur fuer Logs)
    pub name: String,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "duckfed".into(),
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse des UDP-Sockets
    pub bind_adresse: String,
    /// UDP-Port fuer Clients und Nachbarn (0 = vom OS vergeben)
    pub port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 4000,
        }
    }
}

/// Ein Nachbarserver (`[[nachbarn]]`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NachbarEinstellungen {
    /// Hostname oder IP-Adresse
    pub adresse: String,
    pub port: u16,
}

impl NachbarEinstellungen {
    pub fn host_port(&self) -> String {
        format!("{}:{}", self.adresse, self.port)
    }
}

/// Federation-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FederationEinstellungen {
    /// Takt des Soft-State-Timers in Millisekunden
    pub tick_ms: u64,
    /// Abstand der Erneuerungen in Sekunden
    pub erneuerung_sek: u64,
    /// Stille in Sekunden, nach der ein Nachbar entfernt wird
    pub nachbar_timeout_sek: u64,
    /// Sekunden nach dem Start ohne Bereinigung
    pub schonfrist_sek: u64,
    /// Kapazitaet des Duplikat-Speichers
    pub duplikat_kapazitaet: usize,
    /// Kanal, der immer existiert
    pub standard_kanal: String,
    /// Groesse der Send-Queue in Datagrammen
    pub send_queue_groesse: usize,
}

impl Default for FederationEinstellungen {
    fn default() -> Self {
        Self {
            tick_ms: 1000,
            erneuerung_sek: 60,
            nachbar_timeout_sek: 120,
            schonfrist_sek: 119,
            duplikat_kapazitaet: 100,
            standard_kanal: STANDARD_KANAL.into(),
            send_queue_groesse: 1024,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Observability-Einstellungen (Metriken + Health-Check)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Aktiviert den Observability-Server
    pub aktiviert: bool,
    /// Port fuer Metriken und Health (Standard: 9300)
    pub port: u16,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: false,
            port: 9300,
        }
    }
}

/// Herkunft einer geladenen Konfiguration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quelle {
    Datei,
    /// Datei fehlte, alle Werte sind Standardwerte
    Standardwerte,
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    ///
    /// Loggt nicht selbst; die [`Quelle`] meldet der Aufrufer nach dem
    /// Initialisieren des Loggings.
    pub fn laden(pfad: &str) -> anyhow::Result<(Self, Quelle)> {
        let (config, quelle) = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                (config, Quelle::Datei)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                (Self::default(), Quelle::Standardwerte)
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
                ))
            }
        };
        config.validieren()?;
        Ok((config, quelle))
    }

    /// Prueft Werte, die serde allein nicht abfangen kann
    pub fn validieren(&self) -> duckfed_core::Result<()> {
        let f = &self.federation;
        if f.tick_ms == 0 {
            return Err(DuckfedError::konfiguration("federation.tick_ms muss > 0 sein"));
        }
        if f.erneuerung_sek == 0 || f.nachbar_timeout_sek == 0 {
            return Err(DuckfedError::konfiguration(
                "federation.erneuerung_sek und nachbar_timeout_sek muessen > 0 sein",
            ));
        }
        if f.duplikat_kapazitaet == 0 || f.send_queue_groesse == 0 {
            return Err(DuckfedError::konfiguration(
                "federation.duplikat_kapazitaet und send_queue_groesse muessen > 0 sein",
            ));
        }
        ChannelName::neu(&f.standard_kanal)?;

        for nachbar in &self.nachbarn {
            if nachbar.adresse.is_empty() || nachbar.port == 0 {
                return Err(DuckfedError::konfiguration(format!(
                    "ungueltiger Nachbar '{}'",
                    nachbar.host_port()
                )));
            }
        }

        if !log_level_gueltig(&self.logging.level) {
            return Err(DuckfedError::konfiguration(format!(
                "unbekannter Log-Level '{}'",
                self.logging.level
            )));
        }
        if !log_format_gueltig(&self.logging.format) {
            return Err(DuckfedError::konfiguration(format!(
                "unbekanntes Log-Format '{}'",
                self.logging.format
            )));
        }
        Ok(())
    }

    /// Gibt die vollstaendige Bind-Adresse fuer UDP zurueck
    pub fn udp_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.port)
    }

    /// Gibt die Bind-Adresse fuer den Observability-Server zurueck
    pub fn observability_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.observability.port)
    }

    /// Zeitgeber und Grenzen fuer den Relay-State
    pub fn relay_config(&self) -> duckfed_core::Result<RelayConfig> {
        let f = &self.federation;
        Ok(RelayConfig {
            tick: Duration::from_millis(f.tick_ms),
            erneuerung: Duration::from_secs(f.erneuerung_sek),
            nachbar_timeout: Duration::from_secs(f.nachbar_timeout_sek),
            schonfrist: Duration::from_secs(f.schonfrist_sek),
            duplikat_kapazitaet: f.duplikat_kapazitaet,
            standard_kanal: ChannelName::neu(&f.standard_kanal)?,
            send_queue_groesse: f.send_queue_groesse,
        })
    }
}
