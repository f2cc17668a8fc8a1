use cloudcare_core::events::{BroadcasterOptions, DeliveryMode};
use cloudcare_storage::{HospitalRecord, PatientRecord};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, net::SocketAddr, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    /// Alert stream behaviour
    #[serde(default)]
    pub emergency: EmergencyConfig,
    /// Directory seed loaded into storage at startup
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Server validations
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.body_limit_bytes == 0 {
            return Err("server.body_limit_bytes must be > 0".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        // CORS validation
        if self.cors.allowed_origins.is_empty() {
            return Err("cors.allowed_origins must not be empty".into());
        }
        // Emergency stream validation
        if self.emergency.keepalive_secs == 0 {
            return Err("emergency.keepalive_secs must be > 0".into());
        }
        // Bootstrap validation
        let mut seen = HashSet::new();
        for patient in &self.bootstrap.patients {
            if patient.patient_id.trim().is_empty() {
                return Err("bootstrap.patients[].patient_id must not be empty".into());
            }
            if !seen.insert(patient.patient_id.as_str()) {
                return Err(format!(
                    "bootstrap.patients contains duplicate patient_id '{}'",
                    patient.patient_id
                ));
            }
        }
        if self.bootstrap.hospitals.iter().any(|h| h.name.trim().is_empty()) {
            return Err("bootstrap.hospitals[].name must not be empty".into());
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.emergency.keepalive_secs)
    }

    pub fn broadcaster_options(&self) -> BroadcasterOptions {
        BroadcasterOptions {
            keepalive: self.keepalive(),
            delivery: self.emergency.delivery,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8004
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Browser origins allowed to call the API; `"*"` allows any origin
    /// (credentials are then not allowed).
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}
fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".into()]
}
impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl CorsConfig {
    pub fn allows_any(&self) -> bool {
        self.allowed_origins.iter().any(|o| o.trim() == "*")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyConfig {
    /// Seconds without an event before a stream receives a ping
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
    /// `shared`: one queue, each event reaches one stream.
    /// `fanout`: every open stream receives every event.
    #[serde(default)]
    pub delivery: DeliveryMode,
}
fn default_keepalive_secs() -> u64 {
    30
}
impl Default for EmergencyConfig {
    fn default() -> Self {
        Self {
            keepalive_secs: default_keepalive_secs(),
            delivery: DeliveryMode::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub patients: Vec<PatientRecord>,
    #[serde(default)]
    pub hospitals: Vec<HospitalRecord>,
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File, FileFormat};
    use std::path::Path;

    pub const DEFAULT_CONFIG_FILE: &str = "cloudcare.toml";
    pub const ENV_PREFIX: &str = "CLOUDCARE";

    /// TOML file (when present) overlaid by `CLOUDCARE__SECTION__KEY`
    /// variables, then validated. A missing file yields the defaults.
    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let path = Path::new(path.unwrap_or(DEFAULT_CONFIG_FILE));
        let file = File::from(path)
            .format(FileFormat::Toml)
            .required(false);
        let env = Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("cors.allowed_origins");

        let cfg: AppConfig = Config::builder()
            .add_source(file)
            .add_source(env)
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| format!("{}: {e}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
