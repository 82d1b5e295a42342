use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::pipeline::extraction::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Application-level constants
pub const APP_NAME: &str = "MedProfile";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prefix of environment overrides, e.g. `MEDPROFILE__SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "MEDPROFILE";

/// Multipart ceiling for uploaded documents (50 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Get the application data directory
/// ~/MedProfile/ when a home directory is known, else the working directory.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(APP_NAME))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Default SQLite location.
pub fn default_database_path() -> PathBuf {
    app_data_dir().join("medprofile.db")
}

pub fn default_log_filter() -> &'static str {
    "medprofile=info,tower_http=info"
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub extraction: ExtractionSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionSettings {
    pub base_url: String,
    pub model: String,
    /// Falls back to `GEMINI_API_KEY` when empty.
    #[serde(default)]
    pub api_key: String,
    pub timeout_secs: u64,
}

impl ExtractionSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    pub filter: String,
    pub json: bool,
}

impl Settings {
    /// Defaults, then `medprofile.toml` (optional), then the environment.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::load_from(config::File::with_name("medprofile").required(false))
    }

    fn load_from<S>(file: S) -> anyhow::Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?
            .set_default("server.cors_origins", Vec::<String>::new())?
            .set_default("server.max_upload_bytes", DEFAULT_MAX_UPLOAD_BYTES as i64)?
            .set_default(
                "database.path",
                default_database_path().to_string_lossy().into_owned(),
            )?
            .set_default("extraction.base_url", DEFAULT_BASE_URL)?
            .set_default("extraction.model", DEFAULT_MODEL)?
            .set_default("extraction.api_key", "")?
            .set_default("extraction.timeout_secs", 120)?
            .set_default("logging.filter", default_log_filter())?
            .set_default("logging.json", false)?
            .add_source(file)
            // MEDPROFILE__SERVER__CORS_ORIGINS=https://a.example,https://b.example
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            )
            .build()?;

        let mut settings: Self = config.try_deserialize()?;

        if settings.extraction.api_key.trim().is_empty() {
            if let Ok(key) = std::env::var("GEMINI_API_KEY") {
                settings.extraction.api_key = key;
            }
        }

        settings.validate().map_err(anyhow::Error::msg)?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.max_upload_bytes == 0 {
            return Err("server.max_upload_bytes must be > 0".to_string());
        }
        if self.extraction.timeout_secs == 0 {
            return Err("extraction.timeout_secs must be > 0".to_string());
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        Ok(addr.parse()?)
    }
}
