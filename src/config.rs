// donation-etl/src/config.rs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

pub const DEFAULT_REMOTE_URL: &str = "https://api.opencollective.com/v1/collectives";

/// Environment variable holding the Postgres password. Never read from YAML.
pub const PG_PASSWORD_ENV: &str = "DONATION_ETL_PG_PASSWORD";

/// Top-level pipeline configuration. Every section has defaults, so an empty
/// YAML document is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub source: SourceConfig,
    pub storage: StorageConfig,
    pub export: ExportConfig,
    pub schedule: ScheduleConfig,
    pub log: LogConfig,
}

impl PipelineConfig {
    pub fn trace_loaded(&self) {
        info!(
            remote_url = %self.source.remote_url,
            fixture = %self.source.fixture_path.display(),
            backend = self.storage.backend_name(),
            export_dir = %self.export.output_dir.display(),
            interval_minutes = self.schedule.interval_minutes,
            "Loaded PipelineConfig"
        );
        debug!(?self, "PipelineConfig loaded (full debug)");
    }
}

/// Where raw records come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub remote_url: String,
    pub timeout_secs: u64,
    pub fixture_path: PathBuf,
    pub timestamp_policy: TimestampPolicy,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            remote_url: DEFAULT_REMOTE_URL.to_string(),
            timeout_secs: 10,
            fixture_path: PathBuf::from("data/donations.json"),
            timestamp_policy: TimestampPolicy::default(),
        }
    }
}

/// What the transformer does with a record whose timestamp cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampPolicy {
    /// Drop the record and keep going, like any other invalid field.
    #[default]
    Drop,
    /// Abort the transform with `InvalidTimestamp`.
    Reject,
}

/// Relational backend selection. Only `store::connect` looks inside.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    Sqlite(SqliteConfig),
    Postgres(PostgresConfig),
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite(SqliteConfig::default())
    }
}

impl StorageConfig {
    pub fn backend_name(&self) -> &'static str {
        match self {
            StorageConfig::Sqlite(_) => "sqlite",
            StorageConfig::Postgres(_) => "postgres",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    pub path: PathBuf,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("donations.db"),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub dbname: String,
    /// Injected from [`PG_PASSWORD_ENV`] by the loader.
    #[serde(skip)]
    pub password: Option<String>,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            dbname: "donations".to_string(),
            password: None,
        }
    }
}

impl PostgresConfig {
    /// Key/value connection string understood by `tokio_postgres::connect`.
    pub fn connection_string(&self) -> String {
        let mut conn = format!(
            "host={} port={} user={} dbname={}",
            self.host, self.port, self.user, self.dbname
        );
        if let Some(password) = &self.password {
            conn.push_str(&format!(" password='{}'", password.replace('\\', "\\\\").replace('\'', "\\'")));
        }
        conn
    }
}

// Keep the password out of Debug output (and therefore out of logs).
impl std::fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("dbname", &self.dbname)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub interval_minutes: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { interval_minutes: 60 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub file: PathBuf,
    /// `tracing_subscriber::EnvFilter` directive, e.g. `info` or `donation_etl=debug`.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("pipeline.log"),
            level: "info".to_string(),
        }
    }
}
