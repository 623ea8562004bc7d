/// `load_config` module: loads a static YAML config and injects secrets from the environment.
///
/// The YAML file never holds secrets. The Postgres password, when the Postgres
/// backend is selected, comes from [`PG_PASSWORD_ENV`].
///
/// All errors use `anyhow::Error` and surface at the CLI boundary.
use crate::config::{PipelineConfig, StorageConfig, PG_PASSWORD_ENV};
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Config file picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "donation-etl.yaml";

/// Loads the YAML config at `path`, applies environment secrets and validates it.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let config: PipelineConfig = if config_content.trim().is_empty() {
        warn!(config_path = ?path_ref, "Config file is empty, using defaults");
        PipelineConfig::default()
    } else {
        match serde_yaml::from_str(&config_content) {
            Ok(conf) => {
                info!(config_path = ?path_ref, "Parsed config YAML successfully");
                conf
            }
            Err(e) => {
                error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
                return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
            }
        }
    };

    finish(config)
}

/// Resolves the config for the CLI: an explicit path must load; without one,
/// [`DEFAULT_CONFIG_FILE`] is used if present, otherwise built-in defaults.
pub fn load_config_or_default(path: Option<PathBuf>) -> Result<PipelineConfig> {
    match path {
        Some(path) => load_config(path),
        None => {
            let fallback = Path::new(DEFAULT_CONFIG_FILE);
            if fallback.exists() {
                load_config(fallback)
            } else {
                info!("No config file given, using defaults");
                finish(PipelineConfig::default())
            }
        }
    }
}

fn finish(mut config: PipelineConfig) -> Result<PipelineConfig> {
    if let StorageConfig::Postgres(pg) = &mut config.storage {
        match std::env::var(PG_PASSWORD_ENV) {
            Ok(password) => {
                info!("{PG_PASSWORD_ENV} found in env");
                pg.password = Some(password);
            }
            Err(_) => {
                warn!("{PG_PASSWORD_ENV} not set, connecting to Postgres without a password");
            }
        }
    }

    if config.source.timeout_secs == 0 {
        error!("source.timeout_secs must be positive");
        anyhow::bail!("source.timeout_secs must be positive");
    }
    if config.schedule.interval_minutes == 0 {
        error!("schedule.interval_minutes must be positive");
        anyhow::bail!("schedule.interval_minutes must be positive");
    }

    config.trace_loaded();
    Ok(config)
}
