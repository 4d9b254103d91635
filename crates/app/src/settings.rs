//! Layered settings: optional TOML file, then `FINTRACK_*` environment
//! variables, then command line flags.

use std::time::Duration;

use clap::Args;
use engine::Currency;
use serde::Deserialize;

use crate::error::{AppError, Result};

const DEFAULT_CONFIG_PATH: &str = "config/fintrack.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database_url: String,
    pub base_url: String,
    pub owner: String,
    pub api_token: Option<String>,
    pub level: String,
    pub remote_timeout_secs: u64,
    pub probe_interval_secs: u64,
    pub sync_interval_secs: u64,
    pub default_currency: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite:./fintrack.db?mode=rwc".to_string(),
            base_url: "http://127.0.0.1:3000/api".to_string(),
            owner: String::new(),
            api_token: None,
            level: "info".to_string(),
            remote_timeout_secs: 10,
            probe_interval_secs: 15,
            sync_interval_secs: 60,
            default_currency: "EUR".to_string(),
        }
    }
}

/// Global flags shared by every command.
#[derive(Debug, Args)]
pub struct Overrides {
    /// Optional config file path (TOML).
    #[arg(long, global = true)]
    config: Option<String>,
    /// Override the local database URL.
    #[arg(long, global = true)]
    database_url: Option<String>,
    /// Override the remote API base URL (e.g. http://127.0.0.1:3000/api).
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Override the record owner.
    #[arg(long, global = true)]
    owner: Option<String>,
    /// Override the log level.
    #[arg(long, global = true)]
    level: Option<String>,
}

impl Settings {
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs.max(1))
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs.max(1))
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs.max(1))
    }

    pub fn default_currency(&self) -> Result<Currency> {
        Ok(self.default_currency.parse()?)
    }

    /// Owner every record command acts for.
    pub fn owner(&self) -> Result<&str> {
        let owner = self.owner.trim();
        if owner.is_empty() {
            return Err(AppError::Input(
                "owner is not set (use --owner or FINTRACK_OWNER)".to_string(),
            ));
        }
        Ok(owner)
    }
}

pub fn load(overrides: &Overrides) -> Result<Settings> {
    from_sources(overrides, environment())
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("FINTRACK")
}

fn from_sources(overrides: &Overrides, env: config::Environment) -> Result<Settings> {
    let config_path = overrides.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let builder = config::Config::builder()
        .add_source(config::File::with_name(config_path).required(false))
        .add_source(env);
    let mut settings: Settings = builder.build()?.try_deserialize()?;

    if let Some(database_url) = &overrides.database_url {
        settings.database_url = database_url.clone();
    }
    if let Some(base_url) = &overrides.base_url {
        settings.base_url = base_url.clone();
    }
    if let Some(owner) = &overrides.owner {
        settings.owner = owner.clone();
    }
    if let Some(level) = &overrides.level {
        settings.level = level.clone();
    }

    Ok(settings)
}
