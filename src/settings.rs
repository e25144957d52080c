//! Layered configuration for the escrow engine
//!
//! Settings load from an optional TOML file with an `ESCROW_`-prefixed
//! environment overlay on top, then convert into the per-component config
//! structs. Every field falls back to the component defaults.

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::{
    EscrowResult, engine::EscrowEngineConfig, error::EscrowError, watcher::WatcherConfig,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub grace_period_secs: u64,
    pub max_escrow_amount_sats: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        let config = EscrowEngineConfig::default();
        Self {
            grace_period_secs: config.grace_period_secs,
            max_escrow_amount_sats: config.max_escrow_amount_sats,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatcherSettings {
    pub poll_interval_secs: u64,
    pub actor_pubkey: String,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        let config = WatcherConfig::default();
        Self {
            poll_interval_secs: config.poll_interval_secs,
            actor_pubkey: config.actor_pubkey,
        }
    }
}

/// Top-level settings for an escrow deployment
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub engine: EngineSettings,
    pub watcher: WatcherSettings,
}

impl Settings {
    /// Load settings from an optional config file plus `ESCROW_*`
    /// environment variables (e.g. `ESCROW_ENGINE__GRACE_PERIOD_SECS`)
    pub fn load(path: Option<&str>) -> EscrowResult<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path));
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix("ESCROW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|err| EscrowError::config(err.to_string()))?
            .try_deserialize()
            .map_err(|err| EscrowError::config(err.to_string()))?;

        settings.validate()?;

        Ok(settings)
    }

    pub fn engine_config(&self) -> EscrowEngineConfig {
        EscrowEngineConfig {
            grace_period_secs: self.engine.grace_period_secs,
            max_escrow_amount_sats: self.engine.max_escrow_amount_sats,
        }
    }

    pub fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig {
            poll_interval_secs: self.watcher.poll_interval_secs,
            actor_pubkey: self.watcher.actor_pubkey.clone(),
        }
    }

    fn validate(&self) -> EscrowResult<()> {
        if self.engine.max_escrow_amount_sats == 0 {
            return Err(EscrowError::config(
                "engine.max_escrow_amount_sats must be greater than zero",
            ));
        }
        if self.watcher.poll_interval_secs == 0 {
            return Err(EscrowError::config(
                "watcher.poll_interval_secs must be greater than zero",
            ));
        }
        if self.watcher.actor_pubkey.trim().is_empty() {
            return Err(EscrowError::config(
                "watcher.actor_pubkey cannot be empty",
            ));
        }
        Ok(())
    }
}
