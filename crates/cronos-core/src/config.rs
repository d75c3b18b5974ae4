use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CronosError, Result};

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1_000; // 1 Hz evaluation cadence
pub const DEFAULT_HORIZON_DAYS: u32 = 366; // long enough for any yearly rule
pub const DEFAULT_DELIVERY_BUFFER: usize = 64;
pub const DEFAULT_LOG_FILTER: &str = "cronos=info,cronos_scheduler=info";

/// Top-level config (cronos.toml + CRONOS_* env overrides).
///
/// Alarm definitions live in the same file under `[[alarms]]` but are
/// extracted separately by the scheduler crate, which owns their types.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CronosConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Which candidates fire when several alarms match the same minute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FireMode {
    /// Only the first matching alarm in list order.
    #[default]
    First,
    /// Every matching alarm.
    All,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Tick cadence of the run loop in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Day-by-day search bound for next-occurrence previews.
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    #[serde(default)]
    pub fire_mode: FireMode,
    /// Capacity of the fired-alarm delivery channel.
    #[serde(default = "default_delivery_buffer")]
    pub delivery_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            horizon_days: DEFAULT_HORIZON_DAYS,
            fire_mode: FireMode::First,
            delivery_buffer: DEFAULT_DELIVERY_BUFFER,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive; `RUST_LOG` still wins when set.
    pub filter: Option<String>,
}

impl LogConfig {
    pub fn filter_or_default(&self) -> &str {
        self.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}
fn default_horizon_days() -> u32 {
    DEFAULT_HORIZON_DAYS
}
fn default_delivery_buffer() -> usize {
    DEFAULT_DELIVERY_BUFFER
}

impl CronosConfig {
    /// Build the layered figment: TOML file first, then CRONOS_* env vars.
    ///
    /// Env keys nest on a double underscore: `CRONOS_ENGINE__FIRE_MODE=all`.
    ///
    /// Exposed so callers can extract other sections (e.g. `alarms`) from the
    /// exact same sources the config itself was read from.
    pub fn figment(config_path: Option<&str>) -> Figment {
        Figment::new()
            .merge(Toml::file(resolve_config_path(config_path)))
            .merge(Env::prefixed("CRONOS_").split("__"))
    }

    /// Load config from a TOML file with CRONOS_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument (must exist)
    ///   2. ~/.cronos/cronos.toml (defaults when absent)
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        if let Some(path) = config_path {
            if !Path::new(path).exists() {
                return Err(CronosError::ConfigNotFound(path.to_string()));
            }
        }
        Self::figment(config_path)
            .extract()
            .map_err(|e| CronosError::Config(e.to_string()))
    }
}

/// The file the figment reads: the explicit path, else the default location.
pub fn resolve_config_path(config_path: Option<&str>) -> String {
    config_path
        .map(String::from)
        .unwrap_or_else(default_config_path)
}

pub fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.cronos/cronos.toml", home)
}
