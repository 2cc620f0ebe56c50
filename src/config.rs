use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_EVENT_BUFFER: usize = 1024;
const DEFAULT_TOTALS_TOLERANCE: &str = "0.01";
const DEFAULT_FREIGHT_MODE: &str = "CIF";

/// Engine configuration with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Capacity of the domain event channel
    #[serde(default = "default_event_buffer")]
    #[validate(range(min = 1))]
    pub event_buffer: usize,

    /// Absolute difference below which recomputed order totals are
    /// considered equal to the stored header totals
    #[serde(default = "default_totals_tolerance")]
    #[validate(custom = "validate_tolerance")]
    pub totals_tolerance: Decimal,

    /// Seed value for the per-order duplicate item policy
    #[serde(default)]
    pub allow_duplicate_items: bool,

    /// Freight mode assumed when the client brings no negotiated terms:
    /// "CIF" or "FOB"
    #[serde(default = "default_freight_mode")]
    #[validate(custom = "validate_freight_mode")]
    pub default_freight: String,
}

impl EngineConfig {
    /// Gets the logging level
    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            event_buffer: default_event_buffer(),
            totals_tolerance: default_totals_tolerance(),
            allow_duplicate_items: false,
            default_freight: default_freight_mode(),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum EngineConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Default value functions
fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_event_buffer() -> usize {
    DEFAULT_EVENT_BUFFER
}

fn default_totals_tolerance() -> Decimal {
    dec!(0.01)
}

fn default_freight_mode() -> String {
    DEFAULT_FREIGHT_MODE.to_string()
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    const ALLOWED: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
    if ALLOWED.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("log_level must be one of trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_tolerance(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() {
        let mut err = ValidationError::new("totals_tolerance");
        err.message = Some("totals_tolerance must not be negative".into());
        return Err(err);
    }
    Ok(())
}

fn validate_freight_mode(mode: &str) -> Result<(), ValidationError> {
    if mode == "CIF" || mode == "FOB" {
        Ok(())
    } else {
        let mut err = ValidationError::new("default_freight");
        err.message = Some("default_freight must be \"CIF\" or \"FOB\"".into());
        Err(err)
    }
}

/// Initializes the tracing subscriber.
///
/// The filter honors `RUST_LOG` when set and otherwise scopes the
/// configured level to this crate.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("salesmasters_pricing={}", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads engine configuration
///
/// Layers configuration sources in this order:
/// 1. Default config (config/default.toml)
/// 2. Environment-specific config (config/{env}.toml)
/// 3. Environment variables (APP_*)
pub fn load_config() -> Result<EngineConfig, EngineConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting the config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("event_buffer", DEFAULT_EVENT_BUFFER as u64)?
        .set_default("totals_tolerance", DEFAULT_TOTALS_TOLERANCE)?
        .set_default("allow_duplicate_items", false)?
        .set_default("default_freight", DEFAULT_FREIGHT_MODE)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let engine_config: EngineConfig = config.try_deserialize()?;

    engine_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        EngineConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(engine_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = EngineConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.totals_tolerance, dec!(0.01));
        assert_eq!(cfg.default_freight, "CIF");
        assert!(!cfg.allow_duplicate_items);
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut cfg = EngineConfig::default();
        cfg.log_level = "loud".into();
        let errors = cfg.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("log_level"));
    }

    #[test]
    fn rejects_negative_tolerance() {
        let mut cfg = EngineConfig::default();
        cfg.totals_tolerance = dec!(-0.01);
        let errors = cfg.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("totals_tolerance"));
    }

    #[test]
    fn rejects_unknown_freight_mode() {
        let mut cfg = EngineConfig::default();
        cfg.default_freight = "EXW".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_event_buffer() {
        let mut cfg = EngineConfig::default();
        cfg.event_buffer = 0;
        assert!(cfg.validate().is_err());
    }
}
