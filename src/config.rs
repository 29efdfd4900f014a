use config::{Config, ConfigError, Environment, File};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
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
const DEFAULT_TAX_RATE: f64 = 0.08;
const DEFAULT_QUOTE_VALIDITY_DAYS: i64 = 30;
const DEFAULT_QUOTE_NUMBER_PREFIX: &str = "Q";
const DEFAULT_SALES_ORDER_PREFIX: &str = "SO-";
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;

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

    /// Tax rate applied to new quotes (as decimal, e.g., 0.08 for 8%)
    #[serde(default = "default_tax_rate")]
    #[validate(custom = "validate_tax_rate")]
    pub default_tax_rate: f64,

    /// Days a new quote stays valid
    #[serde(default = "default_quote_validity_days")]
    #[validate(range(min = 1, max = 365))]
    pub quote_validity_days: i64,

    /// Prefix of generated quote numbers
    #[serde(default = "default_quote_number_prefix")]
    #[validate(length(min = 1, max = 8))]
    pub quote_number_prefix: String,

    /// Prefix of sales order numbers derived from quote numbers
    #[serde(default = "default_sales_order_prefix")]
    #[validate(length(min = 1, max = 8))]
    pub sales_order_prefix: String,

    /// Event channel capacity for async event processing
    #[serde(default = "default_event_channel_capacity")]
    #[validate(custom = "validate_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            default_tax_rate: default_tax_rate(),
            quote_validity_days: default_quote_validity_days(),
            quote_number_prefix: default_quote_number_prefix(),
            sales_order_prefix: default_sales_order_prefix(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

impl EngineConfig {
    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Default tax rate as an exact decimal fraction
    pub fn tax_rate(&self) -> Decimal {
        Decimal::from_f64(self.default_tax_rate)
            .map(|rate| rate.round_dp(6).normalize())
            .unwrap_or(Decimal::ZERO)
    }

    pub fn quote_validity(&self) -> chrono::Duration {
        chrono::Duration::days(self.quote_validity_days)
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigLoadError {
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

fn default_tax_rate() -> f64 {
    DEFAULT_TAX_RATE
}

fn default_quote_validity_days() -> i64 {
    DEFAULT_QUOTE_VALIDITY_DAYS
}

fn default_quote_number_prefix() -> String {
    DEFAULT_QUOTE_NUMBER_PREFIX.to_string()
}

fn default_sales_order_prefix() -> String {
    DEFAULT_SALES_ORDER_PREFIX.to_string()
}

fn default_event_channel_capacity() -> usize {
    DEFAULT_EVENT_CHANNEL_CAPACITY
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_tax_rate(rate: f64) -> Result<(), ValidationError> {
    if !rate.is_finite() || rate < 0.0 || rate > 1.0 {
        let mut err = ValidationError::new("default_tax_rate");
        err.message = Some("default_tax_rate must be a finite value between 0.0 and 1.0".into());
        return Err(err);
    }
    Ok(())
}

fn validate_event_channel_capacity(capacity: usize) -> Result<(), ValidationError> {
    if capacity == 0 {
        let mut err = ValidationError::new("event_channel_capacity");
        err.message = Some("event_channel_capacity must be greater than 0".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("stateset_quote_engine={}", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

/// Loads engine configuration from `config/` under the current directory.
pub fn load_config() -> Result<EngineConfig, ConfigLoadError> {
    load_config_from(Path::new(CONFIG_DIR))
}

/// Loads engine configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (`{dir}/default.toml`)
/// 3. Environment-specific config (`{dir}/{env}.toml`)
/// 4. Environment variables (APP__*)
pub fn load_config_from(config_dir: &Path) -> Result<EngineConfig, ConfigLoadError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let config = Config::builder()
        .set_default("environment", run_env.as_str())?
        .add_source(File::from(config_dir.join("default")).required(false))
        .add_source(File::from(config_dir.join(&run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let engine_config: EngineConfig = config.try_deserialize()?;

    engine_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        ConfigLoadError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(engine_config)
}
