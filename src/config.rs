use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::info;
use validator::Validate;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";

/// Approval policy knobs for the sales order workflow.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SalesConfig {
    /// Order totals above this require manager approval
    #[serde(default = "default_approval_amount_threshold")]
    pub approval_amount_threshold: Decimal,

    /// Total line quantity above this requires manager approval
    #[serde(default = "default_approval_quantity_threshold")]
    pub approval_quantity_threshold: i32,

    /// Max discount percent a non-manager may apply without approval
    #[serde(default = "default_max_employee_discount_percent")]
    pub max_employee_discount_percent: Decimal,

    /// Orders sourcing from multiple warehouses need approval
    #[serde(default = "default_true")]
    pub cross_warehouse_requires_approval: bool,
}

impl Default for SalesConfig {
    fn default() -> Self {
        Self {
            approval_amount_threshold: default_approval_amount_threshold(),
            approval_quantity_threshold: default_approval_quantity_threshold(),
            max_employee_discount_percent: default_max_employee_discount_percent(),
            cross_warehouse_requires_approval: true,
        }
    }
}

/// Idempotency middleware configuration.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct IdempotencyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Retention window for recorded keys, in hours
    #[serde(default = "default_idempotency_ttl_hours")]
    #[validate(range(min = 1, max = 720))]
    pub ttl_hours: i64,

    /// Mutating path prefixes where the Idempotency-Key header is
    /// mandatory rather than optional
    #[serde(default)]
    pub required_paths: Vec<String>,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_hours: default_idempotency_ttl_hours(),
            required_paths: Vec::new(),
        }
    }
}

/// Application configuration with validation.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    #[serde(default)]
    pub db_max_connections: Option<u32>,

    #[serde(default)]
    #[validate]
    pub sales: SalesConfig,

    #[serde(default)]
    #[validate]
    pub idempotency: IdempotencyConfig,
}

impl AppConfig {
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development" || self.environment == "test"
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_true() -> bool {
    true
}
fn default_approval_amount_threshold() -> Decimal {
    Decimal::from(1000)
}
fn default_approval_quantity_threshold() -> i32 {
    100
}
fn default_max_employee_discount_percent() -> Decimal {
    Decimal::from(10)
}
fn default_idempotency_ttl_hours() -> i64 {
    24
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("configuration load error: {0}")]
    Load(#[from] ConfigError),
    #[error("configuration validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Loads configuration from `config/{default,<env>}.toml` with
/// `APP__`-prefixed environment variable overrides on top.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
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
        .set_default("database_url", "sqlite://salesdesk.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;
    app_config.validate()?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

/// Initializes the tracing subscriber. `RUST_LOG` overrides the
/// configured level when set.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("salesdesk_api={},tower_http=info", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::try_new(filter_directive)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sales_defaults_are_sane() {
        let cfg = SalesConfig::default();
        assert_eq!(cfg.approval_amount_threshold, Decimal::from(1000));
        assert_eq!(cfg.approval_quantity_threshold, 100);
        assert_eq!(cfg.max_employee_discount_percent, Decimal::from(10));
        assert!(cfg.cross_warehouse_requires_approval);
    }

    #[test]
    fn idempotency_defaults() {
        let cfg = IdempotencyConfig::default();
        assert!(cfg.enabled);
        assert_eq!(cfg.ttl_hours, 24);
        assert!(cfg.required_paths.is_empty());
    }
}
