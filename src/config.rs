use crate::error::{Result, SkewError};
use crate::models::Aggregation;
use dotenv::dotenv;
use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_OUTPUT_DIR: &str = "output";
const DEFAULT_DASHBOARD_ADDR: &str = "127.0.0.1:8080";

/// Configuration for the Alpha Vantage quote API
#[derive(Clone)]
pub struct AlphaVantageConfig {
    /// API key sent as the `apikey` query parameter
    pub api_key: String,
    /// Query endpoint
    pub base_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
}

impl AlphaVantageConfig {
    pub fn new(api_key: impl Into<String>, base_url: Url) -> Self {
        Self {
            api_key: api_key.into(),
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// Keeps the key out of logs and error reports.
impl fmt::Debug for AlphaVantageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlphaVantageConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    /// Quote API configuration
    pub alpha_vantage: AlphaVantageConfig,
    /// Log level
    pub log_level: String,
    /// Directory the CLI writes charts into
    pub output_dir: PathBuf,
    /// Address the dashboard listens on
    pub dashboard_addr: SocketAddr,
    /// Reduction used when several contracts land in one surface cell
    pub aggregation: Aggregation,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("ALPHAVANTAGE_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                SkewError::ConfigError(
                    "ALPHAVANTAGE_API_KEY environment variable not set".to_string(),
                )
            })?;

        let base_url = lookup("ALPHAVANTAGE_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(&base_url)?;

        let timeout_secs = match lookup("ALPHAVANTAGE_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                SkewError::ConfigError(format!(
                    "ALPHAVANTAGE_TIMEOUT_SECS must be a whole number of seconds, got {:?}",
                    raw
                ))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            return Err(SkewError::ConfigError(
                "ALPHAVANTAGE_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        let output_dir = PathBuf::from(
            lookup("SKEW_OUTPUT_DIR").unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
        );

        let dashboard_addr = lookup("DASHBOARD_ADDR")
            .unwrap_or_else(|| DEFAULT_DASHBOARD_ADDR.to_string());
        let dashboard_addr = dashboard_addr.parse::<SocketAddr>().map_err(|e| {
            SkewError::ConfigError(format!("DASHBOARD_ADDR {:?} is invalid: {}", dashboard_addr, e))
        })?;

        let aggregation = match lookup("SKEW_AGGREGATION") {
            Some(raw) => raw.parse::<Aggregation>()?,
            None => Aggregation::default(),
        };

        Ok(Config {
            alpha_vantage: AlphaVantageConfig {
                api_key,
                base_url,
                timeout: Duration::from_secs(timeout_secs),
            },
            log_level,
            output_dir,
            dashboard_addr,
            aggregation,
        })
    }

    /// Initialize logging based on configuration
    pub fn init_logging(&self) -> Result<()> {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level));

        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
            .map_err(|e| SkewError::ConfigError(format!("Failed to initialize logging: {}", e)))?;

        Ok(())
    }
}
