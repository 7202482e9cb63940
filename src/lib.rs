//! # skew-rs
//!
//! An Alpha Vantage option-chain client that turns one fetch into an implied
//! volatility surface and a time skew curve, rendered as interactive charts.
//!
//! ## Features
//!
//! - REST client for the `OPTION_CHAIN` endpoint
//! - Moneyness and days-to-expiration preprocessing with an injectable clock
//! - Volatility surface pivot with explicit gaps and configurable de-duplication
//! - Time skew (mean implied volatility per expiration)
//! - Plotly charts, standalone HTML output and a browser dashboard
//! - Environment-based configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use skew_rs::analysis::fetch_and_analyze;
//! use skew_rs::api::RestClient;
//! use skew_rs::config::Config;
//! use skew_rs::models::SystemClock;
//! use skew_rs::utils::write_charts;
//!
//! #[tokio::main]
//! async fn main() -> skew_rs::error::Result<()> {
//!     // Load configuration from environment
//!     let config = Config::from_env()?;
//!     config.init_logging()?;
//!
//!     let client = RestClient::new(config.alpha_vantage.clone());
//!     let analysis = fetch_and_analyze(&client, "SPY", &SystemClock, config.aggregation).await?;
//!
//!     write_charts(&analysis, &config.output_dir, false)?;
//!
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod utils;
pub mod webapp;

// Re-export commonly used types
pub use analysis::{analyze, fetch_and_analyze, Analysis};
pub use api::RestClient;
pub use config::Config;
pub use error::{Result, SkewError};
