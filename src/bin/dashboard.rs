//! Browser dashboard for volatility surface and time skew charts.

use skew_rs::config::Config;
use skew_rs::error::Result;
use skew_rs::webapp;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    config.init_logging()?;

    info!("Starting dashboard with {:?}", config.alpha_vantage);
    webapp::serve(&config).await
}
