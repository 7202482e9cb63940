//! Command-line entry point
//!
//! Fetches the option chain for one symbol, then writes the volatility
//! surface and time skew charts into the configured output directory.
//!
//! Usage: `skew-rs [SYMBOL] [--png] [--aggregation <mean|median|min|max|first|last>]`

use skew_rs::analysis::fetch_and_analyze;
use skew_rs::api::RestClient;
use skew_rs::config::Config;
use skew_rs::error::{Result, SkewError};
use skew_rs::models::{Aggregation, SystemClock};
use skew_rs::utils::write_charts;
use skew_rs::webapp::DEFAULT_SYMBOL;
use tracing::{error, info, warn};

struct Args {
    symbol: String,
    png: bool,
    aggregation: Option<Aggregation>,
}

fn parse_args<I: Iterator<Item = String>>(mut args: I) -> Result<Args> {
    let mut symbol = None;
    let mut png = false;
    let mut aggregation = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--png" => png = true,
            "--aggregation" => {
                let value = args.next().ok_or_else(|| {
                    SkewError::ConfigError("--aggregation needs a value".to_string())
                })?;
                aggregation = Some(value.parse()?);
            }
            flag if flag.starts_with("--") => {
                return Err(SkewError::ConfigError(format!("unknown flag {}", flag)));
            }
            _ if symbol.is_none() => symbol = Some(arg),
            _ => {
                return Err(SkewError::ConfigError(format!("unexpected argument {}", arg)));
            }
        }
    }

    Ok(Args {
        symbol: symbol.unwrap_or_else(|| DEFAULT_SYMBOL.to_string()),
        png,
        aggregation,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    let config = Config::from_env()?;
    config.init_logging()?;

    let aggregation = args.aggregation.unwrap_or(config.aggregation);
    info!("Fetching option chain for {} (aggregation: {})", args.symbol, aggregation);

    let client = RestClient::new(config.alpha_vantage.clone());
    let analysis = match fetch_and_analyze(&client, &args.symbol, &SystemClock, aggregation).await {
        Ok(analysis) => analysis,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e.user_message());
            return Err(e);
        }
    };

    if analysis.record_count == 0 {
        warn!("No contracts returned for {}; charts will be empty", analysis.symbol);
    }

    let files = write_charts(&analysis, &config.output_dir, args.png)?;
    println!("Data fetched successfully!");
    println!("{}", files.surface_html.display());
    println!("{}", files.skew_html.display());
    if let Some(png) = files.skew_png {
        println!("{}", png.display());
    }

    Ok(())
}
