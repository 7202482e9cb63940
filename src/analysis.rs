//! Fetch → preprocess → chart data, run once per user request.

use crate::api::RestClient;
use crate::error::Result;
use crate::models::{preprocess, Aggregation, Clock, RecordSet, TimeSkew, VolatilitySurface};
use chrono::NaiveDate;
use tracing::info;

/// Everything the two charts need for one symbol.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub symbol: String,
    /// Contracts that went into the charts
    pub record_count: usize,
    /// Contracts already past expiration on `as_of`
    pub expired_count: usize,
    pub as_of: NaiveDate,
    pub surface: VolatilitySurface,
    pub skew: TimeSkew,
}

/// Build both chart inputs from an already fetched record set.
pub fn analyze(set: RecordSet, clock: &dyn Clock, aggregation: Aggregation) -> Result<Analysis> {
    let enriched = preprocess(set, clock)?;

    let surface = VolatilitySurface::from_records(&enriched, aggregation);
    let skew = TimeSkew::from_records(&enriched);
    let expired_count = enriched
        .records
        .iter()
        .filter(|r| r.days_to_expiration < 0)
        .count();

    info!(
        "Analysis for {}: {} contracts, {} expirations, {} moneyness levels, {} filled cells",
        enriched.symbol,
        enriched.len(),
        surface.days_to_expiration.len(),
        surface.moneyness.len(),
        surface.filled_cells()
    );

    Ok(Analysis {
        symbol: enriched.symbol,
        record_count: enriched.records.len(),
        expired_count,
        as_of: enriched.as_of,
        surface,
        skew,
    })
}

/// Fetch the chain and analyze it. A failed fetch returns before any chart data is built.
pub async fn fetch_and_analyze(
    client: &RestClient,
    symbol: &str,
    clock: &dyn Clock,
    aggregation: Aggregation,
) -> Result<Analysis> {
    let set = client.get_option_chain(symbol).await?;
    analyze(set, clock, aggregation)
}
