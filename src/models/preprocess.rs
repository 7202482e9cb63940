//! Derives moneyness and days to expiration for every fetched contract.

use crate::error::{Result, SkewError};
use crate::models::clock::Clock;
use crate::models::option::{EnrichedRecord, EnrichedSet, OptionRecord, RecordSet};
use chrono::NaiveDate;
use tracing::debug;

/// `(underlying - strike) / underlying`, normalised so an at-the-money contract is `+0.0`.
pub fn moneyness(underlying_price: f64, strike_price: f64) -> Option<f64> {
    if underlying_price == 0.0 || !underlying_price.is_finite() || !strike_price.is_finite() {
        return None;
    }
    let m = (underlying_price - strike_price) / underlying_price;
    // A subnormal underlying overflows the division
    if !m.is_finite() {
        return None;
    }
    // -0.0 and 0.0 must land in the same surface column
    Some(if m == 0.0 { 0.0 } else { m })
}

/// Whole calendar days from `today` to `expiration`; negative once expired.
pub fn days_to_expiration(expiration: NaiveDate, today: NaiveDate) -> i64 {
    (expiration - today).num_days()
}

fn enrich(index: usize, record: OptionRecord, today: NaiveDate) -> Result<EnrichedRecord> {
    let moneyness = moneyness(record.underlying_price, record.strike_price).ok_or_else(|| {
        SkewError::InvalidRecord {
            index,
            reason: format!(
                "moneyness undefined for underlying price {} and strike {}",
                record.underlying_price, record.strike_price
            ),
        }
    })?;
    let days_to_expiration = days_to_expiration(record.expiration_date, today);

    Ok(EnrichedRecord {
        record,
        moneyness,
        days_to_expiration,
    })
}

/// Attach the derived columns to every record, preserving order.
///
/// Fails on the first record whose moneyness is undefined (zero or
/// non-finite underlying price, or a ratio that overflows) rather than letting infinities reach the
/// chart builders. Expired contracts are kept.
pub fn preprocess(set: RecordSet, clock: &dyn Clock) -> Result<EnrichedSet> {
    let today = clock.today();
    let RecordSet { symbol, records, .. } = set;

    let records = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| enrich(index, record, today))
        .collect::<Result<Vec<_>>>()?;

    let expired = records.iter().filter(|r| r.days_to_expiration < 0).count();
    debug!(
        "Preprocessed {} records for {} as of {} ({} expired)",
        records.len(),
        symbol,
        today,
        expired
    );

    Ok(EnrichedSet {
        symbol,
        records,
        as_of: today,
    })
}
