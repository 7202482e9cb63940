//! Volatility surface and time skew built from preprocessed contracts
//!
//! Both builders group contracts with ordered maps so the resulting axes come
//! out sorted without a separate pass.

use crate::error::SkewError;
use crate::models::option::EnrichedSet;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use tracing::{debug, warn};

/// How several implied volatilities sharing one surface cell are reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Arithmetic mean
    #[default]
    Mean,
    Median,
    Min,
    Max,
    /// First value in payload order
    First,
    /// Last value in payload order
    Last,
}

impl Aggregation {
    pub const ALL: [Aggregation; 6] = [
        Aggregation::Mean,
        Aggregation::Median,
        Aggregation::Min,
        Aggregation::Max,
        Aggregation::First,
        Aggregation::Last,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Aggregation::Mean => "mean",
            Aggregation::Median => "median",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
            Aggregation::First => "first",
            Aggregation::Last => "last",
        }
    }

    /// Reduce the finite entries of `values`; `None` if there are none.
    pub fn reduce(&self, values: &[f64]) -> Option<f64> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return None;
        }

        let reduced = match self {
            Aggregation::Mean => finite.iter().mean(),
            Aggregation::Median => Data::new(finite).median(),
            Aggregation::Min => Statistics::min(finite.iter()),
            Aggregation::Max => Statistics::max(finite.iter()),
            Aggregation::First => finite[0],
            Aggregation::Last => finite[finite.len() - 1],
        };
        Some(reduced)
    }
}

impl std::fmt::Display for Aggregation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Aggregation {
    type Err = SkewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Aggregation::ALL
            .into_iter()
            .find(|a| a.name() == wanted)
            .ok_or_else(|| {
                SkewError::ConfigError(format!(
                    "unknown aggregation {:?}, expected one of mean, median, min, max, first, last",
                    s
                ))
            })
    }
}

/// Total order over moneyness values so they can key a `BTreeMap`.
#[derive(Debug, Clone, Copy)]
struct MoneynessKey(f64);

impl PartialEq for MoneynessKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MoneynessKey {}

impl PartialOrd for MoneynessKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MoneynessKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Implied volatility pivoted on (days to expiration, moneyness).
#[derive(Debug, Clone)]
pub struct VolatilitySurface {
    /// Underlying symbol
    pub symbol: String,
    /// Distinct moneyness values, ascending (x axis)
    pub moneyness: Vec<f64>,
    /// Distinct days to expiration, ascending (y axis)
    pub days_to_expiration: Vec<i64>,
    /// Rows follow `days_to_expiration`, columns follow `moneyness`.
    /// `None` marks a combination with no contract.
    pub volatilities: Array2<Option<f64>>,
    /// Reduction applied to duplicate cells
    pub aggregation: Aggregation,
}

impl VolatilitySurface {
    /// Pivot the records into a grid; an empty set gives an empty grid.
    pub fn from_records(set: &EnrichedSet, aggregation: Aggregation) -> Self {
        let mut cells: BTreeMap<(i64, MoneynessKey), Vec<f64>> = BTreeMap::new();
        for record in &set.records {
            cells
                .entry((record.days_to_expiration, MoneynessKey(record.moneyness)))
                .or_default()
                .push(record.implied_volatility());
        }

        let days: BTreeSet<i64> = cells.keys().map(|(d, _)| *d).collect();
        let moneyness: BTreeSet<MoneynessKey> = cells.keys().map(|(_, m)| *m).collect();
        let days: Vec<i64> = days.into_iter().collect();
        let moneyness: Vec<MoneynessKey> = moneyness.into_iter().collect();

        let mut volatilities = Array2::from_elem((days.len(), moneyness.len()), None);
        let mut duplicates = 0usize;
        for ((day, m), values) in &cells {
            if values.len() > 1 {
                duplicates += 1;
            }
            // Both searches succeed: the axes were collected from these keys.
            if let (Ok(i), Ok(j)) = (days.binary_search(day), moneyness.binary_search(m)) {
                volatilities[[i, j]] = aggregation.reduce(values);
            }
        }

        debug!(
            "Built {}x{} surface for {} ({} populated cells, {} reduced by {})",
            days.len(),
            moneyness.len(),
            set.symbol,
            cells.len(),
            duplicates,
            aggregation
        );

        Self {
            symbol: set.symbol.clone(),
            moneyness: moneyness.into_iter().map(|k| k.0).collect(),
            days_to_expiration: days,
            volatilities,
            aggregation,
        }
    }

    /// Value at an exact grid point; `None` for a gap or an unknown axis value.
    pub fn get(&self, days_to_expiration: i64, moneyness: f64) -> Option<f64> {
        let i = self.days_to_expiration.binary_search(&days_to_expiration).ok()?;
        let j = self
            .moneyness
            .binary_search_by(|m| m.total_cmp(&moneyness))
            .ok()?;
        self.volatilities[[i, j]]
    }

    pub fn is_empty(&self) -> bool {
        self.volatilities.is_empty()
    }

    /// Number of cells holding a value.
    pub fn filled_cells(&self) -> usize {
        self.volatilities.iter().filter(|v| v.is_some()).count()
    }

    /// Grid rows as nested vectors, one per day.
    pub fn rows(&self) -> Vec<Vec<Option<f64>>> {
        self.volatilities
            .outer_iter()
            .map(|row| row.to_vec())
            .collect()
    }
}

/// One point of the time skew curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkewPoint {
    pub days_to_expiration: i64,
    pub mean_implied_volatility: f64,
}

/// Mean implied volatility per expiration horizon, ascending by days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSkew {
    pub symbol: String,
    pub points: Vec<SkewPoint>,
}

impl TimeSkew {
    pub fn from_records(set: &EnrichedSet) -> Self {
        let mut groups: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
        for record in &set.records {
            groups
                .entry(record.days_to_expiration)
                .or_default()
                .push(record.implied_volatility());
        }

        let points = groups
            .into_iter()
            .filter_map(|(days, values)| match Aggregation::Mean.reduce(&values) {
                Some(mean) => Some(SkewPoint {
                    days_to_expiration: days,
                    mean_implied_volatility: mean,
                }),
                None => {
                    warn!(
                        "Skipping {} days to expiration for {}: no finite implied volatility",
                        days, set.symbol
                    );
                    None
                }
            })
            .collect();

        Self {
            symbol: set.symbol.clone(),
            points,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn days(&self) -> Vec<i64> {
        self.points.iter().map(|p| p.days_to_expiration).collect()
    }

    pub fn mean_volatilities(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.mean_implied_volatility).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::option::{EnrichedRecord, OptionRecord};
    use chrono::NaiveDate;

    fn enriched(days: i64, moneyness: f64, iv: f64) -> EnrichedRecord {
        let expiry = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(days);
        EnrichedRecord {
            record: OptionRecord::new(100.0, 100.0 * (1.0 - moneyness), expiry, iv),
            moneyness,
            days_to_expiration: days,
        }
    }

    fn set(records: Vec<EnrichedRecord>) -> EnrichedSet {
        EnrichedSet {
            symbol: "SPY".to_string(),
            records,
            as_of: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn duplicate_cells_default_to_the_mean() {
        let surface = VolatilitySurface::from_records(
            &set(vec![enriched(10, 0.05, 0.20), enriched(10, 0.05, 0.30)]),
            Aggregation::default(),
        );

        assert_eq!(surface.days_to_expiration, vec![10]);
        assert_eq!(surface.moneyness, vec![0.05]);
        assert!(close(surface.get(10, 0.05).unwrap(), 0.25));
    }

    #[test]
    fn aggregation_can_be_overridden() {
        let records = set(vec![
            enriched(7, 0.0, 0.10),
            enriched(7, 0.0, 0.40),
            enriched(7, 0.0, 0.20),
        ]);

        let expected = [
            (Aggregation::Median, 0.20),
            (Aggregation::Min, 0.10),
            (Aggregation::Max, 0.40),
            (Aggregation::First, 0.10),
            (Aggregation::Last, 0.20),
        ];
        for (aggregation, value) in expected {
            let surface = VolatilitySurface::from_records(&records, aggregation);
            assert!(close(surface.get(7, 0.0).unwrap(), value), "{aggregation}");
        }
    }

    #[test]
    fn missing_pairs_stay_empty() {
        let surface = VolatilitySurface::from_records(
            &set(vec![
                enriched(30, 0.10, 0.3),
                enriched(10, -0.05, 0.2),
                enriched(10, 0.10, 0.25),
            ]),
            Aggregation::Mean,
        );

        assert_eq!(surface.days_to_expiration, vec![10, 30]);
        assert_eq!(surface.moneyness, vec![-0.05, 0.10]);
        assert_eq!(surface.filled_cells(), 3);
        assert_eq!(surface.get(30, -0.05), None);
        assert_eq!(
            surface.rows(),
            vec![vec![Some(0.2), Some(0.25)], vec![None, Some(0.3)]]
        );
    }

    #[test]
    fn unknown_axis_values_read_as_missing() {
        let surface = VolatilitySurface::from_records(&set(vec![enriched(5, 0.0, 0.2)]), Aggregation::Mean);
        assert_eq!(surface.get(6, 0.0), None);
        assert_eq!(surface.get(5, 0.01), None);
    }

    #[test]
    fn empty_set_gives_empty_outputs() {
        let empty = set(vec![]);
        let surface = VolatilitySurface::from_records(&empty, Aggregation::Mean);
        assert!(surface.is_empty());
        assert!(surface.rows().is_empty());

        let skew = TimeSkew::from_records(&empty);
        assert!(skew.is_empty());
    }

    #[test]
    fn skew_is_sorted_mean_per_day() {
        let skew = TimeSkew::from_records(&set(vec![
            enriched(45, 0.0, 0.30),
            enriched(10, 0.05, 0.20),
            enriched(-1, 0.0, 0.90),
            enriched(10, -0.05, 0.25),
            enriched(45, 0.1, 0.50),
        ]));

        assert_eq!(skew.days(), vec![-1, 10, 45]);
        let means = skew.mean_volatilities();
        assert!(close(means[0], 0.90));
        assert!(close(means[1], 0.225));
        assert!(close(means[2], 0.40));
        assert!(skew.days().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn non_finite_volatilities_are_ignored() {
        let records = set(vec![
            enriched(10, 0.0, f64::NAN),
            enriched(10, 0.0, 0.3),
            enriched(20, 0.0, f64::NAN),
        ]);

        let surface = VolatilitySurface::from_records(&records, Aggregation::Mean);
        assert!(close(surface.get(10, 0.0).unwrap(), 0.3));
        assert_eq!(surface.get(20, 0.0), None);

        let skew = TimeSkew::from_records(&records);
        assert_eq!(skew.days(), vec![10]);
    }

    #[test]
    fn aggregation_names_round_trip() {
        for aggregation in Aggregation::ALL {
            assert_eq!(aggregation.name().parse::<Aggregation>().unwrap(), aggregation);
        }
        assert_eq!(" MEDIAN ".parse::<Aggregation>().unwrap(), Aggregation::Median);
        assert!("mode".parse::<Aggregation>().is_err());
        assert_eq!(Aggregation::Mean.reduce(&[]), None);
    }
}
