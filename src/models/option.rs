use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionType {
    Call,
    Put,
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionType::Call => write!(f, "Call"),
            OptionType::Put => write!(f, "Put"),
        }
    }
}

impl FromStr for OptionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" | "c" => Ok(OptionType::Call),
            "put" | "p" => Ok(OptionType::Put),
            other => Err(format!("unknown option type {:?}", other)),
        }
    }
}

/// One option contract as returned by the quote source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionRecord {
    pub underlying_price: f64,
    pub strike_price: f64,
    pub expiration_date: NaiveDate,
    pub implied_volatility: f64,
    /// Provider contract identifier, when the payload carries one
    pub contract_id: Option<String>,
    pub option_type: Option<OptionType>,
}

impl OptionRecord {
    pub fn new(
        underlying_price: f64,
        strike_price: f64,
        expiration_date: NaiveDate,
        implied_volatility: f64,
    ) -> Self {
        Self {
            underlying_price,
            strike_price,
            expiration_date,
            implied_volatility,
            contract_id: None,
            option_type: None,
        }
    }
}

/// The records produced by a single fetch, in payload order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSet {
    pub symbol: String,
    pub records: Vec<OptionRecord>,
}

impl RecordSet {
    pub fn new(symbol: impl Into<String>, records: Vec<OptionRecord>) -> Self {
        Self {
            symbol: symbol.into(),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A record with the two derived columns attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub record: OptionRecord,
    pub moneyness: f64,
    pub days_to_expiration: i64,
}

impl EnrichedRecord {
    pub fn implied_volatility(&self) -> f64 {
        self.record.implied_volatility
    }
}

/// Output of preprocessing; same order as the source `RecordSet`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedSet {
    pub symbol: String,
    pub records: Vec<EnrichedRecord>,
    /// The date `days_to_expiration` was measured from
    pub as_of: NaiveDate,
}

impl EnrichedSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
