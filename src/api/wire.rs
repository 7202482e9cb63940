//! Decoding of the `OPTION_CHAIN` response body.

use crate::error::{Result, SkewError};
use crate::models::{OptionRecord, OptionType};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::warn;

/// Keys the provider uses for explanatory bodies (bad symbol, bad key, throttling).
const PROVIDER_MESSAGE_KEYS: [&str; 3] = ["Error Message", "Information", "Note"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionChainEntry {
    #[serde(deserialize_with = "de_number")]
    underlying_price: f64,
    #[serde(deserialize_with = "de_number")]
    strike_price: f64,
    expiration_date: String,
    #[serde(deserialize_with = "de_number")]
    implied_volatility: f64,
    #[serde(default, alias = "contractID", alias = "contractSymbol")]
    contract_id: Option<String>,
    #[serde(default, rename = "type", alias = "optionType")]
    option_type: Option<String>,
}

// Numbers sometimes arrive quoted ("431.70").
fn de_number<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("{:?} is not a number", s))),
    }
}

/// Accepts a bare date, a `YYYY-MM-DD HH:MM:SS` timestamp, or RFC 3339.
pub(crate) fn parse_expiration(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
}

fn provider_message(body: &Map<String, Value>) -> Option<String> {
    PROVIDER_MESSAGE_KEYS.iter().find_map(|key| {
        body.get(*key)
            .and_then(Value::as_str)
            .map(|msg| format!("{}: {}", key, msg))
    })
}

/// Row objects from either an array of rows or an object of equal-length columns.
fn table_rows(chain: &Value) -> Result<Vec<Value>> {
    match chain {
        Value::Array(rows) => Ok(rows.clone()),
        Value::Object(columns) => {
            let mut len = None;
            for (name, column) in columns {
                let column = column.as_array().ok_or_else(|| {
                    SkewError::Data(format!("optionChain column {:?} is not an array", name))
                })?;
                match len {
                    None => len = Some(column.len()),
                    Some(expected) if expected != column.len() => {
                        return Err(SkewError::Data(format!(
                            "optionChain column {:?} has {} values, expected {}",
                            name,
                            column.len(),
                            expected
                        )))
                    }
                    Some(_) => {}
                }
            }

            let rows = (0..len.unwrap_or(0))
                .map(|i| {
                    let row: Map<String, Value> = columns
                        .iter()
                        .map(|(name, column)| (name.clone(), column[i].clone()))
                        .collect();
                    Value::Object(row)
                })
                .collect();
            Ok(rows)
        }
        other => Err(SkewError::Data(format!(
            "optionChain must be an array or a column table, got {}",
            type_name(other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn to_record(index: usize, row: Value) -> Result<OptionRecord> {
    let entry: OptionChainEntry = serde_json::from_value(row)
        .map_err(|e| SkewError::Data(format!("optionChain entry {}: {}", index, e)))?;

    let expiration_date = parse_expiration(&entry.expiration_date).ok_or_else(|| {
        SkewError::Data(format!(
            "optionChain entry {}: unparseable expirationDate {:?}",
            index, entry.expiration_date
        ))
    })?;

    let option_type = entry.option_type.as_deref().and_then(|raw| {
        raw.parse::<OptionType>()
            .map_err(|e| {
                warn!("optionChain entry {}: {}", index, e);
            })
            .ok()
    });

    Ok(OptionRecord {
        underlying_price: entry.underlying_price,
        strike_price: entry.strike_price,
        expiration_date,
        implied_volatility: entry.implied_volatility,
        contract_id: entry.contract_id,
        option_type,
    })
}

/// Decode a response body into records, in payload order.
pub(crate) fn parse_option_chain(body: &str) -> Result<Vec<OptionRecord>> {
    let payload: Value = serde_json::from_str(body)
        .map_err(|e| SkewError::Data(format!("response is not valid JSON: {}", e)))?;
    let payload = payload
        .as_object()
        .ok_or_else(|| SkewError::Data(format!("response is {}, expected an object", type_name(&payload))))?;

    let chain = match payload.get("optionChain") {
        Some(chain) => chain,
        None => {
            return Err(match provider_message(payload) {
                Some(message) => SkewError::Api(message),
                None => SkewError::Data("missing field `optionChain`".to_string()),
            })
        }
    };

    table_rows(chain)?
        .into_iter()
        .enumerate()
        .map(|(index, row)| to_record(index, row))
        .collect()
}
