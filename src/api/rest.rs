use crate::api::wire::parse_option_chain;
use crate::config::AlphaVantageConfig;
use crate::error::{Result, SkewError};
use crate::models::RecordSet;
use tracing::{debug, info};
use url::Url;

const OPTION_CHAIN_FUNCTION: &str = "OPTION_CHAIN";

pub struct RestClient {
    client: reqwest::Client,
    config: AlphaVantageConfig,
}

impl RestClient {
    pub fn new(config: AlphaVantageConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Request URL without the credential, safe to log and to put in errors.
    fn option_chain_url(&self, symbol: &str) -> Url {
        let mut url = self.config.base_url.clone();
        url.query_pairs_mut()
            .append_pair("function", OPTION_CHAIN_FUNCTION)
            .append_pair("symbol", symbol);
        url
    }

    /// Fetch the option chain for `symbol` with a single request.
    pub async fn get_option_chain(&self, symbol: &str) -> Result<RecordSet> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(SkewError::InvalidSymbol(symbol.to_string()));
        }

        info!("Getting option chain for {}", symbol);
        let url = self.option_chain_url(symbol);
        debug!("GET {}", url);

        let resp = self
            .client
            .get(url.clone())
            .query(&[("apikey", self.config.api_key.as_str())])
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| SkewError::Http(e.without_url()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SkewError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| SkewError::Http(e.without_url()))?;
        let records = parse_option_chain(&body)?;

        info!("Response parsed successfully. Got {} contracts for {}", records.len(), symbol);
        for (i, record) in records.iter().enumerate().take(3) {
            debug!(
                "Sample contract {}: Strike={}, Exp={}, IV={}",
                i, record.strike_price, record.expiration_date, record.implied_volatility
            );
        }

        Ok(RecordSet::new(symbol, records))
    }
}
