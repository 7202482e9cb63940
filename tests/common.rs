#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use httpmock::Method::GET;
use httpmock::{Mock, MockServer};
use serde_json::{json, Value};
use skew_rs::api::RestClient;
use skew_rs::config::AlphaVantageConfig;
use url::Url;

pub const API_KEY: &str = "test-key";

pub fn setup_server() -> MockServer {
    MockServer::start()
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

pub fn config_for(server: &MockServer) -> AlphaVantageConfig {
    AlphaVantageConfig::new(API_KEY, Url::parse(&server.url("/query")).unwrap())
}

pub fn client_for(server: &MockServer) -> RestClient {
    RestClient::new(config_for(server))
}

/// Two contracts ten days out plus a duplicate cell and a second expiry.
pub fn chain_body() -> Value {
    let ten = (today() + Duration::days(10)).format("%Y-%m-%d").to_string();
    let thirty = (today() + Duration::days(30)).format("%Y-%m-%d").to_string();
    json!({
        "optionChain": [
            { "underlyingPrice": 100.0, "strikePrice": 95.0, "expirationDate": ten, "impliedVolatility": 0.20, "type": "call" },
            { "underlyingPrice": 100.0, "strikePrice": 105.0, "expirationDate": ten, "impliedVolatility": 0.25, "type": "call" },
            { "underlyingPrice": 100.0, "strikePrice": 95.0, "expirationDate": thirty, "impliedVolatility": 0.20, "type": "call" },
            { "underlyingPrice": 100.0, "strikePrice": 95.0, "expirationDate": thirty, "impliedVolatility": 0.30, "type": "put" }
        ]
    })
}

pub fn mock_chain<'a>(server: &'a MockServer, symbol: &str, body: Value) -> Mock<'a> {
    let symbol = symbol.to_string();
    server.mock(move |when, then| {
        when.method(GET)
            .path("/query")
            .query_param("function", "OPTION_CHAIN")
            .query_param("symbol", symbol.as_str())
            .query_param("apikey", API_KEY);
        then.status(200)
            .header("content-type", "application/json")
            .json_body(body);
    })
}

pub fn mock_status<'a>(server: &'a MockServer, symbol: &str, status: u16) -> Mock<'a> {
    let symbol = symbol.to_string();
    server.mock(move |when, then| {
        when.method(GET).path("/query").query_param("symbol", symbol.as_str());
        then.status(status).body("oops");
    })
}
