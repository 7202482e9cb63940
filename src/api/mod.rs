//! API client for the Alpha Vantage quote service
//!
//! This module contains the REST client that fetches option chains and the
//! decoding of the provider's response payload.

mod rest;
mod wire;

pub use rest::RestClient;
