//! Data models for option chains and volatility charts
//!
//! This module contains the fetched contract records, the preprocessing step
//! that derives moneyness and days to expiration, and the surface and skew
//! structures the charts are drawn from.

mod clock;
mod option;
mod preprocess;
mod volatility;

pub use clock::*;
pub use option::*;
pub use preprocess::*;
pub use volatility::*;
