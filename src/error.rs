use thiserror::Error;

/// Text shown to the user whenever the option chain could not be fetched.
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch data. Check the ticker symbol or API key.";

/// Custom error types for the skew-rs library
#[derive(Error, Debug)]
pub enum SkewError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response status: {status} at {url}")]
    Status { status: u16, url: String },

    /// The payload was not the expected shape or was missing a required field.
    #[error("Data format unexpected or missing field: {0}")]
    Data(String),

    /// The provider answered with an explanatory message instead of data.
    #[error("Quote provider message: {0}")]
    Api(String),

    #[error("Invalid ticker symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("Invalid option record at index {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serde error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Plotting error: {0}")]
    Plot(String),
}

impl SkewError {
    /// Transport failures, bad statuses and unusable payloads.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            SkewError::Http(_)
                | SkewError::Status { .. }
                | SkewError::Data(_)
                | SkewError::Api(_)
                | SkewError::SerdeError(_)
        )
    }

    /// The single message surfaced in user interfaces.
    pub fn user_message(&self) -> String {
        if self.is_fetch_failure() {
            FETCH_FAILED_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }
}

pub type Result<T> = std::result::Result<T, SkewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_failures_share_one_message() {
        let errors = [
            SkewError::Status { status: 500, url: "http://x/query".into() },
            SkewError::Data("missing field `optionChain`".into()),
            SkewError::Api("Invalid API call".into()),
        ];
        for err in &errors {
            assert!(err.is_fetch_failure());
            assert_eq!(err.user_message(), FETCH_FAILED_MESSAGE);
        }
    }

    #[test]
    fn record_errors_keep_their_detail() {
        let err = SkewError::InvalidRecord {
            index: 3,
            reason: "underlying price is zero".into(),
        };
        assert!(!err.is_fetch_failure());
        assert_eq!(
            err.user_message(),
            "Invalid option record at index 3: underlying price is zero"
        );
    }
}
