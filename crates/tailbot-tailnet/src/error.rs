//! Error types for the Tailscale API client.

use thiserror::Error;

/// Errors returned while listing tailnet devices.
#[derive(Debug, Error)]
pub enum TailnetError {
    /// The request could not be sent or the body could not be read.
    #[error("network error: {0}")]
    Network(String),

    /// The API answered with a non-success status.
    #[error("tailscale API returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned by the API.
        message: String,
    },

    /// The body was not a device listing.
    #[error("failed to parse device list: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type for tailnet operations.
pub type Result<T> = std::result::Result<T, TailnetError>;

impl From<reqwest::Error> for TailnetError {
    fn from(e: reqwest::Error) -> Self {
        TailnetError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        let err = TailnetError::Status {
            status: 403,
            message: "forbidden".to_string(),
        };
        assert_eq!(err.to_string(), "tailscale API returned 403: forbidden");
    }

    #[test]
    fn test_parse_error_from_serde() {
        let serde_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: TailnetError = serde_err.into();
        assert!(matches!(err, TailnetError::Parse(_)));
        assert!(err.to_string().starts_with("failed to parse device list"));
    }
}
