//! Error types for corvidbot.

use thiserror::Error;

/// Errors that can occur while running a bot.
#[derive(Debug, Error)]
pub enum BotError {
    /// Configuration file or value problem.
    #[error("configuration error: {0}")]
    Config(String),

    /// Gateway connection failed or was torn down.
    #[error("gateway error: {0}")]
    Gateway(String),

    /// Every reconnect attempt in the budget failed.
    #[error("reconnect budget exhausted after {attempts} attempts: {last_error}")]
    ReconnectExhausted {
        /// Attempts made before giving up.
        attempts: u32,
        /// Error from the final attempt.
        last_error: String,
    },

    /// A rate-limited route never cleared within the retry budget.
    #[error("rate limit retries exhausted after {attempts} attempts: {method} {path}")]
    RateLimited {
        /// Attempts made before giving up.
        attempts: u32,
        /// HTTP method of the request.
        method: String,
        /// Route that stayed rate limited.
        path: String,
    },

    /// The platform rejected a request.
    #[error("api error (status {status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body as returned by the platform.
        body: String,
    },

    /// An interaction handler failed.
    #[error("handler error: {0}")]
    Handler(String),

    /// HTTP transport error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Protocol encode or decode error.
    #[error("protocol error: {0}")]
    Protocol(#[from] corvid_proto::ProtoError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for bot operations.
pub type Result<T> = std::result::Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BotError::Config("token cannot be empty".to_string());
        assert_eq!(err.to_string(), "configuration error: token cannot be empty");

        let err = BotError::Gateway("connect failed".to_string());
        assert_eq!(err.to_string(), "gateway error: connect failed");

        let err = BotError::RateLimited {
            attempts: 5,
            method: "POST".to_string(),
            path: "/applications/1/commands".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "rate limit retries exhausted after 5 attempts: POST /applications/1/commands"
        );

        let err = BotError::Api {
            status: 403,
            body: "Missing Access".to_string(),
        };
        assert_eq!(err.to_string(), "api error (status 403): Missing Access");
    }

    #[test]
    fn test_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: BotError = io.into();
        assert!(matches!(err, BotError::Io(_)));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_error_from_proto() {
        let proto = corvid_proto::ProtoError::MissingField("t");
        let err: BotError = proto.into();
        assert!(matches!(err, BotError::Protocol(_)));
        assert_eq!(err.to_string(), "protocol error: missing required field: t");
    }
}
