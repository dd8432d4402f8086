/// Shared error type used across all scribe crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Connection-level HTTP failure (refused, reset, DNS).
    #[error("HTTP: {0}")]
    Http(String),

    /// Non-success HTTP status from the remote endpoint.
    #[error("transport: HTTP {status} - {message}")]
    Transport { status: u16, message: String },

    #[error("timeout: {0}")]
    Timeout(String),

    /// The endpoint answered with an explicit error payload.
    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this failure is in the unavailable/unauthorized class that
    /// the worker escalates to its fallback strategy by default.  Payload
    /// errors from the provider and local decode failures are not; those
    /// stay per-item.
    pub fn is_availability_class(&self) -> bool {
        matches!(
            self,
            Error::Auth(_) | Error::Http(_) | Error::Timeout(_) | Error::Transport { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_and_auth_are_availability_class() {
        assert!(Error::Transport {
            status: 503,
            message: "overloaded".into()
        }
        .is_availability_class());
        assert!(Error::Auth("missing key".into()).is_availability_class());
        assert!(Error::Http("connection refused".into()).is_availability_class());
        assert!(Error::Timeout("read timed out".into()).is_availability_class());
    }

    #[test]
    fn provider_payload_errors_are_not() {
        let err = Error::Provider {
            provider: "anthropic".into(),
            message: "invalid_request_error".into(),
        };
        assert!(!err.is_availability_class());
        assert!(!Error::Other("sink failed".into()).is_availability_class());
    }
}
