use thiserror::Error;

/// Error taxonomy for client operations.
///
/// Every failure is terminal for the single operation that produced it;
/// there are no retries at this layer. Callers re-trigger on the next user
/// action or push event.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level failure (could not reach the gateway at all).
    #[error("could not connect to the server: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx response from the gateway. `message` is surfaced verbatim
    /// from the response body.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// Local precondition failure, raised before any network call.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Push-channel transport failure. Only ever flips connection state;
    /// never invalidates already-known dashboard data.
    #[error("live channel error: {0}")]
    Channel(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel(message.into())
    }

    /// HTTP status code, if this error came from a gateway response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_displays_gateway_message_verbatim() {
        let err = Error::Http {
            status: 401,
            message: "invalid credentials".to_owned(),
        };
        assert_eq!(err.to_string(), "invalid credentials");
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn validation_error_has_no_status() {
        let err = Error::validation("passwords do not match");
        assert_eq!(err.status(), None);
        assert!(err.to_string().contains("passwords do not match"));
    }
}
