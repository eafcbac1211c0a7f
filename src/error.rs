// Error taxonomy — one error type for the whole crate.

use std::time::Duration;

/// Discriminator for every failure the session loop can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The remote service rejected the credential (HTTP 401/403).
    Authentication,
    /// The remote service throttled the request (HTTP 429).
    RateLimited,
    /// The request was malformed (HTTP 400/404/422, or local validation).
    InvalidRequest,
    /// Network-level failure, or a server-side failure the caller cannot act on.
    Transport,
    /// A fragment stream was consumed a second time.
    ExhaustedStream,
    /// Required configuration was absent at startup.
    ConfigurationMissing,
}

/// The single error type for the entire crate.
#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    /// HTTP status code, when the error originated from a provider response.
    pub status_code: Option<u16>,
    /// How long the provider asked us to wait (from the `Retry-After` header).
    pub retry_after: Option<Duration>,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
            retry_after: None,
            source: None,
        }
    }

    /// Construct from an HTTP status code returned by the provider.
    pub fn from_http_status(
        status: u16,
        message: String,
        retry_after: Option<Duration>,
    ) -> Self {
        let kind = match status {
            401 | 403 => ErrorKind::Authentication,
            429 => ErrorKind::RateLimited,
            400 | 404 | 422 => ErrorKind::InvalidRequest,
            _ => ErrorKind::Transport,
        };
        Self {
            kind,
            message,
            status_code: Some(status),
            retry_after,
            source: None,
        }
    }

    /// Convenience: missing configuration, fatal at startup.
    pub fn configuration_missing(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigurationMissing, message)
    }

    /// Convenience: locally detected invalid request (e.g. malformed schema).
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    /// Convenience: network-level failure without an underlying cause.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    /// Convenience: network-level failure with source.
    pub fn transport_from(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            source: Some(Box::new(source)),
            ..Self::new(ErrorKind::Transport, message)
        }
    }

    /// Convenience: a fragment stream was taken twice.
    pub fn exhausted_stream() -> Self {
        Self::new(
            ErrorKind::ExhaustedStream,
            "fragment stream already consumed",
        )
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::transport_from(format!("I/O error: {err}"), err)
    }
}
