//! Error types for the informatics client.
//!
//! # Design
//! Only conditions the caller has to react to differently get their own
//! variant. Transport failures are kept apart from everything the backend
//! says, and a backend that reports success with a payload of the wrong shape
//! (`SchemaMismatch`) is kept apart from a backend that reports an error
//! (`Backend`). Malformed bodies never reach this type: the normalizer folds
//! them into a synthetic error envelope.

use thiserror::Error;

/// Errors returned by the session, dispatcher and endpoint client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The HTTP round-trip itself failed (timeout, refused connection, DNS).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An authenticated operation was attempted before a successful login.
    #[error("not logged in")]
    Unauthorized,

    /// No route with this name exists in the selected table.
    #[error("unknown {origin} route '{name}'")]
    UnknownRoute { name: String, origin: &'static str },

    /// The number of parameters does not match the route template.
    #[error("route '{name}' takes {expected} parameters, got {got}")]
    RouteParams {
        name: String,
        expected: usize,
        got: usize,
    },

    /// A scraped HTML page no longer has the structure the extractor expects.
    #[error("site layout changed on {page} page: {detail}")]
    LayoutChanged { page: &'static str, detail: String },

    /// The backend answered with an error envelope.
    #[error("backend error: {reason}")]
    Backend { reason: String },

    /// The backend reported success but sent no data under the route key.
    #[error("response has no '{route_key}' section")]
    MissingPayload { route_key: &'static str },

    /// The payload is present but does not have the expected shape.
    #[error(transparent)]
    SchemaMismatch(#[from] SchemaMismatch),

    /// A local file to be submitted could not be read.
    #[error("failed to read submission file: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// True when repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Transport(e) if e.is_retryable())
    }
}

/// Classification of a failed HTTP round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Other,
}

/// A failed HTTP round-trip, as reported by a [`crate::Transport`].
#[derive(Debug, Clone, Error)]
#[error("transport error ({kind:?}): {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            TransportErrorKind::Timeout | TransportErrorKind::Connect
        )
    }
}

/// A payload that is present but cannot be turned into the schema's records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{schema} payload does not match: {detail}")]
pub struct SchemaMismatch {
    pub schema: &'static str,
    pub detail: String,
}

impl SchemaMismatch {
    pub fn new(schema: &'static str, detail: impl Into<String>) -> Self {
        Self {
            schema,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_and_connect_failures_are_retryable() {
        let timeout = ApiError::from(TransportError::new(TransportErrorKind::Timeout, "5s"));
        let connect = ApiError::from(TransportError::new(TransportErrorKind::Connect, "refused"));
        let other = ApiError::from(TransportError::new(TransportErrorKind::Other, "bad uri"));
        assert!(timeout.is_retryable());
        assert!(connect.is_retryable());
        assert!(!other.is_retryable());
        assert!(!ApiError::Unauthorized.is_retryable());
    }

    #[test]
    fn backend_and_schema_errors_render_differently() {
        let backend = ApiError::Backend {
            reason: "limit exceeded".to_string(),
        };
        let mismatch = ApiError::from(SchemaMismatch::new("runs", "missing field `id`"));
        assert_eq!(backend.to_string(), "backend error: limit exceeded");
        assert_eq!(
            mismatch.to_string(),
            "runs payload does not match: missing field `id`"
        );
    }
}
