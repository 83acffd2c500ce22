//! Error types raised by the routing runtime.

use std::error::Error;
use std::io;

use switchyard_protocol::{CorrelationId, Direction, RegistryError, ResponseError};
use thiserror::Error;

/// Failure of an outbound call, as seen by the caller.
#[derive(Debug, Error)]
pub enum CallError {
    /// The peer answered with an error object.
    #[error("peer replied with an error: {0}")]
    Response(#[from] ResponseError),

    /// The call was cancelled locally before a response arrived.
    #[error("request {id} was cancelled")]
    Cancelled {
        /// Id of the abandoned request.
        id: CorrelationId,
    },

    /// The connection closed before a response arrived.
    #[error("connection closed before a response arrived")]
    ConnectionClosed,

    /// Parameters or the result could not be converted.
    #[error("payload codec error: {0}")]
    Codec(#[from] CodecError),

    /// The envelope could not be written.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl CallError {
    /// Whether the call ended because someone cancelled it.
    ///
    /// Cancellation is an expected outcome; callers use this to avoid
    /// reporting it as a failure.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        match self {
            Self::Cancelled { .. } => true,
            Self::Response(error) => error.is_cancellation(),
            Self::ConnectionClosed | Self::Codec(_) | Self::Transport(_) => false,
        }
    }
}

/// Transport-layer errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport was closed.
    #[error("transport closed")]
    Closed,

    /// I/O error during read or write.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An encoded envelope exceeded the configured limit.
    #[error("message of {size} bytes exceeds the {limit} byte limit")]
    MessageTooLarge {
        /// Size of the rejected message.
        size: usize,
        /// Configured limit.
        limit: usize,
    },
}

/// Errors reported by a payload codec.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CodecError {
    message: String,
    #[source]
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl CodecError {
    /// Builds an error without an underlying source.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Builds an error that wraps an underlying source.
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Human-friendly description without the optional source.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(error: serde_json::Error) -> Self {
        Self::with_source(format!("JSON codec failure: {error}"), error)
    }
}

/// Errors raised while building a route table.
#[derive(Debug, Error)]
pub enum RouterError {
    /// The method is unknown or registered with the wrong kind.
    #[error("cannot route {method}: {source}")]
    Registry {
        /// Method being registered.
        method: String,
        /// Registry failure.
        #[source]
        source: RegistryError,
    },

    /// The method never travels towards this side of the connection.
    #[error("{method} cannot be handled by a {side:?} router")]
    WrongDirection {
        /// Method being registered.
        method: &'static str,
        /// Direction the router accepts.
        side: Direction,
    },

    /// The method was registered more than once.
    #[error("{method} is registered more than once")]
    Duplicate {
        /// Method being registered.
        method: &'static str,
    },
}

impl RouterError {
    pub(crate) fn registry(method: &str, source: RegistryError) -> Self {
        Self::Registry {
            method: method.to_owned(),
            source,
        }
    }
}

/// Errors that stop a connection's read loop.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Reading from the transport failed.
    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),

    /// A request worker thread could not be started.
    #[error("failed to spawn request worker: {0}")]
    Spawn(#[source] io::Error),
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use switchyard_protocol::ErrorCode;

    use super::*;

    #[rstest]
    #[case(CallError::Cancelled { id: CorrelationId::Number(1) }, true)]
    #[case(CallError::Response(ResponseError::request_cancelled()), true)]
    #[case(CallError::Response(ResponseError::new(ErrorCode::ServerCancelled, "busy")), true)]
    #[case(CallError::Response(ResponseError::internal("boom")), false)]
    #[case(CallError::ConnectionClosed, false)]
    fn classifies_cancellation(#[case] error: CallError, #[case] expected: bool) {
        assert_eq!(error.is_cancellation(), expected);
    }

    #[rstest]
    fn codec_error_keeps_json_source() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").expect_err("invalid JSON");
        let error = CodecError::from(json_error);

        assert!(error.message().starts_with("JSON codec failure"));
        assert!(error.source().is_some());
    }

    #[rstest]
    fn message_limit_is_reported() {
        let error = TransportError::MessageTooLarge {
            size: 10,
            limit: 4,
        };

        assert_eq!(error.to_string(), "message of 10 bytes exceeds the 4 byte limit");
    }
}
