//! Structured error objects carried in response envelopes.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

/// Integer error codes defined by JSON-RPC and the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Invalid JSON was received.
    ParseError,
    /// The JSON sent is not a valid request object.
    InvalidRequest,
    /// The method does not exist or is not available.
    MethodNotFound,
    /// Invalid method parameters.
    InvalidParams,
    /// Internal JSON-RPC error.
    InternalError,
    /// A request arrived before the initialize handshake completed.
    ServerNotInitialized,
    /// Reserved catch-all code.
    UnknownErrorCode,
    /// A syntactically valid request failed for semantic reasons.
    RequestFailed,
    /// The server cancelled the request.
    ServerCancelled,
    /// Document content changed while the request was processed.
    ContentModified,
    /// The client cancelled the request.
    RequestCancelled,
    /// Any code this crate does not name.
    Other(i64),
}

impl ErrorCode {
    /// Returns the integer value sent on the wire.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::ServerNotInitialized => -32002,
            Self::UnknownErrorCode => -32001,
            Self::RequestFailed => -32803,
            Self::ServerCancelled => -32802,
            Self::ContentModified => -32801,
            Self::RequestCancelled => -32800,
            Self::Other(code) => code,
        }
    }

    /// Maps a wire integer back to a code.
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            -32700 => Self::ParseError,
            -32600 => Self::InvalidRequest,
            -32601 => Self::MethodNotFound,
            -32602 => Self::InvalidParams,
            -32603 => Self::InternalError,
            -32002 => Self::ServerNotInitialized,
            -32001 => Self::UnknownErrorCode,
            -32803 => Self::RequestFailed,
            -32802 => Self::ServerCancelled,
            -32801 => Self::ContentModified,
            -32800 => Self::RequestCancelled,
            other => Self::Other(other),
        }
    }

    /// Whether the code reports an abandoned request rather than a failure.
    #[must_use]
    pub const fn is_cancellation(self) -> bool {
        matches!(self, Self::RequestCancelled | Self::ServerCancelled)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.code())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.code())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i64::deserialize(deserializer).map(Self::from_code)
    }
}

/// Error object returned in place of a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{message} (code: {code})")]
pub struct ResponseError {
    /// Error classification.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Optional structured detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ResponseError {
    /// Builds an error with the given code and message.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attaches structured detail.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// The envelope could not be decoded.
    #[must_use]
    pub fn parse_error(detail: impl fmt::Display) -> Self {
        Self::new(ErrorCode::ParseError, format!("parse error: {detail}"))
    }

    /// The envelope is not a valid request.
    #[must_use]
    pub fn invalid_request(detail: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InvalidRequest, format!("invalid request: {detail}"))
    }

    /// No handler exists for `method`.
    #[must_use]
    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            ErrorCode::MethodNotFound,
            format!("method not found: {method}"),
        )
    }

    /// Parameters were rejected by the handler.
    #[must_use]
    pub fn invalid_params(detail: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InvalidParams, format!("invalid params: {detail}"))
    }

    /// The handler failed unexpectedly.
    #[must_use]
    pub fn internal(detail: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, format!("internal error: {detail}"))
    }

    /// `method` arrived before initialization completed.
    #[must_use]
    pub fn not_initialized(method: &str) -> Self {
        Self::new(
            ErrorCode::ServerNotInitialized,
            format!("server not initialized: {method} requires a completed initialize handshake"),
        )
    }

    /// The request was cancelled before it completed.
    #[must_use]
    pub fn request_cancelled() -> Self {
        Self::new(ErrorCode::RequestCancelled, "request cancelled")
    }

    /// The request failed for a semantic reason.
    #[must_use]
    pub fn request_failed(detail: impl fmt::Display) -> Self {
        Self::new(ErrorCode::RequestFailed, detail.to_string())
    }

    /// Whether this error reports cancellation.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        self.code.is_cancellation()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case(ErrorCode::ParseError, -32700)]
    #[case(ErrorCode::InvalidRequest, -32600)]
    #[case(ErrorCode::MethodNotFound, -32601)]
    #[case(ErrorCode::InvalidParams, -32602)]
    #[case(ErrorCode::InternalError, -32603)]
    #[case(ErrorCode::ServerNotInitialized, -32002)]
    #[case(ErrorCode::UnknownErrorCode, -32001)]
    #[case(ErrorCode::RequestFailed, -32803)]
    #[case(ErrorCode::ServerCancelled, -32802)]
    #[case(ErrorCode::ContentModified, -32801)]
    #[case(ErrorCode::RequestCancelled, -32800)]
    #[case(ErrorCode::Other(-1), -1)]
    fn codes_map_both_ways(#[case] code: ErrorCode, #[case] wire: i64) {
        assert_eq!(code.code(), wire);
        assert_eq!(ErrorCode::from_code(wire), code);
    }

    #[rstest]
    fn serialises_without_absent_data() {
        let error = ResponseError::method_not_found("doesNotExist");
        let json = serde_json::to_value(&error).expect("serialization failed");

        assert_eq!(
            json,
            json!({"code": -32601, "message": "method not found: doesNotExist"})
        );
    }

    #[rstest]
    fn deserialises_error_with_data() {
        let json = json!({"code": -32602, "message": "Invalid params", "data": {"field": "uri"}});
        let error: ResponseError = serde_json::from_value(json).expect("parse failed");

        assert_eq!(error.code, ErrorCode::InvalidParams);
        assert_eq!(error.data, Some(json!({"field": "uri"})));
    }

    #[rstest]
    fn distinguishes_cancellation() {
        assert!(ResponseError::request_cancelled().is_cancellation());
        assert!(ErrorCode::ServerCancelled.is_cancellation());
        assert!(!ResponseError::internal("boom").is_cancellation());
    }
}
