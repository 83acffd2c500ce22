//! JSON-RPC 2.0 envelopes.
//!
//! One JSON object per message. The presence of `method` and `id` decides the
//! kind: both means request, `method` alone means notification, and `id`
//! without `method` means response.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::errors::ResponseError;
use crate::id::CorrelationId;
use crate::union::{UnionError, UnionValue};

/// Protocol version carried by every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

/// Errors raised while classifying an envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The payload is not JSON at all.
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload is JSON but not an object.
    #[error("envelope must be a JSON object")]
    NotAnObject,

    /// The `jsonrpc` member is missing or not `"2.0"`.
    #[error("unsupported jsonrpc version: {found}")]
    UnsupportedVersion {
        /// Value found in the envelope.
        found: String,
    },

    /// The `method` member is not a string.
    #[error("method must be a string")]
    InvalidMethod,

    /// The `id` member is neither an integer nor a string.
    #[error("invalid correlation id: {0}")]
    InvalidId(#[source] UnionError),

    /// A response carries neither `result` nor `error`.
    #[error("response carries neither result nor error")]
    MissingOutcome,

    /// A successful response has no `id`.
    #[error("successful response is missing its id")]
    MissingId,

    /// The `error` member is not a valid error object.
    #[error("malformed error object: {0}")]
    InvalidError(#[source] serde_json::Error),
}

impl EnvelopeError {
    /// Whether the failure happened before any structure could be read.
    #[must_use]
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Json(_))
    }

    /// Converts the failure into the error object sent back to the peer.
    #[must_use]
    pub fn to_response_error(&self) -> ResponseError {
        if self.is_parse_error() {
            ResponseError::parse_error(self)
        } else {
            ResponseError::invalid_request(self)
        }
    }
}

/// A request expecting exactly one response.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Correlation id chosen by the sender.
    pub id: CorrelationId,
    /// Method to invoke.
    pub method: String,
    /// Optional parameters.
    pub params: Option<Value>,
}

impl Request {
    /// Creates a request.
    #[must_use]
    pub fn new(id: impl Into<CorrelationId>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            id: id.into(),
            method: method.into(),
            params,
        }
    }
}

/// A one-way message; no response is ever sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Method to invoke.
    pub method: String,
    /// Optional parameters.
    pub params: Option<Value>,
}

impl Notification {
    /// Creates a notification.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

/// Reply to a request.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Id of the request; `None` when the request id could not be read.
    pub id: Option<CorrelationId>,
    /// Result on success, error object on failure.
    pub outcome: Result<Value, ResponseError>,
}

impl Response {
    /// Builds a successful response.
    #[must_use]
    pub fn success(id: CorrelationId, result: Value) -> Self {
        Self {
            id: Some(id),
            outcome: Ok(result),
        }
    }

    /// Builds an error response.
    #[must_use]
    pub fn failure(id: Option<CorrelationId>, error: ResponseError) -> Self {
        Self {
            id,
            outcome: Err(error),
        }
    }

    /// Returns the result, when the response succeeded.
    #[must_use]
    pub fn result(&self) -> Option<&Value> {
        self.outcome.as_ref().ok()
    }

    /// Returns the error object, when the response failed.
    #[must_use]
    pub fn error(&self) -> Option<&ResponseError> {
        self.outcome.as_ref().err()
    }
}

/// Any envelope exchanged on a connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A request.
    Request(Request),
    /// A notification.
    Notification(Notification),
    /// A response.
    Response(Response),
}

impl Message {
    /// Parses and classifies an envelope from raw JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Json`] for invalid JSON and the structural
    /// variants for well-formed JSON that is not a valid envelope.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_value(value)
    }

    /// Classifies an already-decoded JSON value.
    ///
    /// # Errors
    ///
    /// Returns a structural [`EnvelopeError`] when the value is not a valid
    /// JSON-RPC 2.0 envelope.
    pub fn from_value(value: Value) -> Result<Self, EnvelopeError> {
        let Value::Object(mut object) = value else {
            return Err(EnvelopeError::NotAnObject);
        };

        match object.remove("jsonrpc") {
            Some(Value::String(version)) if version == JSONRPC_VERSION => {}
            Some(other) => {
                return Err(EnvelopeError::UnsupportedVersion {
                    found: other.to_string(),
                });
            }
            None => {
                return Err(EnvelopeError::UnsupportedVersion {
                    found: String::from("<missing>"),
                });
            }
        }

        let id = match object.remove("id") {
            None | Some(Value::Null) => None,
            Some(raw) => Some(CorrelationId::decode(&raw).map_err(EnvelopeError::InvalidId)?),
        };
        let method = match object.remove("method") {
            None => None,
            Some(Value::String(method)) => Some(method),
            Some(_) => return Err(EnvelopeError::InvalidMethod),
        };
        let params = object.remove("params").filter(|params| !params.is_null());

        match (method, id) {
            (Some(method), Some(id)) => Ok(Self::Request(Request { id, method, params })),
            (Some(method), None) => Ok(Self::Notification(Notification { method, params })),
            (None, id) => Self::response_from_members(id, &mut object),
        }
    }

    fn response_from_members(
        id: Option<CorrelationId>,
        object: &mut Map<String, Value>,
    ) -> Result<Self, EnvelopeError> {
        let error = object.remove("error").filter(|error| !error.is_null());
        let result = object.remove("result");

        let outcome = match (result, error) {
            (_, Some(error)) => {
                Err(serde_json::from_value(error).map_err(EnvelopeError::InvalidError)?)
            }
            (Some(result), None) => {
                if id.is_none() {
                    return Err(EnvelopeError::MissingId);
                }
                Ok(result)
            }
            (None, None) => return Err(EnvelopeError::MissingOutcome),
        };

        Ok(Self::Response(Response { id, outcome }))
    }

    /// Best-effort id extraction from a value that failed classification.
    ///
    /// Used to address an `InvalidRequest` reply to the right request.
    #[must_use]
    pub fn recover_id(value: &Value) -> Option<CorrelationId> {
        value
            .get("id")
            .and_then(|raw| CorrelationId::decode(raw).ok())
    }

    /// Encodes the envelope as a JSON value.
    ///
    /// # Errors
    ///
    /// Propagates the serializer failure of an id or error object.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Method name, for requests and notifications.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request(request) => Some(request.method.as_str()),
            Self::Notification(notification) => Some(notification.method.as_str()),
            Self::Response(_) => None,
        }
    }

    /// Correlation id, for requests and responses.
    #[must_use]
    pub fn id(&self) -> Option<&CorrelationId> {
        match self {
            Self::Request(request) => Some(&request.id),
            Self::Notification(_) => None,
            Self::Response(response) => response.id.as_ref(),
        }
    }
}

/// Borrowed wire form of [`Message`]; absent members are omitted, while a
/// response's unreadable id is written as `null`.
#[derive(Serialize)]
struct WireEnvelope<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Option<&'a CorrelationId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a ResponseError>,
}

impl<'a> WireEnvelope<'a> {
    const fn empty() -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: None,
            method: None,
            params: None,
            result: None,
            error: None,
        }
    }

    fn of(message: &'a Message) -> Self {
        match message {
            Message::Request(request) => Self {
                id: Some(Some(&request.id)),
                method: Some(request.method.as_str()),
                params: request.params.as_ref(),
                ..Self::empty()
            },
            Message::Notification(notification) => Self {
                method: Some(notification.method.as_str()),
                params: notification.params.as_ref(),
                ..Self::empty()
            },
            Message::Response(response) => Self {
                id: Some(response.id.as_ref()),
                result: response.outcome.as_ref().ok(),
                error: response.outcome.as_ref().err(),
                ..Self::empty()
            },
        }
    }
}

impl From<Request> for Message {
    fn from(request: Request) -> Self {
        Self::Request(request)
    }
}

impl From<Notification> for Message {
    fn from(notification: Notification) -> Self {
        Self::Notification(notification)
    }
}

impl From<Response> for Message {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireEnvelope::of(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::errors::ErrorCode;

    #[rstest]
    fn classifies_request() {
        let message =
            Message::from_value(json!({"jsonrpc":"2.0","id":1,"method":"initialize","params":{"capabilities":{}}}))
                .expect("parse failed");

        assert_eq!(
            message,
            Message::Request(Request::new(1, "initialize", Some(json!({"capabilities": {}}))))
        );
    }

    #[rstest]
    fn classifies_notification() {
        let message = Message::from_bytes(br#"{"jsonrpc":"2.0","method":"initialized","params":{}}"#)
            .expect("parse failed");

        assert_eq!(message.method(), Some("initialized"));
        assert!(message.id().is_none());
        assert!(matches!(message, Message::Notification(_)));
    }

    #[rstest]
    fn classifies_success_response_with_null_result() {
        let message =
            Message::from_value(json!({"jsonrpc":"2.0","id":"a","result":null})).expect("parse failed");

        let Message::Response(response) = message else {
            panic!("expected a response");
        };
        assert_eq!(response.id, Some(CorrelationId::from("a")));
        assert_eq!(response.result(), Some(&Value::Null));
    }

    #[rstest]
    fn classifies_error_response_without_id() {
        let message = Message::from_value(
            json!({"jsonrpc":"2.0","id":null,"error":{"code":-32700,"message":"parse error"}}),
        )
        .expect("parse failed");

        let Message::Response(response) = message else {
            panic!("expected a response");
        };
        assert!(response.id.is_none());
        assert_eq!(
            response.error().map(|error| error.code),
            Some(ErrorCode::ParseError)
        );
    }

    #[rstest]
    #[case(json!([1, 2]), "envelope must be a JSON object")]
    #[case(json!({"id": 1, "method": "x"}), "unsupported jsonrpc version: <missing>")]
    #[case(json!({"jsonrpc": "1.0", "id": 1, "method": "x"}), "unsupported jsonrpc version: \"1.0\"")]
    #[case(json!({"jsonrpc": "2.0", "id": 1, "method": 5}), "method must be a string")]
    #[case(json!({"jsonrpc": "2.0", "id": 1}), "response carries neither result nor error")]
    #[case(json!({"jsonrpc": "2.0", "result": 1}), "successful response is missing its id")]
    fn rejects_malformed_envelopes(#[case] value: Value, #[case] expected: &str) {
        let error = Message::from_value(value).expect_err("envelope should be rejected");

        assert_eq!(error.to_string(), expected);
        assert!(!error.is_parse_error());
        assert_eq!(error.to_response_error().code, ErrorCode::InvalidRequest);
    }

    #[rstest]
    fn invalid_json_is_a_parse_error() {
        let error = Message::from_bytes(b"{not json").expect_err("invalid JSON");

        assert!(error.is_parse_error());
        assert_eq!(error.to_response_error().code, ErrorCode::ParseError);
    }

    #[rstest]
    fn recovers_id_from_rejected_envelope() {
        let value = json!({"jsonrpc": "1.0", "id": 9, "method": "x"});

        assert_eq!(Message::recover_id(&value), Some(CorrelationId::Number(9)));
    }

    #[rstest]
    fn serialises_request_without_params() {
        let json = Message::from(Request::new(42, "shutdown", None))
            .to_value()
            .expect("serialization failed");

        assert_eq!(json, json!({"jsonrpc": "2.0", "id": 42, "method": "shutdown"}));
    }

    #[rstest]
    fn serialises_error_response() {
        let response = Response::failure(
            Some(CorrelationId::Number(2)),
            ResponseError::method_not_found("doesNotExist"),
        );
        let json = serde_json::to_value(Message::from(response)).expect("serialization failed");

        assert_eq!(
            json,
            json!({
                "jsonrpc": "2.0",
                "id": 2,
                "error": {"code": -32601, "message": "method not found: doesNotExist"}
            })
        );
    }

    #[rstest]
    fn serialises_null_result_explicitly() {
        let json = Message::from(Response::success(CorrelationId::Number(5), Value::Null))
            .to_value()
            .expect("serialization failed");

        assert_eq!(json, json!({"jsonrpc": "2.0", "id": 5, "result": null}));
    }

    #[rstest]
    fn serialises_unaddressed_error_with_null_id_and_data() {
        let error = ResponseError::parse_error("unexpected end of input").with_data(json!({"offset": 3}));
        let json = Message::from(Response::failure(None, error))
            .to_value()
            .expect("serialization failed");

        assert_eq!(json["id"], Value::Null);
        assert_eq!(json["error"]["code"], json!(-32700));
        assert_eq!(json["error"]["data"], json!({"offset": 3}));
        assert!(json.get("result").is_none());
    }

    #[rstest]
    fn serialises_string_ids_and_params() {
        let message = Message::from(Request::new("req-7", "textDocument/hover", Some(json!({"a": 1}))));
        let json = message.to_value().expect("serialization failed");

        assert_eq!(
            json,
            json!({"jsonrpc": "2.0", "id": "req-7", "method": "textDocument/hover", "params": {"a": 1}})
        );
        assert_eq!(Message::from_value(json).expect("parse failed"), message);
    }
}
