//! Runtime configuration for dispatchers and connections.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::errors::CodecError;

/// Default upper bound for one encoded envelope.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 64 * 1024 * 1024;

/// Converts envelopes between JSON values and transport bytes.
pub trait PayloadCodec: Send + Sync + fmt::Debug {
    /// Encodes one envelope.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] when the value cannot be represented.
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError>;

    /// Decodes one envelope.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] when the bytes are not a valid payload.
    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError>;
}

/// UTF-8 JSON payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl PayloadCodec for JsonCodec {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(CodecError::from)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        serde_json::from_slice(bytes).map_err(CodecError::from)
    }
}

/// How strictly the server enforces the initialize handshake.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum InitializeGate {
    /// Reject requests and drop notifications until `initialize` succeeds.
    #[default]
    Strict,
    /// Route everything regardless of lifecycle state.
    Permissive,
}

/// Errors encountered while parsing an [`InitializeGate`] from text.
pub type InitializeGateParseError = strum::ParseError;

/// Settings shared by every dispatch on one side of a connection.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    codec: Arc<dyn PayloadCodec>,
    initialize_gate: InitializeGate,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            codec: Arc::new(JsonCodec),
            initialize_gate: InitializeGate::default(),
        }
    }
}

impl DispatcherConfig {
    /// Replaces the payload codec.
    #[must_use]
    pub fn with_codec(mut self, codec: impl PayloadCodec + 'static) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    /// Sets the initialize gate.
    #[must_use]
    pub fn with_initialize_gate(mut self, gate: InitializeGate) -> Self {
        self.initialize_gate = gate;
        self
    }

    /// Codec used for every envelope.
    #[must_use]
    pub fn codec(&self) -> &Arc<dyn PayloadCodec> {
        &self.codec
    }

    /// Configured initialize gate.
    #[must_use]
    pub fn initialize_gate(&self) -> InitializeGate {
        self.initialize_gate
    }
}

/// Settings for a [`Connection`](crate::Connection).
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    max_message_bytes: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

impl ConnectionConfig {
    /// Caps the size of a single envelope in either direction.
    #[must_use]
    pub fn with_max_message_bytes(mut self, limit: usize) -> Self {
        self.max_message_bytes = limit;
        self
    }

    /// Largest envelope accepted or sent, in bytes.
    #[must_use]
    pub fn max_message_bytes(&self) -> usize {
        self.max_message_bytes
    }
}
