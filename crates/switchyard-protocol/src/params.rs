//! Parameter records whose fields are union shapes owned by this crate.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::CorrelationId;
use crate::shapes::ProgressToken;

/// Parameters of `$/cancelRequest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelParams {
    /// Identifier of the request to cancel.
    pub id: CorrelationId,
}

/// Parameters of `$/progress`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressParams {
    /// Token supplied by the party that owns the progress stream.
    pub token: ProgressToken,
    /// Progress payload; its shape depends on the stream.
    pub value: Value,
}

/// Parameters of `window/workDoneProgress/create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkDoneProgressCreateParams {
    /// Token to create.
    pub token: ProgressToken,
}

/// Parameters of `window/workDoneProgress/cancel`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkDoneProgressCancelParams {
    /// Token whose progress should stop.
    pub token: ProgressToken,
}
