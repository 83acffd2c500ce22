//! Per-message dispatch context.

use switchyard_protocol::CorrelationId;

use crate::cancel::CancellationToken;

/// What a handler knows about the message it is processing.
#[derive(Debug, Clone)]
pub struct RequestContext {
    id: Option<CorrelationId>,
    method: String,
    token: CancellationToken,
}

impl RequestContext {
    /// Builds a context. `id` is `None` for notifications.
    #[must_use]
    pub fn new(id: Option<CorrelationId>, method: impl Into<String>, token: CancellationToken) -> Self {
        Self {
            id,
            method: method.into(),
            token,
        }
    }

    /// Request id, when the message is a request.
    #[must_use]
    pub fn id(&self) -> Option<&CorrelationId> {
        self.id.as_ref()
    }

    /// Method being dispatched.
    #[must_use]
    pub fn method(&self) -> &str {
        self.method.as_str()
    }

    /// Token signalled when the peer or the connection abandons the message.
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Shorthand for `self.token().is_cancelled()`.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
