//! Outbound side of a connection.

use std::sync::Arc;

use lsp_types::notification::{Exit, Initialized, Notification as LspNotification};
use lsp_types::request::{Initialize, Request as LspRequest, Shutdown};
use lsp_types::{GotoDefinitionParams, InitializeParams, InitializeResult, InitializedParams};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use switchyard_protocol::methods::{self, CANCEL_REQUEST, PROGRESS};
use switchyard_protocol::{
    CancelParams, CorrelationId, Definition, Message, Notification, ProgressParams, ProgressToken,
    Request,
};
use tracing::debug;

use crate::correlator::{CORRELATOR_TARGET, Correlator, PendingResponse};
use crate::errors::{CallError, CodecError};
use crate::transport::Outbox;

/// Handle for sending requests and notifications to the remote party.
///
/// Clones share the connection. Blocking calls must not be made from a
/// notification handler: notifications run on the reader thread, which is
/// also the thread that delivers responses.
#[derive(Clone)]
pub struct Peer {
    outbox: Arc<Outbox>,
    correlator: Arc<Correlator>,
}

fn to_params<P: Serialize>(params: &P) -> Result<Option<Value>, CodecError> {
    match serde_json::to_value(params)? {
        Value::Null => Ok(None),
        value => Ok(Some(value)),
    }
}

impl Peer {
    pub(crate) fn new(outbox: Arc<Outbox>, correlator: Arc<Correlator>) -> Self {
        Self { outbox, correlator }
    }

    /// Sends a request and returns its waiter without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::ConnectionClosed`] once the connection has shut
    /// down, or the codec/transport failure that prevented sending.
    pub fn start_request(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<PendingResponse, CallError> {
        if self.correlator.is_closed() {
            return Err(CallError::ConnectionClosed);
        }
        let pending = self.correlator.issue(method);
        let request = Request::new(pending.id().clone(), method, params);
        if let Err(error) = self.outbox.send(&Message::from(request)) {
            self.correlator.cancel(pending.id());
            return Err(error);
        }
        Ok(pending)
    }

    /// Sends a request and blocks for its result.
    ///
    /// # Errors
    ///
    /// See [`start_request`](Self::start_request) and
    /// [`PendingResponse::wait`].
    pub fn request(&self, method: &str, params: Option<Value>) -> Result<Value, CallError> {
        self.start_request(method, params)?.wait()
    }

    /// Sends a request with typed parameters and decodes the typed result.
    ///
    /// # Errors
    ///
    /// As [`request`](Self::request), plus [`CallError::Codec`] when the
    /// parameters or result do not convert.
    pub fn call<P, R>(&self, method: &str, params: &P) -> Result<R, CallError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let value = self.request(method, to_params(params)?)?;
        serde_json::from_value(value).map_err(|error| CallError::Codec(error.into()))
    }

    /// Sends an `lsp_types` request.
    ///
    /// # Errors
    ///
    /// As [`call`](Self::call).
    pub fn send_request<R: LspRequest>(&self, params: R::Params) -> Result<R::Result, CallError> {
        self.call(R::METHOD, &params)
    }

    /// Sends a notification.
    ///
    /// # Errors
    ///
    /// Returns the codec or transport failure that prevented sending.
    pub fn notify(&self, method: &str, params: Option<Value>) -> Result<(), CallError> {
        self.outbox
            .send(&Message::from(Notification::new(method, params)))
    }

    /// Sends an `lsp_types` notification.
    ///
    /// # Errors
    ///
    /// As [`notify`](Self::notify).
    pub fn send_notification<N: LspNotification>(&self, params: N::Params) -> Result<(), CallError> {
        self.notify(N::METHOD, to_params(&params)?)
    }

    /// Abandons an outstanding request.
    ///
    /// The local waiter resolves with [`CallError::Cancelled`]. The peer is
    /// told through `$/cancelRequest` unless the method is one that cannot be
    /// cancelled. Returns `false` when nothing was pending under `id`.
    ///
    /// # Errors
    ///
    /// Returns the failure that prevented sending `$/cancelRequest`.
    pub fn cancel(&self, id: &CorrelationId) -> Result<bool, CallError> {
        let Some(method) = self.correlator.cancel(id) else {
            return Ok(false);
        };
        let cancellable = methods::lookup(&method).is_none_or(|descriptor| descriptor.is_cancellable());
        if cancellable {
            let params = to_params(&CancelParams { id: id.clone() })?;
            self.notify(CANCEL_REQUEST, params)?;
        } else {
            debug!(
                target: CORRELATOR_TARGET,
                id = %id,
                method = %method,
                "not announcing cancellation"
            );
        }
        Ok(true)
    }

    /// Reports progress for `token`.
    ///
    /// # Errors
    ///
    /// As [`notify`](Self::notify).
    pub fn progress(&self, token: ProgressToken, value: Value) -> Result<(), CallError> {
        let params = to_params(&ProgressParams { token, value })?;
        self.notify(PROGRESS, params)
    }

    /// Runs the client half of the handshake: `initialize`, then
    /// `initialized`.
    ///
    /// # Errors
    ///
    /// Returns the server's error object or any failure sending either
    /// message.
    pub fn initialize(&self, params: InitializeParams) -> Result<InitializeResult, CallError> {
        let result = self.send_request::<Initialize>(params)?;
        self.send_notification::<Initialized>(InitializedParams {})?;
        Ok(result)
    }

    /// `textDocument/definition`, decoding the location union.
    ///
    /// # Errors
    ///
    /// As [`call`](Self::call).
    pub fn definition(&self, params: &GotoDefinitionParams) -> Result<Option<Definition>, CallError> {
        self.call("textDocument/definition", params)
    }

    /// Sends `shutdown` and waits for the acknowledgement.
    ///
    /// # Errors
    ///
    /// As [`call`](Self::call).
    pub fn shutdown(&self) -> Result<(), CallError> {
        self.send_request::<Shutdown>(())
    }

    /// Sends `exit`.
    ///
    /// # Errors
    ///
    /// As [`notify`](Self::notify).
    pub fn exit(&self) -> Result<(), CallError> {
        self.send_notification::<Exit>(())
    }

    /// Number of requests awaiting a response.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.correlator.pending_len()
    }
}
