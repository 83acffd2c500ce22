//! Matches inbound responses to outstanding outbound requests.
//!
//! Every outbound request gets a fresh integer id and a single-use channel.
//! Each pending call is resolved exactly once: by its response, by a local
//! or connection-wide cancel, or by the connection closing. Resolution removes the entry, so a
//! late or duplicate response finds nothing and is dropped.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value;
use switchyard_protocol::{CorrelationId, ResponseError};
use tracing::debug;

use crate::errors::CallError;

/// Log target for correlator events.
pub(crate) const CORRELATOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::correlator");

type Outcome = Result<Value, CallError>;

#[derive(Debug)]
struct PendingCall {
    method: String,
    sink: SyncSender<Outcome>,
}

#[derive(Debug)]
struct State {
    next_id: i32,
    pending: HashMap<CorrelationId, PendingCall>,
    closed: bool,
}

impl State {
    fn allocate_id(&mut self) -> CorrelationId {
        loop {
            let candidate = CorrelationId::Number(self.next_id);
            self.next_id = self.next_id.checked_add(1).unwrap_or(1);
            if !self.pending.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}

/// Table of outstanding outbound requests.
#[derive(Debug)]
pub struct Correlator {
    state: Mutex<State>,
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}

impl Correlator {
    /// Creates an empty correlator. The first issued id is `1`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 1,
                pending: HashMap::new(),
                closed: false,
            }),
        }
    }

    fn with_state<R>(&self, action: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        action(&mut state)
    }

    /// Registers a new outbound call for `method`.
    ///
    /// After [`close`](Self::close) the returned waiter resolves immediately
    /// with [`CallError::ConnectionClosed`].
    #[must_use]
    pub fn issue(&self, method: &str) -> PendingResponse {
        let (sink, receiver) = mpsc::sync_channel(1);
        let id = self.with_state(|state| {
            let id = state.allocate_id();
            if !state.closed {
                state.pending.insert(
                    id.clone(),
                    PendingCall {
                        method: method.to_owned(),
                        sink,
                    },
                );
            }
            id
        });
        PendingResponse {
            id,
            method: method.to_owned(),
            receiver,
        }
    }

    /// Delivers a response to the waiter registered under `id`.
    ///
    /// Returns whether a waiter received it. Unknown ids, including ids that
    /// were already resolved, are logged and ignored.
    pub fn resolve(&self, id: &CorrelationId, outcome: Result<Value, ResponseError>) -> bool {
        let Some(call) = self.with_state(|state| state.pending.remove(id)) else {
            debug!(
                target: CORRELATOR_TARGET,
                id = %id,
                "dropping response for unknown request"
            );
            return false;
        };

        debug!(
            target: CORRELATOR_TARGET,
            id = %id,
            method = %call.method,
            success = outcome.is_ok(),
            "resolving request"
        );
        call.sink.send(outcome.map_err(CallError::Response)).is_ok()
    }

    /// Abandons the call registered under `id`.
    ///
    /// The waiter resolves with [`CallError::Cancelled`]; a response arriving
    /// later is dropped. Returns the method of the cancelled call, or `None`
    /// when nothing was pending under `id`.
    pub fn cancel(&self, id: &CorrelationId) -> Option<String> {
        let call = self.with_state(|state| state.pending.remove(id))?;
        debug!(
            target: CORRELATOR_TARGET,
            id = %id,
            method = %call.method,
            "cancelling request"
        );
        if call.sink.send(Err(CallError::Cancelled { id: id.clone() })).is_err() {
            debug!(target: CORRELATOR_TARGET, id = %id, "waiter already dropped");
        }
        Some(call.method)
    }

    /// Resolves every outstanding call with [`CallError::ConnectionClosed`].
    ///
    /// Returns the number of calls that were still pending.
    pub fn close(&self) -> usize {
        self.drain(|_| CallError::ConnectionClosed)
    }

    /// Resolves every outstanding call with [`CallError::Cancelled`] and
    /// stops accepting new calls.
    ///
    /// Returns the number of calls that were still pending.
    pub fn cancel_all(&self) -> usize {
        self.drain(|id| CallError::Cancelled { id: id.clone() })
    }

    fn drain(&self, reason: impl Fn(&CorrelationId) -> CallError) -> usize {
        let drained: Vec<_> = self.with_state(|state| {
            state.closed = true;
            state.pending.drain().collect()
        });
        let count = drained.len();
        for (id, call) in drained {
            let error = reason(&id);
            debug!(
                target: CORRELATOR_TARGET,
                id = %id,
                method = %call.method,
                error = %error,
                "abandoning pending request"
            );
            if call.sink.send(Err(error)).is_err() {
                debug!(target: CORRELATOR_TARGET, id = %id, "waiter already dropped");
            }
        }
        count
    }

    /// Number of calls awaiting a response.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.with_state(|state| state.pending.len())
    }

    /// Whether [`close`](Self::close) or [`cancel_all`](Self::cancel_all)
    /// has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.with_state(|state| state.closed)
    }
}

/// Waiter for one outbound call.
#[derive(Debug)]
pub struct PendingResponse {
    id: CorrelationId,
    method: String,
    receiver: Receiver<Outcome>,
}

impl PendingResponse {
    /// Id assigned to the call.
    #[must_use]
    pub fn id(&self) -> &CorrelationId {
        &self.id
    }

    /// Method of the call.
    #[must_use]
    pub fn method(&self) -> &str {
        self.method.as_str()
    }

    /// Blocks until the call is resolved.
    ///
    /// # Errors
    ///
    /// Returns the peer's error object, [`CallError::Cancelled`] or
    /// [`CallError::ConnectionClosed`].
    pub fn wait(self) -> Result<Value, CallError> {
        self.receiver
            .recv()
            .unwrap_or_else(|_| Err(CallError::ConnectionClosed))
    }

    /// Waits at most `timeout`; `None` means the call is still pending.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<Value, CallError>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(CallError::ConnectionClosed)),
        }
    }
}
