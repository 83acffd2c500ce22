//! Initialize/shutdown state machine and the gate enforcing it.
//!
//! ```text
//! Uninitialized -> Initializing -> Initialized -> ShutDown -> Exited
//! ```
//!
//! The gate sits first in a server's dispatch chain and wraps the typed
//! router so it can observe the `initialize` reply.

use std::sync::{Arc, Mutex, PoisonError};

use lsp_types::{ClientCapabilities, InitializeResult, ServerCapabilities, ServerInfo};
use once_cell::sync::OnceCell;
use strum::Display;
use switchyard_protocol::methods::{CANCEL_REQUEST, EXIT, INITIALIZE, PROGRESS, SHUTDOWN};
use switchyard_protocol::{Notification, Request, ResponseError};
use tracing::{debug, info, warn};

use crate::chain::{Dispatch, Handler, Incoming};
use crate::config::InitializeGate;
use crate::context::RequestContext;

/// Log target for lifecycle events.
pub(crate) const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// Server lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum LifecycleState {
    /// No `initialize` request seen yet.
    #[default]
    Uninitialized,
    /// The `initialize` handler is running.
    Initializing,
    /// The handshake succeeded; every method is routed.
    Initialized,
    /// `shutdown` succeeded; only `exit` remains meaningful.
    ShutDown,
    /// `exit` arrived.
    Exited,
}

impl LifecycleState {
    const fn is_before_initialized(self) -> bool {
        matches!(self, Self::Uninitialized | Self::Initializing)
    }

    const fn is_shutting_down(self) -> bool {
        matches!(self, Self::ShutDown | Self::Exited)
    }
}

/// Capabilities exchanged during a successful handshake.
#[derive(Debug, Clone)]
pub struct Negotiated {
    /// What the client announced.
    pub client: ClientCapabilities,
    /// What the server answered.
    pub server: ServerCapabilities,
    /// Server name and version, when provided.
    pub server_info: Option<ServerInfo>,
}

/// Lifecycle of one server connection.
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: Mutex<LifecycleState>,
    negotiated: OnceCell<Negotiated>,
    exit_code: OnceCell<i32>,
}

impl Lifecycle {
    /// Creates an uninitialized lifecycle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, action: impl FnOnce(&mut LifecycleState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        action(&mut state)
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.with_state(|state| *state)
    }

    /// Capabilities recorded by the handshake.
    #[must_use]
    pub fn negotiated(&self) -> Option<&Negotiated> {
        self.negotiated.get()
    }

    /// Process exit code implied by the shutdown sequence: `0` when `exit`
    /// followed a successful `shutdown`, `1` otherwise. `None` before `exit`.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code.get().copied()
    }

    /// Whether `exit` has been received.
    #[must_use]
    pub fn is_exited(&self) -> bool {
        self.state() == LifecycleState::Exited
    }

    fn transition(&self, from: &[LifecycleState], to: LifecycleState) -> bool {
        self.with_state(|state| {
            if from.contains(state) {
                debug!(
                    target: LIFECYCLE_TARGET,
                    from = %state,
                    to = %to,
                    "lifecycle transition"
                );
                *state = to;
                true
            } else {
                false
            }
        })
    }

    fn begin_initialize(&self) -> bool {
        self.transition(&[LifecycleState::Uninitialized], LifecycleState::Initializing)
    }

    fn complete_initialize(&self, client: ClientCapabilities, result: InitializeResult) {
        let negotiated = Negotiated {
            client,
            server: result.capabilities,
            server_info: result.server_info,
        };
        if self.negotiated.set(negotiated).is_err() {
            warn!(target: LIFECYCLE_TARGET, "capabilities were already negotiated");
        }
        self.transition(&[LifecycleState::Initializing], LifecycleState::Initialized);
    }

    fn abort_initialize(&self) {
        self.transition(&[LifecycleState::Initializing], LifecycleState::Uninitialized);
    }

    fn shut_down(&self) {
        self.transition(
            &[
                LifecycleState::Uninitialized,
                LifecycleState::Initializing,
                LifecycleState::Initialized,
            ],
            LifecycleState::ShutDown,
        );
    }

    fn exit(&self) -> i32 {
        let code = self.with_state(|state| {
            let code = i32::from(*state != LifecycleState::ShutDown);
            *state = LifecycleState::Exited;
            code
        });
        if self.exit_code.set(code).is_err() {
            debug!(target: LIFECYCLE_TARGET, "exit received more than once");
        }
        self.exit_code().unwrap_or(code)
    }
}

/// Handler that enforces the lifecycle around an inner handler.
///
/// With [`InitializeGate::Strict`], requests before a successful `initialize`
/// get `ServerNotInitialized` and notifications other than `exit`,
/// `$/cancelRequest` and `$/progress` are dropped. A second `initialize`
/// and any request after `shutdown` get `InvalidRequest` in both modes.
pub struct LifecycleGate<H> {
    lifecycle: Arc<Lifecycle>,
    inner: H,
    mode: InitializeGate,
}

impl<H: Handler> LifecycleGate<H> {
    /// Wraps `inner`, recording state in `lifecycle`.
    #[must_use]
    pub fn new(lifecycle: Arc<Lifecycle>, inner: H, mode: InitializeGate) -> Self {
        Self {
            lifecycle,
            inner,
            mode,
        }
    }

    /// Shared lifecycle.
    #[must_use]
    pub fn lifecycle(&self) -> &Arc<Lifecycle> {
        &self.lifecycle
    }

    fn is_open(&self, state: LifecycleState) -> bool {
        match state {
            LifecycleState::Initialized => true,
            LifecycleState::Uninitialized | LifecycleState::Initializing => {
                self.mode == InitializeGate::Permissive
            }
            LifecycleState::ShutDown | LifecycleState::Exited => false,
        }
    }

    fn gate_request(&self, context: &RequestContext, incoming: &Incoming, request: &Request) -> Dispatch {
        if request.method == INITIALIZE {
            return self.initialize(context, incoming, request);
        }

        let state = self.lifecycle.state();
        if state.is_shutting_down() {
            debug!(
                target: LIFECYCLE_TARGET,
                method = %request.method,
                state = %state,
                "rejecting request after shutdown"
            );
            return Dispatch::Replied(incoming.reply_with(ResponseError::invalid_request(format!(
                "{} received after shutdown",
                request.method
            ))));
        }
        if !self.is_open(state) {
            debug!(
                target: LIFECYCLE_TARGET,
                method = %request.method,
                "rejecting request before initialize"
            );
            return Dispatch::Replied(
                incoming.reply_with(ResponseError::not_initialized(&request.method)),
            );
        }

        let outcome = self.inner.handle(context, incoming);
        if request.method == SHUTDOWN && outcome.succeeded() {
            self.lifecycle.shut_down();
        }
        outcome
    }

    fn initialize(&self, context: &RequestContext, incoming: &Incoming, request: &Request) -> Dispatch {
        if !self.lifecycle.begin_initialize() {
            warn!(
                target: LIFECYCLE_TARGET,
                state = %self.lifecycle.state(),
                "rejecting repeated initialize"
            );
            return Dispatch::Replied(
                incoming.reply_with(ResponseError::invalid_request("initialize may only be sent once")),
            );
        }

        let client = request
            .params
            .as_ref()
            .and_then(|params| params.get("capabilities"))
            .and_then(|capabilities| serde_json::from_value(capabilities.clone()).ok())
            .unwrap_or_default();

        let outcome = self.inner.handle(context, incoming);
        let accepted = outcome
            .response()
            .and_then(|response| response.result())
            .and_then(|result| serde_json::from_value::<InitializeResult>(result.clone()).ok());

        if let Some(result) = accepted {
            info!(
                target: LIFECYCLE_TARGET,
                server = ?result.server_info.as_ref().map(|info| info.name.as_str()),
                "initialize handshake accepted"
            );
            self.lifecycle.complete_initialize(client, result);
        } else {
            warn!(target: LIFECYCLE_TARGET, "initialize did not succeed");
            self.lifecycle.abort_initialize();
        }
        outcome
    }

    fn gate_notification(
        &self,
        context: &RequestContext,
        incoming: &Incoming,
        notification: &Notification,
    ) -> Dispatch {
        match notification.method.as_str() {
            EXIT => {
                let code = self.lifecycle.exit();
                info!(target: LIFECYCLE_TARGET, code, "exit received");
                consume(self.inner.handle(context, incoming))
            }
            CANCEL_REQUEST | PROGRESS => self.inner.handle(context, incoming),
            method => {
                let state = self.lifecycle.state();
                if self.is_open(state) {
                    self.inner.handle(context, incoming)
                } else {
                    debug!(
                        target: LIFECYCLE_TARGET,
                        method,
                        state = %state,
                        "dropping notification outside the initialized state"
                    );
                    Dispatch::Replied(None)
                }
            }
        }
    }
}

/// Marks a notification claimed even when the inner handler has no route.
fn consume(outcome: Dispatch) -> Dispatch {
    if outcome.is_handled() {
        outcome
    } else {
        Dispatch::Replied(None)
    }
}

impl<H: Handler> Handler for LifecycleGate<H> {
    fn handle(&self, context: &RequestContext, incoming: &Incoming) -> Dispatch {
        match incoming {
            Incoming::Request(request) => self.gate_request(context, incoming, request),
            Incoming::Notification(notification) => {
                self.gate_notification(context, incoming, notification)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};
    use serde_json::{Value, json};
    use switchyard_protocol::{CorrelationId, ErrorCode, Response};

    use super::*;
    use crate::cancel::CancellationToken;

    struct Stub;

    impl Handler for Stub {
        fn handle(&self, _context: &RequestContext, incoming: &Incoming) -> Dispatch {
            let result = match incoming.method() {
                INITIALIZE => json!({"capabilities": {"hoverProvider": true}, "serverInfo": {"name": "stub"}}),
                _ => Value::Null,
            };
            Dispatch::Replied(
                incoming
                    .id()
                    .map(|id| Response::success(id.clone(), result)),
            )
        }
    }

    #[fixture]
    fn strict() -> LifecycleGate<Stub> {
        LifecycleGate::new(Arc::new(Lifecycle::new()), Stub, InitializeGate::Strict)
    }

    fn send(gate: &LifecycleGate<Stub>, incoming: &Incoming) -> Dispatch {
        let context = RequestContext::new(
            incoming.id().cloned(),
            incoming.method(),
            CancellationToken::new(),
        );
        gate.handle(&context, incoming)
    }

    fn request(id: i32, method: &str, params: Option<Value>) -> Incoming {
        Incoming::from(Request::new(id, method, params))
    }

    fn error_code(outcome: &Dispatch) -> Option<ErrorCode> {
        outcome
            .response()
            .and_then(Response::error)
            .map(|error| error.code)
    }

    #[rstest]
    fn strict_gate_rejects_requests_before_initialize(strict: LifecycleGate<Stub>) {
        let outcome = send(&strict, &request(1, "textDocument/hover", None));

        assert_eq!(error_code(&outcome), Some(ErrorCode::ServerNotInitialized));
        assert_eq!(
            outcome.response().and_then(|response| response.id.clone()),
            Some(CorrelationId::Number(1))
        );
    }

    #[rstest]
    fn strict_gate_drops_early_notifications(strict: LifecycleGate<Stub>) {
        let outcome = send(
            &strict,
            &Incoming::from(Notification::new("textDocument/didOpen", None)),
        );

        assert_eq!(outcome, Dispatch::Replied(None));
    }

    #[rstest]
    fn permissive_gate_routes_early_requests() {
        let gate = LifecycleGate::new(Arc::new(Lifecycle::new()), Stub, InitializeGate::Permissive);

        let outcome = send(&gate, &request(1, "textDocument/hover", None));

        assert!(outcome.succeeded());
    }

    #[rstest]
    fn initialize_records_negotiated_capabilities(strict: LifecycleGate<Stub>) {
        let params = json!({"capabilities": {"workspace": {"applyEdit": true}}});

        let outcome = send(&strict, &request(1, INITIALIZE, Some(params)));

        assert!(outcome.succeeded());
        let lifecycle = strict.lifecycle();
        assert_eq!(lifecycle.state(), LifecycleState::Initialized);
        let negotiated = lifecycle.negotiated().expect("handshake recorded");
        assert!(negotiated.server.hover_provider.is_some());
        assert_eq!(
            negotiated.client.workspace.as_ref().and_then(|workspace| workspace.apply_edit),
            Some(true)
        );
        assert_eq!(
            negotiated.server_info.as_ref().map(|info| info.name.as_str()),
            Some("stub")
        );
    }

    #[rstest]
    fn second_initialize_is_invalid(strict: LifecycleGate<Stub>) {
        send(&strict, &request(1, INITIALIZE, Some(json!({"capabilities": {}}))));

        let outcome = send(&strict, &request(2, INITIALIZE, Some(json!({"capabilities": {}}))));

        assert_eq!(error_code(&outcome), Some(ErrorCode::InvalidRequest));
    }

    #[rstest]
    fn shutdown_then_exit(strict: LifecycleGate<Stub>) {
        send(&strict, &request(1, INITIALIZE, Some(json!({"capabilities": {}}))));
        assert!(send(&strict, &request(2, SHUTDOWN, None)).succeeded());

        let late = send(&strict, &request(3, "textDocument/hover", None));
        assert_eq!(error_code(&late), Some(ErrorCode::InvalidRequest));

        let exit = send(&strict, &Incoming::from(Notification::new(EXIT, None)));
        assert_eq!(exit, Dispatch::Replied(None));
        assert_eq!(strict.lifecycle().exit_code(), Some(0));
        assert!(strict.lifecycle().is_exited());
    }

    #[rstest]
    fn exit_without_shutdown_reports_failure(strict: LifecycleGate<Stub>) {
        send(&strict, &Incoming::from(Notification::new(EXIT, None)));

        assert_eq!(strict.lifecycle().exit_code(), Some(1));
    }

    #[rstest]
    #[case(CANCEL_REQUEST)]
    #[case(PROGRESS)]
    fn control_notifications_pass_before_initialize(#[case] method: &str) {
        struct Claiming;
        impl Handler for Claiming {
            fn handle(&self, _context: &RequestContext, _incoming: &Incoming) -> Dispatch {
                Dispatch::ParseError(None)
            }
        }
        let gate = LifecycleGate::new(Arc::new(Lifecycle::new()), Claiming, InitializeGate::Strict);
        let incoming = Incoming::from(Notification::new(method, None));
        let context = RequestContext::new(None, method, CancellationToken::new());

        assert_eq!(gate.handle(&context, &incoming), Dispatch::ParseError(None));
    }

    #[rstest]
    fn failed_initialize_can_be_retried() {
        struct Refusing;
        impl Handler for Refusing {
            fn handle(&self, _context: &RequestContext, incoming: &Incoming) -> Dispatch {
                Dispatch::Replied(incoming.reply_with(ResponseError::request_failed("not yet")))
            }
        }
        let gate = LifecycleGate::new(Arc::new(Lifecycle::new()), Refusing, InitializeGate::Strict);
        let context = RequestContext::new(None, INITIALIZE, CancellationToken::new());

        gate.handle(&context, &request(1, INITIALIZE, None));

        assert_eq!(gate.lifecycle().state(), LifecycleState::Uninitialized);
        assert!(gate.lifecycle().negotiated().is_none());
    }
}
