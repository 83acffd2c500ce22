//! BDD test world wrapping a server dispatcher.

use std::sync::Arc;

use serde_json::Value;
use switchyard_protocol::Message;

use crate::{
    CancellationToken, Dispatch, Dispatcher, DispatcherConfig, Incoming, InitializeGate,
    Lifecycle, LifecycleGate, MethodNotFound, RequestContext, server_router,
};

use super::recording_server::{RecordingServer, RecordingServerHandle};

/// Shared state exercised by BDD step implementations.
pub struct TestWorld {
    dispatcher: Dispatcher,
    /// Lifecycle shared with the gate.
    pub lifecycle: Arc<Lifecycle>,
    /// Calls seen by the recording server.
    pub server: RecordingServerHandle,
    /// Connection token; children are handed to each dispatch.
    pub token: CancellationToken,
    /// Outcome of the last dispatched message; `None` when decoding failed.
    pub last_dispatch: Option<Dispatch>,
    /// Encoded reply to the last message, if one is owed.
    pub last_reply: Option<Value>,
}

impl TestWorld {
    /// Builds a world around `server`.
    ///
    /// `fallback` appends the `MethodNotFound` handler to the chain.
    #[must_use]
    pub fn new(server: RecordingServer, gate: InitializeGate, fallback: bool) -> Self {
        let handle = server.handle();
        let lifecycle = Arc::new(Lifecycle::new());
        let router = server_router(server).expect("server routes are valid");
        let config = DispatcherConfig::default().with_initialize_gate(gate);
        let mut dispatcher = Dispatcher::new(config)
            .with_handler(LifecycleGate::new(Arc::clone(&lifecycle), router, gate));
        if fallback {
            dispatcher = dispatcher.with_handler(MethodNotFound);
        }
        Self {
            dispatcher,
            lifecycle,
            server: handle,
            token: CancellationToken::new(),
            last_dispatch: None,
            last_reply: None,
        }
    }

    /// Encodes `envelope` and runs it through the dispatcher.
    pub fn send(&mut self, envelope: &Value) {
        let bytes = serde_json::to_vec(envelope).expect("envelope encodes");
        self.send_bytes(&bytes);
    }

    /// Runs raw bytes through the dispatcher.
    pub fn send_bytes(&mut self, bytes: &[u8]) {
        let incoming = match self.dispatcher.decode(bytes) {
            Ok(Message::Request(request)) => Incoming::from(request),
            Ok(Message::Notification(notification)) => Incoming::from(notification),
            Ok(Message::Response(_)) => panic!("the world only dispatches inbound calls"),
            Err(reply) => {
                self.last_dispatch = None;
                self.last_reply = Some(Message::from(reply).to_value().expect("reply encodes"));
                return;
            }
        };

        let context = RequestContext::new(
            incoming.id().cloned(),
            incoming.method(),
            self.token.child_token(),
        );
        let outcome = self.dispatcher.dispatch(&context, &incoming);
        self.last_reply = outcome
            .response()
            .map(|response| Message::from(response.clone()).to_value().expect("reply encodes"));
        self.last_dispatch = Some(outcome);
    }

    /// Error code of the last reply, if it carried one.
    #[must_use]
    pub fn last_error_code(&self) -> Option<i64> {
        self.last_reply
            .as_ref()
            .and_then(|reply| reply.pointer("/error/code"))
            .and_then(Value::as_i64)
    }
}
