//! Per-connection read loop.
//!
//! The loop reads envelopes on the calling thread. Responses resolve the
//! correlator inline, notifications are dispatched inline in arrival order,
//! and each request runs on its own worker thread so replies may leave out
//! of order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use switchyard_protocol::methods::CANCEL_REQUEST;
use switchyard_protocol::{
    CancelParams, CorrelationId, Message, Notification, Request, Response, ResponseError,
};
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::chain::Incoming;
use crate::config::ConnectionConfig;
use crate::context::RequestContext;
use crate::correlator::Correlator;
use crate::dispatcher::Dispatcher;
use crate::errors::{ConnectionError, TransportError};
use crate::lifecycle::Lifecycle;
use crate::peer::Peer;
use crate::transport::{Outbox, Transport};

/// Log target for connection events.
pub(crate) const CONNECTION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::connection");

type InFlight = Arc<Mutex<HashMap<CorrelationId, CancellationToken>>>;

fn lock_in_flight(
    in_flight: &InFlight,
) -> std::sync::MutexGuard<'_, HashMap<CorrelationId, CancellationToken>> {
    in_flight.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One side of an LSP session bound to a transport.
pub struct Connection {
    transport: Arc<dyn Transport>,
    dispatcher: Arc<Dispatcher>,
    config: ConnectionConfig,
    outbox: Arc<Outbox>,
    correlator: Arc<Correlator>,
    token: CancellationToken,
    in_flight: InFlight,
    lifecycle: Option<Arc<Lifecycle>>,
}

impl Connection {
    /// Binds `dispatcher` to `transport`.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        dispatcher: Dispatcher,
        config: ConnectionConfig,
    ) -> Self {
        let outbox = Arc::new(Outbox::new(
            Arc::clone(&transport),
            Arc::clone(dispatcher.config().codec()),
            config.max_message_bytes(),
        ));
        Self {
            transport,
            dispatcher: Arc::new(dispatcher),
            config,
            outbox,
            correlator: Arc::new(Correlator::new()),
            token: CancellationToken::new(),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            lifecycle: None,
        }
    }

    /// Stops the read loop once `lifecycle` reports `exit`.
    #[must_use]
    pub fn with_lifecycle(mut self, lifecycle: Arc<Lifecycle>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    /// Outbound handle sharing this connection's correlator.
    #[must_use]
    pub fn peer(&self) -> Peer {
        Peer::new(Arc::clone(&self.outbox), Arc::clone(&self.correlator))
    }

    /// Handle for cancelling the connection from another thread.
    #[must_use]
    pub fn handle(&self) -> ConnectionHandle {
        ConnectionHandle {
            token: self.token.clone(),
            correlator: Arc::clone(&self.correlator),
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    /// Runs the read loop until the transport closes or `exit` arrives.
    ///
    /// On return the connection token is cancelled, outstanding outbound
    /// calls resolve with `ConnectionClosed`, and request workers have been
    /// joined.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] when reading fails or a worker thread
    /// cannot be spawned.
    pub fn serve(self) -> Result<(), ConnectionError> {
        info!(target: CONNECTION_TARGET, "connection started");
        let mut workers = Vec::new();
        let outcome = loop {
            match self.transport.receive() {
                Ok(Some(payload)) => {
                    if let Err(error) = self.handle_payload(&payload, &mut workers) {
                        break Err(error);
                    }
                    if self.is_exited() {
                        debug!(target: CONNECTION_TARGET, "exit received; stopping");
                        break Ok(());
                    }
                }
                Ok(None) => {
                    debug!(target: CONNECTION_TARGET, "transport closed by peer");
                    break Ok(());
                }
                Err(error) => break Err(ConnectionError::Transport(error)),
            }
            workers.retain(|worker: &JoinHandle<()>| !worker.is_finished());
        };
        self.finish(workers);
        outcome
    }

    fn is_exited(&self) -> bool {
        self.lifecycle
            .as_ref()
            .is_some_and(|lifecycle| lifecycle.is_exited())
    }

    fn finish(&self, workers: Vec<JoinHandle<()>>) {
        self.token.cancel();
        let abandoned = self.correlator.close();
        for worker in workers {
            if worker.join().is_err() {
                warn!(target: CONNECTION_TARGET, "request worker panicked");
            }
        }
        self.outbox.close();
        info!(
            target: CONNECTION_TARGET,
            abandoned,
            "connection finished"
        );
    }

    fn handle_payload(
        &self,
        payload: &[u8],
        workers: &mut Vec<JoinHandle<()>>,
    ) -> Result<(), ConnectionError> {
        let limit = self.config.max_message_bytes();
        if payload.len() > limit {
            let error = TransportError::MessageTooLarge {
                size: payload.len(),
                limit,
            };
            warn!(target: CONNECTION_TARGET, error = %error, "rejecting oversized envelope");
            self.reply(Response::failure(None, ResponseError::invalid_request(&error)));
            return Ok(());
        }

        match self.dispatcher.decode(payload) {
            Err(reply) => self.reply(reply),
            Ok(Message::Response(response)) => self.route_response(response),
            Ok(Message::Notification(notification)) => self.dispatch_notification(notification),
            Ok(Message::Request(request)) => {
                if let Some(worker) = self.spawn_request(request)? {
                    workers.push(worker);
                }
            }
        }
        Ok(())
    }

    fn reply(&self, response: Response) {
        let id = response.id.clone();
        if let Err(error) = self.outbox.send(&Message::from(response)) {
            warn!(
                target: CONNECTION_TARGET,
                id = ?id,
                error = %error,
                "failed to send reply"
            );
        }
    }

    fn route_response(&self, response: Response) {
        let Response { id, outcome } = response;
        match id {
            Some(id) => {
                self.correlator.resolve(&id, outcome);
            }
            None => warn!(
                target: CONNECTION_TARGET,
                error = ?outcome.err(),
                "peer reported an error without a request id"
            ),
        }
    }

    fn dispatch_notification(&self, notification: Notification) {
        if notification.method == CANCEL_REQUEST {
            self.flag_cancelled(&notification);
        }

        let incoming = Incoming::from(notification);
        let context = RequestContext::new(None, incoming.method(), self.token.child_token());
        let outcome = self.dispatcher.dispatch(&context, &incoming);
        if !outcome.is_handled() {
            debug!(
                target: CONNECTION_TARGET,
                method = incoming.method(),
                "notification not handled"
            );
        }
    }

    fn flag_cancelled(&self, notification: &Notification) {
        let params = notification
            .params
            .clone()
            .map(serde_json::from_value::<CancelParams>);
        match params {
            Some(Ok(CancelParams { id })) => {
                let token = lock_in_flight(&self.in_flight).get(&id).cloned();
                match token {
                    Some(token) => {
                        debug!(target: CONNECTION_TARGET, id = %id, "peer cancelled request");
                        token.cancel();
                    }
                    None => debug!(
                        target: CONNECTION_TARGET,
                        id = %id,
                        "cancellation for a request that is not in flight"
                    ),
                }
            }
            Some(Err(error)) => warn!(
                target: CONNECTION_TARGET,
                error = %error,
                "malformed $/cancelRequest"
            ),
            None => warn!(target: CONNECTION_TARGET, "$/cancelRequest without params"),
        }
    }

    fn spawn_request(&self, request: Request) -> Result<Option<JoinHandle<()>>, ConnectionError> {
        let id = request.id.clone();
        let token = self.token.child_token();
        {
            let mut in_flight = lock_in_flight(&self.in_flight);
            if in_flight.contains_key(&id) {
                drop(in_flight);
                warn!(target: CONNECTION_TARGET, id = %id, "duplicate request id");
                self.reply(Response::failure(
                    Some(id.clone()),
                    ResponseError::invalid_request(format!("request {id} is already in flight")),
                ));
                return Ok(None);
            }
            in_flight.insert(id.clone(), token.clone());
        }

        let dispatcher = Arc::clone(&self.dispatcher);
        let outbox = Arc::clone(&self.outbox);
        let in_flight = Arc::clone(&self.in_flight);
        let worker_id = id.clone();
        let spawned = thread::Builder::new()
            .name(format!("switchyard-request-{id}"))
            .spawn(move || {
                let incoming = Incoming::from(request);
                let context = RequestContext::new(Some(worker_id.clone()), incoming.method(), token);
                let reply = dispatcher
                    .dispatch(&context, &incoming)
                    .into_response()
                    .unwrap_or_else(|| {
                        Response::failure(
                            Some(worker_id.clone()),
                            ResponseError::method_not_found(incoming.method()),
                        )
                    });
                lock_in_flight(&in_flight).remove(&worker_id);
                if let Err(error) = outbox.send(&Message::from(reply)) {
                    warn!(
                        target: CONNECTION_TARGET,
                        id = %worker_id,
                        error = %error,
                        "failed to send reply"
                    );
                }
            });

        match spawned {
            Ok(worker) => Ok(Some(worker)),
            Err(error) => {
                lock_in_flight(&self.in_flight).remove(&id);
                Err(ConnectionError::Spawn(error))
            }
        }
    }
}

/// Cancels a running [`Connection`] from another thread.
#[derive(Clone)]
pub struct ConnectionHandle {
    token: CancellationToken,
    correlator: Arc<Correlator>,
    in_flight: InFlight,
}

impl ConnectionHandle {
    /// Cancels the connection: every later dispatch replies
    /// `RequestCancelled`, outstanding outbound calls resolve with
    /// [`CallError::Cancelled`](crate::CallError::Cancelled), and new calls
    /// fail with `ConnectionClosed`.
    pub fn cancel(&self) {
        self.token.cancel();
        let abandoned = self.correlator.cancel_all();
        debug!(target: CONNECTION_TARGET, abandoned, "connection cancelled");
    }

    /// Whether [`cancel`](Self::cancel) has been called or the loop ended.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Flags one in-flight inbound request as cancelled.
    ///
    /// Returns `false` when no request with `id` is running.
    pub fn cancel_request(&self, id: &CorrelationId) -> bool {
        let token = lock_in_flight(&self.in_flight).get(id).cloned();
        token.is_some_and(|token| {
            token.cancel();
            true
        })
    }

    /// Number of inbound requests still running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        lock_in_flight(&self.in_flight).len()
    }
}
