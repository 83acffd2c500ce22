//! Entry point that turns one inbound message into a reply.

use std::sync::Arc;

use switchyard_protocol::{Message, Response, ResponseError};
use tracing::{debug, warn};

use crate::chain::{DISPATCH_TARGET, Dispatch, Handler, Incoming};
use crate::config::DispatcherConfig;
use crate::context::RequestContext;
use crate::errors::CodecError;

/// Ordered handler chain plus the codec used on its envelopes.
///
/// The dispatcher holds no per-call state; one instance serves every message
/// on a connection, from any thread.
#[derive(Clone)]
pub struct Dispatcher {
    chain: Vec<Arc<dyn Handler>>,
    config: DispatcherConfig,
}

impl Dispatcher {
    /// Creates a dispatcher with an empty chain.
    #[must_use]
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            chain: Vec::new(),
            config,
        }
    }

    /// Appends a handler to the end of the chain.
    #[must_use]
    pub fn with_handler(mut self, handler: impl Handler + 'static) -> Self {
        self.chain.push(Arc::new(handler));
        self
    }

    /// Appends an already shared handler.
    #[must_use]
    pub fn with_shared_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.chain.push(handler);
        self
    }

    /// Dispatcher configuration.
    #[must_use]
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Runs `incoming` through the chain.
    ///
    /// A cancelled context short-circuits before any handler runs; requests
    /// then get a `RequestCancelled` reply.
    #[must_use]
    pub fn dispatch(&self, context: &RequestContext, incoming: &Incoming) -> Dispatch {
        if context.is_cancelled() {
            debug!(
                target: DISPATCH_TARGET,
                method = incoming.method(),
                id = ?incoming.id(),
                "message cancelled before dispatch"
            );
            return Dispatch::Cancelled(incoming.reply_with(ResponseError::request_cancelled()));
        }

        for handler in &self.chain {
            let outcome = handler.handle(context, incoming);
            if outcome.is_handled() {
                return outcome;
            }
        }

        debug!(
            target: DISPATCH_TARGET,
            method = incoming.method(),
            "no handler claimed the message"
        );
        Dispatch::NotHandled
    }

    /// Decodes and classifies one envelope.
    ///
    /// # Errors
    ///
    /// Returns the reply owed to the peer: `ParseError` with a null id when
    /// the payload does not decode, `InvalidRequest` (addressed to the
    /// recovered id, when there is one) when it is not a valid envelope.
    pub fn decode(&self, bytes: &[u8]) -> Result<Message, Response> {
        let value = self.config.codec().decode(bytes).map_err(|error| {
            warn!(target: DISPATCH_TARGET, error = %error, "payload did not decode");
            Response::failure(None, ResponseError::parse_error(&error))
        })?;

        let id = Message::recover_id(&value);
        Message::from_value(value).map_err(|error| {
            warn!(
                target: DISPATCH_TARGET,
                error = %error,
                id = ?id,
                "rejecting malformed envelope"
            );
            Response::failure(id, error.to_response_error())
        })
    }

    /// Encodes one envelope.
    ///
    /// # Errors
    ///
    /// Propagates [`CodecError`] from the configured codec.
    pub fn encode(&self, message: &Message) -> Result<Vec<u8>, CodecError> {
        let value = message.to_value()?;
        self.config.codec().encode(&value)
    }
}
