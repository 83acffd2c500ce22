//! Handler chain primitives.
//!
//! Each handler either claims a message, producing a [`Dispatch`] outcome, or
//! returns [`Dispatch::NotHandled`] so the next handler in the chain can try.

use std::sync::Arc;

use serde_json::Value;
use switchyard_protocol::{CorrelationId, Notification, Request, Response, ResponseError};
use tracing::{debug, trace};

use crate::context::RequestContext;

/// Log target for dispatch events.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// A message that can be dispatched to handlers.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// A request; exactly one reply is owed.
    Request(Request),
    /// A notification; nothing is ever sent back.
    Notification(Notification),
}

impl Incoming {
    /// Method name.
    #[must_use]
    pub fn method(&self) -> &str {
        match self {
            Self::Request(request) => request.method.as_str(),
            Self::Notification(notification) => notification.method.as_str(),
        }
    }

    /// Request id; `None` for notifications.
    #[must_use]
    pub fn id(&self) -> Option<&CorrelationId> {
        match self {
            Self::Request(request) => Some(&request.id),
            Self::Notification(_) => None,
        }
    }

    /// Raw parameters.
    #[must_use]
    pub fn params(&self) -> Option<&Value> {
        match self {
            Self::Request(request) => request.params.as_ref(),
            Self::Notification(notification) => notification.params.as_ref(),
        }
    }

    /// Builds the reply owed for this message, if any.
    pub(crate) fn reply_with(&self, error: ResponseError) -> Option<Response> {
        self.id()
            .map(|id| Response::failure(Some(id.clone()), error))
    }
}

impl From<Request> for Incoming {
    fn from(request: Request) -> Self {
        Self::Request(request)
    }
}

impl From<Notification> for Incoming {
    fn from(notification: Notification) -> Self {
        Self::Notification(notification)
    }
}

/// Outcome of dispatching one message.
///
/// The carried response is `Some` for requests and `None` for notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// A handler ran; its result or error is the reply.
    Replied(Option<Response>),
    /// The message was abandoned before a handler ran.
    Cancelled(Option<Response>),
    /// The parameters did not match the handler's expected shape.
    ParseError(Option<Response>),
    /// No handler claimed the message.
    NotHandled,
}

impl Dispatch {
    /// Whether a handler claimed the message.
    #[must_use]
    pub fn is_handled(&self) -> bool {
        !matches!(self, Self::NotHandled)
    }

    /// Reply to send, if any.
    #[must_use]
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Replied(response) | Self::Cancelled(response) | Self::ParseError(response) => {
                response.as_ref()
            }
            Self::NotHandled => None,
        }
    }

    /// Consumes the outcome, returning the reply to send.
    #[must_use]
    pub fn into_response(self) -> Option<Response> {
        match self {
            Self::Replied(response) | Self::Cancelled(response) | Self::ParseError(response) => {
                response
            }
            Self::NotHandled => None,
        }
    }

    /// Whether the reply carries a result rather than an error.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Replied(Some(response)) if response.outcome.is_ok())
    }
}

/// One link in a dispatch chain.
pub trait Handler: Send + Sync {
    /// Claims `incoming` or returns [`Dispatch::NotHandled`].
    fn handle(&self, context: &RequestContext, incoming: &Incoming) -> Dispatch;
}

impl<T: Handler + ?Sized> Handler for Arc<T> {
    fn handle(&self, context: &RequestContext, incoming: &Incoming) -> Dispatch {
        (**self).handle(context, incoming)
    }
}

/// Terminal handler for messages nobody else claimed.
///
/// Requests get a `MethodNotFound` reply. Notifications are dropped; the
/// optional `$/` family is dropped without a log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodNotFound;

impl Handler for MethodNotFound {
    fn handle(&self, _context: &RequestContext, incoming: &Incoming) -> Dispatch {
        match incoming {
            Incoming::Request(request) => {
                debug!(
                    target: DISPATCH_TARGET,
                    method = %request.method,
                    id = %request.id,
                    "no handler for request"
                );
                Dispatch::Replied(incoming.reply_with(ResponseError::method_not_found(&request.method)))
            }
            Incoming::Notification(notification) => {
                if notification.method.starts_with("$/") {
                    trace!(
                        target: DISPATCH_TARGET,
                        method = %notification.method,
                        "ignoring optional notification"
                    );
                } else {
                    debug!(
                        target: DISPATCH_TARGET,
                        method = %notification.method,
                        "dropping unhandled notification"
                    );
                }
                Dispatch::Replied(None)
            }
        }
    }
}
