//! Typed route tables.
//!
//! A [`Router`] maps wire method names to closures that decode parameters
//! into the route's type, invoke the handler and encode the result. The
//! table is validated against the method registry once, when it is built.

use std::collections::HashMap;

use serde::Serialize;
use serde::de::{Deserialize, DeserializeOwned};
use serde_json::{Map, Value};
use switchyard_protocol::methods;
use switchyard_protocol::{Direction, MethodKind, Response, ResponseError};
use tracing::{debug, warn};

use crate::chain::{DISPATCH_TARGET, Dispatch, Handler, Incoming};
use crate::context::RequestContext;
use crate::errors::RouterError;

enum RouteFailure {
    Params(serde_json::Error),
    Handler(ResponseError),
    Result(serde_json::Error),
}

type RequestFn<H> =
    Box<dyn Fn(&H, &RequestContext, Option<&Value>) -> Result<Value, RouteFailure> + Send + Sync>;
type NotificationFn<H> =
    Box<dyn Fn(&H, &RequestContext, Option<&Value>) -> Result<(), RouteFailure> + Send + Sync>;

enum Route<H> {
    Request(RequestFn<H>),
    Notification(NotificationFn<H>),
}

impl<H> Route<H> {
    const fn kind(&self) -> MethodKind {
        match self {
            Self::Request(_) => MethodKind::Request,
            Self::Notification(_) => MethodKind::Notification,
        }
    }
}

/// Missing parameters decode as `null`, falling back to an empty object so
/// parameter records whose fields are all optional still match.
fn decode_params<P: DeserializeOwned>(params: Option<&Value>) -> Result<P, serde_json::Error> {
    match params {
        Some(value) => P::deserialize(value),
        None => P::deserialize(&Value::Null)
            .or_else(|_| P::deserialize(&Value::Object(Map::new()))),
    }
}

/// Collects typed routes for one side of a connection.
pub struct RouterBuilder<H> {
    handler: H,
    side: Direction,
    routes: Vec<(&'static str, Route<H>)>,
}

impl<H: Send + Sync + 'static> RouterBuilder<H> {
    /// Starts a table whose closures receive `handler`.
    ///
    /// `side` is the traffic the router accepts: [`Direction::ServerBound`]
    /// for servers, [`Direction::ClientBound`] for clients.
    #[must_use]
    pub fn new(handler: H, side: Direction) -> Self {
        Self {
            handler,
            side,
            routes: Vec::new(),
        }
    }

    /// Routes a request method to `route`.
    #[must_use]
    pub fn request<P, R, F>(mut self, method: &'static str, route: F) -> Self
    where
        P: DeserializeOwned + 'static,
        R: Serialize + 'static,
        F: Fn(&H, &RequestContext, P) -> Result<R, ResponseError> + Send + Sync + 'static,
    {
        let call: RequestFn<H> = Box::new(
            move |handler: &H, context: &RequestContext, params: Option<&Value>| {
                let decoded = decode_params::<P>(params).map_err(RouteFailure::Params)?;
                let result = route(handler, context, decoded).map_err(RouteFailure::Handler)?;
                serde_json::to_value(result).map_err(RouteFailure::Result)
            },
        );
        self.routes.push((method, Route::Request(call)));
        self
    }

    /// Routes a notification method to `route`.
    #[must_use]
    pub fn notification<P, F>(mut self, method: &'static str, route: F) -> Self
    where
        P: DeserializeOwned + 'static,
        F: Fn(&H, &RequestContext, P) -> Result<(), ResponseError> + Send + Sync + 'static,
    {
        let call: NotificationFn<H> = Box::new(
            move |handler: &H, context: &RequestContext, params: Option<&Value>| {
                let decoded = decode_params::<P>(params).map_err(RouteFailure::Params)?;
                route(handler, context, decoded).map_err(RouteFailure::Handler)
            },
        );
        self.routes.push((method, Route::Notification(call)));
        self
    }

    /// Validates every route against the method registry.
    ///
    /// # Errors
    ///
    /// Fails when a method is unknown, registered with the wrong kind, never
    /// travels towards this side, or appears twice.
    pub fn build(self) -> Result<Router<H>, RouterError> {
        let mut routes = HashMap::with_capacity(self.routes.len());
        for (method, route) in self.routes {
            let descriptor = methods::resolve(method, route.kind())
                .map_err(|source| RouterError::registry(method, source))?;
            if !descriptor.accepts(self.side) {
                return Err(RouterError::WrongDirection {
                    method: descriptor.name,
                    side: self.side,
                });
            }
            if routes.insert(descriptor.name, route).is_some() {
                return Err(RouterError::Duplicate {
                    method: descriptor.name,
                });
            }
        }

        debug!(
            target: DISPATCH_TARGET,
            side = ?self.side,
            routes = routes.len(),
            "route table built"
        );
        Ok(Router {
            handler: self.handler,
            side: self.side,
            routes,
        })
    }
}

/// Immutable route table bound to one handler value.
pub struct Router<H> {
    handler: H,
    side: Direction,
    routes: HashMap<&'static str, Route<H>>,
}

impl<H> Router<H> {
    /// Value every route closure receives.
    #[must_use]
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Traffic direction this router accepts.
    #[must_use]
    pub fn side(&self) -> Direction {
        self.side
    }

    /// Whether `method` has a route.
    #[must_use]
    pub fn handles(&self, method: &str) -> bool {
        self.routes.contains_key(method)
    }

    /// Routed method names, in no particular order.
    pub fn methods(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.routes.keys().copied()
    }

    fn invoke_request(
        &self,
        call: &RequestFn<H>,
        context: &RequestContext,
        incoming: &Incoming,
    ) -> Dispatch {
        let method = incoming.method();
        match call(&self.handler, context, incoming.params()) {
            Ok(result) => Dispatch::Replied(
                incoming
                    .id()
                    .map(|id| Response::success(id.clone(), result)),
            ),
            Err(RouteFailure::Params(error)) => {
                warn!(
                    target: DISPATCH_TARGET,
                    method,
                    error = %error,
                    "request parameters did not decode"
                );
                Dispatch::ParseError(incoming.reply_with(ResponseError::parse_error(&error)))
            }
            Err(RouteFailure::Handler(error)) => {
                debug!(
                    target: DISPATCH_TARGET,
                    method,
                    code = %error.code,
                    "handler returned an error"
                );
                Dispatch::Replied(incoming.reply_with(error))
            }
            Err(RouteFailure::Result(error)) => {
                warn!(
                    target: DISPATCH_TARGET,
                    method,
                    error = %error,
                    "handler result did not encode"
                );
                Dispatch::Replied(incoming.reply_with(ResponseError::internal(&error)))
            }
        }
    }

    fn invoke_notification(
        &self,
        call: &NotificationFn<H>,
        context: &RequestContext,
        incoming: &Incoming,
    ) -> Dispatch {
        let method = incoming.method();
        match call(&self.handler, context, incoming.params()) {
            Ok(()) => Dispatch::Replied(None),
            Err(RouteFailure::Params(error)) => {
                warn!(
                    target: DISPATCH_TARGET,
                    method,
                    error = %error,
                    "dropping notification with undecodable parameters"
                );
                Dispatch::ParseError(None)
            }
            Err(RouteFailure::Handler(error)) => {
                warn!(
                    target: DISPATCH_TARGET,
                    method,
                    error = %error,
                    "notification handler failed"
                );
                Dispatch::Replied(None)
            }
            Err(RouteFailure::Result(_)) => Dispatch::Replied(None),
        }
    }
}

impl<H: Send + Sync> Handler for Router<H> {
    fn handle(&self, context: &RequestContext, incoming: &Incoming) -> Dispatch {
        let Some(route) = self.routes.get(incoming.method()) else {
            return Dispatch::NotHandled;
        };

        match (route, incoming) {
            (Route::Request(call), Incoming::Request(_)) => {
                self.invoke_request(call, context, incoming)
            }
            (Route::Notification(call), Incoming::Notification(_)) => {
                self.invoke_notification(call, context, incoming)
            }
            (Route::Notification(_), Incoming::Request(request)) => {
                debug!(
                    target: DISPATCH_TARGET,
                    method = %request.method,
                    "notification method sent as a request"
                );
                Dispatch::Replied(incoming.reply_with(ResponseError::invalid_request(format!(
                    "{} is a notification",
                    request.method
                ))))
            }
            (Route::Request(_), Incoming::Notification(notification)) => {
                debug!(
                    target: DISPATCH_TARGET,
                    method = %notification.method,
                    "request method sent as a notification"
                );
                Dispatch::NotHandled
            }
        }
    }
}
