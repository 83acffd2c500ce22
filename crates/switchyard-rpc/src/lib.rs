//! Routing runtime for Language Server Protocol connections.
#![deny(missing_docs)]
//!
//! Inbound envelopes pass through a [`Dispatcher`]: an ordered chain of
//! [`Handler`]s, normally the [`LifecycleGate`] around a typed [`Router`]
//! followed by the [`MethodNotFound`] fallback. Outbound calls go through a
//! [`Peer`], whose [`Correlator`] matches responses back to the waiting
//! caller. A [`Connection`] ties both directions to a [`Transport`].
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use switchyard_rpc::{
//!     Connection, ConnectionConfig, DispatcherConfig, LanguageServer, RequestContext,
//!     ResponseError, memory_pair, server_dispatcher,
//! };
//! use lsp_types::{InitializeParams, InitializeResult};
//!
//! struct Server;
//!
//! impl LanguageServer for Server {
//!     fn initialize(
//!         &self,
//!         _context: &RequestContext,
//!         _params: InitializeParams,
//!     ) -> Result<InitializeResult, ResponseError> {
//!         Ok(InitializeResult::default())
//!     }
//!
//!     fn shutdown(&self, _context: &RequestContext, (): ()) -> Result<(), ResponseError> {
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (server_side, _client_side) = memory_pair();
//! let (dispatcher, lifecycle) = server_dispatcher(Server, DispatcherConfig::default())?;
//! Connection::new(Arc::new(server_side), dispatcher, ConnectionConfig::default())
//!     .with_lifecycle(lifecycle)
//!     .serve()?;
//! # Ok(())
//! # }
//! ```

#[macro_use]
mod surface;

mod cancel;
mod chain;
pub mod client;
mod config;
mod connection;
mod context;
mod correlator;
mod dispatcher;
mod errors;
mod lifecycle;
mod peer;
mod router;
pub mod server;
mod transport;

pub use cancel::CancellationToken;
pub use chain::{Dispatch, Handler, Incoming, MethodNotFound};
pub use client::{LanguageClient, client_dispatcher, client_router};
pub use config::{
    ConnectionConfig, DEFAULT_MAX_MESSAGE_BYTES, DispatcherConfig, InitializeGate,
    InitializeGateParseError, JsonCodec, PayloadCodec,
};
pub use connection::{Connection, ConnectionHandle};
pub use context::RequestContext;
pub use correlator::{Correlator, PendingResponse};
pub use dispatcher::Dispatcher;
pub use errors::{CallError, CodecError, ConnectionError, RouterError, TransportError};
pub use lifecycle::{Lifecycle, LifecycleGate, LifecycleState, Negotiated};
pub use peer::Peer;
pub use router::{Router, RouterBuilder};
pub use server::{LanguageServer, server_dispatcher, server_router};
pub use switchyard_protocol::{CorrelationId, Message, ResponseError};
pub use transport::{MemoryTransport, Transport, memory_pair};

#[cfg(test)]
mod tests;
