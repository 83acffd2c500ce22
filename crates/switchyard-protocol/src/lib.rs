//! Wire-level building blocks for the Language Server Protocol.
#![deny(missing_docs)]
//!
//! The crate owns the parts of the protocol that do not depend on a live
//! connection: the JSON-RPC envelope model, the structured error codes, the
//! closed method registry and the tagless union codec used for fields whose
//! wire shape is "one of N alternatives". Concrete parameter and result records
//! come from [`lsp_types`]; this crate only adds the shapes the routing layer
//! needs to reason about.

mod envelope;
mod errors;
mod id;
pub mod methods;
mod params;
pub mod shapes;
pub mod union;

pub use envelope::{EnvelopeError, JSONRPC_VERSION, Message, Notification, Request, Response};
pub use errors::{ErrorCode, ResponseError};
pub use id::CorrelationId;
pub use methods::{Direction, MethodDescriptor, MethodKind, RegistryError};
pub use params::{
    CancelParams, ProgressParams, WorkDoneProgressCancelParams, WorkDoneProgressCreateParams,
};
pub use shapes::{Declaration, Definition, ProgressToken};
pub use union::{UnionError, UnionValue};

/// Re-exports used by [`union_type!`] expansions in downstream crates.
#[doc(hidden)]
pub mod __private {
    pub use serde;
    pub use serde_json;
}
