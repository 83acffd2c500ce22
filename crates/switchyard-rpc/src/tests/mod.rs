//! Crate-level tests exercising the runtime end to end.

mod behaviour;
mod support;
