//! Request correlation identifiers.

use std::fmt;

crate::union_type! {
    /// Identifier linking a request to its response.
    ///
    /// The protocol allows either a 32-bit integer or a string. Uniqueness is
    /// scoped to one connection; ids issued locally are always integers.
    #[derive(Eq, Hash)]
    pub enum CorrelationId {
        /// Integer identifier.
        Number(i32),
        /// String identifier.
        String(String),
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(number) => write!(formatter, "{number}"),
            Self::String(text) => write!(formatter, "\"{text}\""),
        }
    }
}

impl From<i32> for CorrelationId {
    fn from(value: i32) -> Self {
        Self::Number(value)
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}
