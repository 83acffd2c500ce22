//! Union shapes used by the routing layer.
//!
//! Each declaration order below is part of the wire contract: decoding keeps
//! the first alternative that parses, so reordering variants changes which
//! Rust value an ambiguous payload becomes.

use lsp_types::{Location, LocationLink};

crate::union_type! {
    /// Token correlating out-of-band progress or partial-result streams.
    #[derive(Eq, Hash)]
    pub enum ProgressToken {
        /// Integer token.
        Number(i32),
        /// String token.
        String(String),
    }
}

crate::union_type! {
    /// Result of `textDocument/declaration` and the other goto requests.
    ///
    /// An empty array decodes as [`Declaration::Many`] because it precedes
    /// [`Declaration::Links`].
    pub enum Declaration {
        /// A single location, encoded as `{uri, range}`.
        Single(Location),
        /// Several plain locations.
        Many(Vec<Location>),
        /// Location links carrying origin and target ranges.
        Links(Vec<LocationLink>),
    }
}

/// Result of `textDocument/definition`; identical in shape to [`Declaration`].
pub type Definition = Declaration;

impl From<Location> for Declaration {
    fn from(location: Location) -> Self {
        Self::Single(location)
    }
}

impl From<Vec<Location>> for Declaration {
    fn from(locations: Vec<Location>) -> Self {
        Self::Many(locations)
    }
}

impl From<Vec<LocationLink>> for Declaration {
    fn from(links: Vec<LocationLink>) -> Self {
        Self::Links(links)
    }
}

impl From<i32> for ProgressToken {
    fn from(value: i32) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for ProgressToken {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}
