//! Shared fixtures and helpers for runtime tests.

mod recording_server;
mod world;

use std::str::FromStr;

use lsp_types::{
    GotoDefinitionParams, PartialResultParams, Position, TextDocumentIdentifier,
    TextDocumentPositionParams, Uri, WorkDoneProgressParams,
};
use rstest::fixture;

pub use recording_server::{CallKind, RecordingServer, RecordingServerHandle, definition_location};
pub use world::TestWorld;

/// Common URI used by runtime tests.
#[fixture]
pub fn sample_uri() -> Uri {
    Uri::from_str("file:///workspace/main.rs").expect("invalid test URI")
}

/// Builds a definition request for the sample URI.
#[must_use]
pub fn definition_params() -> GotoDefinitionParams {
    GotoDefinitionParams {
        text_document_position_params: TextDocumentPositionParams {
            text_document: TextDocumentIdentifier { uri: sample_uri() },
            position: Position::new(1, 2),
        },
        work_done_progress_params: WorkDoneProgressParams::default(),
        partial_result_params: PartialResultParams::default(),
    }
}
