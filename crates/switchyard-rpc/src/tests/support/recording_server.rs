//! Recording language server used in tests.

use std::sync::{Arc, Mutex, PoisonError};

use lsp_types::{
    DidOpenTextDocumentParams, GotoDefinitionParams, InitializeParams, InitializeResult,
    InitializedParams, Location, OneOf, Position, Range, ServerCapabilities, ServerInfo,
};

use crate::{LanguageServer, RequestContext, ResponseError};
use switchyard_protocol::{CancelParams, Definition};

use super::sample_uri;

/// Discriminates the kind of call recorded by the stub server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// `initialize` was invoked.
    Initialize,
    /// `initialized` was invoked.
    Initialized,
    /// `textDocument/definition` was invoked.
    Definition,
    /// `textDocument/didOpen` was invoked.
    DidOpen,
    /// `$/cancelRequest` was invoked.
    CancelRequest,
    /// `shutdown` was invoked.
    Shutdown,
    /// `exit` was invoked.
    Exit,
}

/// Test double that records every call routed through it.
#[derive(Clone, Default)]
pub struct RecordingServer {
    calls: Arc<Mutex<Vec<CallKind>>>,
    refuse_initialize: bool,
}

impl RecordingServer {
    /// Creates a server that accepts the handshake.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a server whose `initialize` handler fails.
    #[must_use]
    pub fn refusing_initialize() -> Self {
        Self {
            refuse_initialize: true,
            ..Self::default()
        }
    }

    /// Returns a handle that can be used to assert recorded calls.
    #[must_use]
    pub fn handle(&self) -> RecordingServerHandle {
        RecordingServerHandle {
            calls: Arc::clone(&self.calls),
        }
    }

    fn record(&self, kind: CallKind) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(kind);
    }
}

/// Location returned for every definition request.
#[must_use]
pub fn definition_location() -> Location {
    Location {
        uri: sample_uri(),
        range: Range::new(Position::new(4, 3), Position::new(4, 11)),
    }
}

impl LanguageServer for RecordingServer {
    fn initialize(
        &self,
        _context: &RequestContext,
        _params: InitializeParams,
    ) -> Result<InitializeResult, ResponseError> {
        self.record(CallKind::Initialize);
        if self.refuse_initialize {
            return Err(ResponseError::request_failed("initialisation refused"));
        }
        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                definition_provider: Some(OneOf::Left(true)),
                ..ServerCapabilities::default()
            },
            server_info: Some(ServerInfo {
                name: String::from("recording"),
                version: None,
            }),
            ..InitializeResult::default()
        })
    }

    fn shutdown(&self, _context: &RequestContext, (): ()) -> Result<(), ResponseError> {
        self.record(CallKind::Shutdown);
        Ok(())
    }

    fn definition(
        &self,
        _context: &RequestContext,
        _params: GotoDefinitionParams,
    ) -> Result<Option<Definition>, ResponseError> {
        self.record(CallKind::Definition);
        Ok(Some(Definition::Single(definition_location())))
    }

    fn initialized(
        &self,
        _context: &RequestContext,
        _params: InitializedParams,
    ) -> Result<(), ResponseError> {
        self.record(CallKind::Initialized);
        Ok(())
    }

    fn did_open(
        &self,
        _context: &RequestContext,
        _params: DidOpenTextDocumentParams,
    ) -> Result<(), ResponseError> {
        self.record(CallKind::DidOpen);
        Ok(())
    }

    fn cancel_request(
        &self,
        _context: &RequestContext,
        _params: CancelParams,
    ) -> Result<(), ResponseError> {
        self.record(CallKind::CancelRequest);
        Ok(())
    }

    fn exit(&self, _context: &RequestContext, (): ()) -> Result<(), ResponseError> {
        self.record(CallKind::Exit);
        Ok(())
    }
}

/// Read access to the calls a [`RecordingServer`] saw.
#[derive(Clone)]
pub struct RecordingServerHandle {
    calls: Arc<Mutex<Vec<CallKind>>>,
}

impl RecordingServerHandle {
    /// Calls in the order they arrived.
    #[must_use]
    pub fn calls(&self) -> Vec<CallKind> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether `kind` was recorded at least once.
    #[must_use]
    pub fn recorded(&self, kind: CallKind) -> bool {
        self.calls().contains(&kind)
    }
}
