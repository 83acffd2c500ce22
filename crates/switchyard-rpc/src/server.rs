//! Server-side surface: every method a client may send.

use std::sync::Arc;

use lsp_types::notification::{
    DidChangeConfiguration, DidChangeNotebookDocument, DidChangeTextDocument,
    DidChangeWatchedFiles, DidChangeWorkspaceFolders, DidCloseNotebookDocument,
    DidCloseTextDocument, DidCreateFiles, DidDeleteFiles, DidOpenNotebookDocument,
    DidOpenTextDocument, DidRenameFiles, DidSaveNotebookDocument, DidSaveTextDocument,
    Initialized, SetTrace, WillSaveTextDocument,
};
use lsp_types::request::{
    CallHierarchyIncomingCalls, CallHierarchyOutgoingCalls, CallHierarchyPrepare,
    CodeActionRequest, CodeActionResolveRequest, CodeLensRequest, CodeLensResolve,
    ColorPresentationRequest, Completion, DocumentColor, DocumentDiagnosticRequest,
    DocumentHighlightRequest, DocumentLinkRequest, DocumentLinkResolve, DocumentSymbolRequest,
    ExecuteCommand, FoldingRangeRequest, Formatting, HoverRequest, Initialize, InlayHintRequest,
    InlayHintResolveRequest, InlineValueRequest, LinkedEditingRange, MonikerRequest,
    OnTypeFormatting, PrepareRenameRequest, RangeFormatting, References, Rename,
    ResolveCompletionItem, SelectionRangeRequest, SemanticTokensFullDeltaRequest,
    SemanticTokensFullRequest, SemanticTokensRangeRequest, Shutdown, SignatureHelpRequest,
    TypeHierarchyPrepare, TypeHierarchySubtypes, TypeHierarchySupertypes, WillCreateFiles,
    WillDeleteFiles, WillRenameFiles, WillSaveWaitUntil, WorkspaceDiagnosticRequest,
    WorkspaceSymbolRequest, WorkspaceSymbolResolve,
};
use lsp_types::GotoDefinitionParams;
use switchyard_protocol::methods::{CANCEL_REQUEST, PROGRESS};
use switchyard_protocol::{
    CancelParams, Declaration, Definition, Direction, ProgressParams, WorkDoneProgressCancelParams,
};

use crate::chain::MethodNotFound;
use crate::config::DispatcherConfig;
use crate::dispatcher::Dispatcher;
use crate::errors::RouterError;
use crate::lifecycle::{Lifecycle, LifecycleGate};

handler_surface! {
    /// Handler for everything a client sends to a server.
    ///
    /// Only the lifecycle requests are required; every other request answers
    /// `MethodNotFound` and every other notification is ignored until
    /// overridden.
    pub trait LanguageServer;

    /// Builds the route table serving `handler`.
    pub fn server_router(Direction::ServerBound);

    required {
        /// Opens the session and announces server capabilities.
        fn initialize = Initialize;
        /// Asks the server to release resources before `exit`.
        fn shutdown = Shutdown;
    }
    requests {
        /// `textDocument/references`
        fn references = References;
        /// `textDocument/hover`
        fn hover = HoverRequest;
        /// `textDocument/completion`
        fn completion = Completion;
        /// `completionItem/resolve`
        fn completion_item_resolve = ResolveCompletionItem;
        /// `textDocument/signatureHelp`
        fn signature_help = SignatureHelpRequest;
        /// `textDocument/documentHighlight`
        fn document_highlight = DocumentHighlightRequest;
        /// `textDocument/documentSymbol`
        fn document_symbol = DocumentSymbolRequest;
        /// `textDocument/codeAction`
        fn code_action = CodeActionRequest;
        /// `codeAction/resolve`
        fn code_action_resolve = CodeActionResolveRequest;
        /// `textDocument/codeLens`
        fn code_lens = CodeLensRequest;
        /// `codeLens/resolve`
        fn code_lens_resolve = CodeLensResolve;
        /// `textDocument/documentLink`
        fn document_link = DocumentLinkRequest;
        /// `documentLink/resolve`
        fn document_link_resolve = DocumentLinkResolve;
        /// `textDocument/documentColor`
        fn document_color = DocumentColor;
        /// `textDocument/colorPresentation`
        fn color_presentation = ColorPresentationRequest;
        /// `textDocument/formatting`
        fn formatting = Formatting;
        /// `textDocument/rangeFormatting`
        fn range_formatting = RangeFormatting;
        /// `textDocument/onTypeFormatting`
        fn on_type_formatting = OnTypeFormatting;
        /// `textDocument/rename`
        fn rename = Rename;
        /// `textDocument/prepareRename`
        fn prepare_rename = PrepareRenameRequest;
        /// `textDocument/foldingRange`
        fn folding_range = FoldingRangeRequest;
        /// `textDocument/selectionRange`
        fn selection_range = SelectionRangeRequest;
        /// `textDocument/prepareCallHierarchy`
        fn prepare_call_hierarchy = CallHierarchyPrepare;
        /// `callHierarchy/incomingCalls`
        fn incoming_calls = CallHierarchyIncomingCalls;
        /// `callHierarchy/outgoingCalls`
        fn outgoing_calls = CallHierarchyOutgoingCalls;
        /// `textDocument/prepareTypeHierarchy`
        fn prepare_type_hierarchy = TypeHierarchyPrepare;
        /// `typeHierarchy/supertypes`
        fn supertypes = TypeHierarchySupertypes;
        /// `typeHierarchy/subtypes`
        fn subtypes = TypeHierarchySubtypes;
        /// `textDocument/semanticTokens/full`
        fn semantic_tokens_full = SemanticTokensFullRequest;
        /// `textDocument/semanticTokens/full/delta`
        fn semantic_tokens_full_delta = SemanticTokensFullDeltaRequest;
        /// `textDocument/semanticTokens/range`
        fn semantic_tokens_range = SemanticTokensRangeRequest;
        /// `textDocument/linkedEditingRange`
        fn linked_editing_range = LinkedEditingRange;
        /// `textDocument/moniker`
        fn moniker = MonikerRequest;
        /// `textDocument/inlayHint`
        fn inlay_hint = InlayHintRequest;
        /// `inlayHint/resolve`
        fn inlay_hint_resolve = InlayHintResolveRequest;
        /// `textDocument/inlineValue`
        fn inline_value = InlineValueRequest;
        /// `textDocument/diagnostic`
        fn document_diagnostic = DocumentDiagnosticRequest;
        /// `workspace/diagnostic`
        fn workspace_diagnostic = WorkspaceDiagnosticRequest;
        /// `textDocument/willSaveWaitUntil`
        fn will_save_wait_until = WillSaveWaitUntil;
        /// `workspace/symbol`
        fn symbol = WorkspaceSymbolRequest;
        /// `workspaceSymbol/resolve`
        fn workspace_symbol_resolve = WorkspaceSymbolResolve;
        /// `workspace/executeCommand`
        fn execute_command = ExecuteCommand;
        /// `workspace/willCreateFiles`
        fn will_create_files = WillCreateFiles;
        /// `workspace/willRenameFiles`
        fn will_rename_files = WillRenameFiles;
        /// `workspace/willDeleteFiles`
        fn will_delete_files = WillDeleteFiles;
    }
    custom_requests {
        /// `textDocument/declaration`
        fn declaration("textDocument/declaration", GotoDefinitionParams) -> Option<Declaration>;
        /// `textDocument/definition`
        fn definition("textDocument/definition", GotoDefinitionParams) -> Option<Definition>;
        /// `textDocument/typeDefinition`
        fn type_definition("textDocument/typeDefinition", GotoDefinitionParams) -> Option<Declaration>;
        /// `textDocument/implementation`
        fn implementation("textDocument/implementation", GotoDefinitionParams) -> Option<Declaration>;
    }
    notifications {
        /// The client received the `initialize` result.
        fn initialized = Initialized;
        /// `$/setTrace`
        fn set_trace = SetTrace;
        /// `textDocument/didOpen`
        fn did_open = DidOpenTextDocument;
        /// `textDocument/didChange`
        fn did_change = DidChangeTextDocument;
        /// `textDocument/willSave`
        fn will_save = WillSaveTextDocument;
        /// `textDocument/didSave`
        fn did_save = DidSaveTextDocument;
        /// `textDocument/didClose`
        fn did_close = DidCloseTextDocument;
        /// `workspace/didChangeConfiguration`
        fn did_change_configuration = DidChangeConfiguration;
        /// `workspace/didChangeWorkspaceFolders`
        fn did_change_workspace_folders = DidChangeWorkspaceFolders;
        /// `workspace/didChangeWatchedFiles`
        fn did_change_watched_files = DidChangeWatchedFiles;
        /// `workspace/didCreateFiles`
        fn did_create_files = DidCreateFiles;
        /// `workspace/didRenameFiles`
        fn did_rename_files = DidRenameFiles;
        /// `workspace/didDeleteFiles`
        fn did_delete_files = DidDeleteFiles;
        /// `notebookDocument/didOpen`
        fn notebook_did_open = DidOpenNotebookDocument;
        /// `notebookDocument/didChange`
        fn notebook_did_change = DidChangeNotebookDocument;
        /// `notebookDocument/didSave`
        fn notebook_did_save = DidSaveNotebookDocument;
        /// `notebookDocument/didClose`
        fn notebook_did_close = DidCloseNotebookDocument;
    }
    custom_notifications {
        /// `exit`. The lifecycle is updated before this runs.
        fn exit("exit", ());
        /// `$/cancelRequest`. The connection has already flagged the request.
        fn cancel_request(CANCEL_REQUEST, CancelParams);
        /// `$/progress`
        fn progress(PROGRESS, ProgressParams);
        /// `window/workDoneProgress/cancel`
        fn work_done_progress_cancel("window/workDoneProgress/cancel", WorkDoneProgressCancelParams);
    }
}

/// Builds the dispatcher a server connection runs.
///
/// The chain is the lifecycle gate around the typed router, then the
/// `MethodNotFound` fallback. The returned [`Lifecycle`] exposes the
/// negotiated capabilities and the exit code.
///
/// # Errors
///
/// Propagates [`RouterError`] from [`server_router`].
pub fn server_dispatcher<T: LanguageServer>(
    server: T,
    config: DispatcherConfig,
) -> Result<(Dispatcher, Arc<Lifecycle>), RouterError> {
    let router = server_router(server)?;
    let lifecycle = Arc::new(Lifecycle::new());
    let gate = LifecycleGate::new(Arc::clone(&lifecycle), router, config.initialize_gate());
    let dispatcher = Dispatcher::new(config)
        .with_handler(gate)
        .with_handler(MethodNotFound);
    Ok((dispatcher, lifecycle))
}
