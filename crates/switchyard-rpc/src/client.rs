//! Client-side surface: every method a server may send.

use lsp_types::notification::{LogMessage, LogTrace, PublishDiagnostics, ShowMessage, TelemetryEvent};
use lsp_types::request::{
    ApplyWorkspaceEdit, CodeLensRefresh, InlayHintRefreshRequest, InlineValueRefreshRequest,
    RegisterCapability, SemanticTokensRefresh, ShowDocument, ShowMessageRequest,
    UnregisterCapability, WorkspaceConfiguration, WorkspaceDiagnosticRefresh,
    WorkspaceFoldersRequest,
};
use switchyard_protocol::methods::{CANCEL_REQUEST, PROGRESS};
use switchyard_protocol::{CancelParams, Direction, ProgressParams, WorkDoneProgressCreateParams};

use crate::chain::MethodNotFound;
use crate::config::DispatcherConfig;
use crate::dispatcher::Dispatcher;
use crate::errors::RouterError;

handler_surface! {
    /// Handler for everything a server sends to a client.
    pub trait LanguageClient;

    /// Builds the route table serving `handler`.
    pub fn client_router(Direction::ClientBound);

    required {}
    requests {
        /// `client/registerCapability`
        fn register_capability = RegisterCapability;
        /// `client/unregisterCapability`
        fn unregister_capability = UnregisterCapability;
        /// `window/showMessageRequest`
        fn show_message_request = ShowMessageRequest;
        /// `window/showDocument`
        fn show_document = ShowDocument;
        /// `workspace/configuration`
        fn configuration = WorkspaceConfiguration;
        /// `workspace/workspaceFolders`
        fn workspace_folders = WorkspaceFoldersRequest;
        /// `workspace/applyEdit`
        fn apply_edit = ApplyWorkspaceEdit;
        /// `workspace/codeLens/refresh`
        fn code_lens_refresh = CodeLensRefresh;
        /// `workspace/semanticTokens/refresh`
        fn semantic_tokens_refresh = SemanticTokensRefresh;
        /// `workspace/inlayHint/refresh`
        fn inlay_hint_refresh = InlayHintRefreshRequest;
        /// `workspace/inlineValue/refresh`
        fn inline_value_refresh = InlineValueRefreshRequest;
        /// `workspace/diagnostic/refresh`
        fn workspace_diagnostic_refresh = WorkspaceDiagnosticRefresh;
    }
    custom_requests {
        /// `window/workDoneProgress/create`
        fn work_done_progress_create("window/workDoneProgress/create", WorkDoneProgressCreateParams) -> ();
    }
    notifications {
        /// `window/showMessage`
        fn show_message = ShowMessage;
        /// `window/logMessage`
        fn log_message = LogMessage;
        /// `telemetry/event`
        fn telemetry_event = TelemetryEvent;
        /// `textDocument/publishDiagnostics`
        fn publish_diagnostics = PublishDiagnostics;
        /// `$/logTrace`
        fn log_trace = LogTrace;
    }
    custom_notifications {
        /// `$/cancelRequest`
        fn cancel_request(CANCEL_REQUEST, CancelParams);
        /// `$/progress`
        fn progress(PROGRESS, ProgressParams);
    }
}

/// Builds the dispatcher a client connection runs: the typed router, then
/// the `MethodNotFound` fallback. Clients carry no lifecycle gate.
///
/// # Errors
///
/// Propagates [`RouterError`] from [`client_router`].
pub fn client_dispatcher<T: LanguageClient>(
    client: T,
    config: DispatcherConfig,
) -> Result<Dispatcher, RouterError> {
    let router = client_router(client)?;
    Ok(Dispatcher::new(config)
        .with_handler(router)
        .with_handler(MethodNotFound))
}
