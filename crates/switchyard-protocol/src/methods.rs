//! Closed registry of protocol method names.
//!
//! The table is the complete LSP 3.17 method list. It is built at compile time
//! and indexed once on first lookup; nothing mutates it afterwards.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use thiserror::Error;

/// `initialize` request.
pub const INITIALIZE: &str = "initialize";
/// `initialized` notification.
pub const INITIALIZED: &str = "initialized";
/// `shutdown` request.
pub const SHUTDOWN: &str = "shutdown";
/// `exit` notification.
pub const EXIT: &str = "exit";
/// `$/cancelRequest` notification.
pub const CANCEL_REQUEST: &str = "$/cancelRequest";
/// `$/progress` notification.
pub const PROGRESS: &str = "$/progress";

/// Which way a method travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Sent by the server, handled by the client.
    ClientBound,
    /// Sent by the client, handled by the server.
    ServerBound,
    /// Sent by either side.
    Both,
}

impl Direction {
    /// Whether a method flowing this way may be handled by the `side` that
    /// receives `side`-bound traffic.
    #[must_use]
    pub const fn accepts(self, side: Self) -> bool {
        match (self, side) {
            (Self::Both, _) | (_, Self::Both) => true,
            (Self::ClientBound, Self::ClientBound) | (Self::ServerBound, Self::ServerBound) => {
                true
            }
            _ => false,
        }
    }
}

/// Whether a method expects a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    /// Exactly one response follows.
    Request,
    /// No response is sent.
    Notification,
}

/// Static description of one protocol method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    /// Wire name.
    pub name: &'static str,
    /// Direction of travel.
    pub direction: Direction,
    /// Request or notification.
    pub kind: MethodKind,
}

impl MethodDescriptor {
    const fn new(name: &'static str, direction: Direction, kind: MethodKind) -> Self {
        Self {
            name,
            direction,
            kind,
        }
    }

    const fn server_request(name: &'static str) -> Self {
        Self::new(name, Direction::ServerBound, MethodKind::Request)
    }

    const fn server_notification(name: &'static str) -> Self {
        Self::new(name, Direction::ServerBound, MethodKind::Notification)
    }

    const fn client_request(name: &'static str) -> Self {
        Self::new(name, Direction::ClientBound, MethodKind::Request)
    }

    const fn client_notification(name: &'static str) -> Self {
        Self::new(name, Direction::ClientBound, MethodKind::Notification)
    }

    const fn shared_notification(name: &'static str) -> Self {
        Self::new(name, Direction::Both, MethodKind::Notification)
    }

    /// Whether the side receiving `side`-bound traffic may handle this method.
    #[must_use]
    pub const fn accepts(&self, side: Direction) -> bool {
        self.direction.accepts(side)
    }

    /// Whether this is a request.
    #[must_use]
    pub const fn is_request(&self) -> bool {
        matches!(self.kind, MethodKind::Request)
    }

    /// Whether an outstanding call to this method is announced to the peer
    /// with `$/cancelRequest` when abandoned.
    ///
    /// The lifecycle requests are excluded: the peer has to answer them.
    #[must_use]
    pub fn is_cancellable(&self) -> bool {
        self.is_request() && self.name != INITIALIZE && self.name != SHUTDOWN
    }
}

/// Errors raised by [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The name is not part of the protocol.
    #[error("unknown method: {name}")]
    Unknown {
        /// Name that was looked up.
        name: String,
    },

    /// The name exists with the other kind.
    #[error("{name} is a {actual:?}, not a {expected:?}")]
    KindMismatch {
        /// Name that was looked up.
        name: &'static str,
        /// Kind the caller asked for.
        expected: MethodKind,
        /// Kind the registry records.
        actual: MethodKind,
    },
}

static METHODS: &[MethodDescriptor] = &[
    // lifecycle
    MethodDescriptor::server_request(INITIALIZE),
    MethodDescriptor::server_notification(INITIALIZED),
    MethodDescriptor::server_request(SHUTDOWN),
    MethodDescriptor::server_notification(EXIT),
    MethodDescriptor::client_request("client/registerCapability"),
    MethodDescriptor::client_request("client/unregisterCapability"),
    MethodDescriptor::server_notification("$/setTrace"),
    MethodDescriptor::client_notification("$/logTrace"),
    MethodDescriptor::shared_notification(CANCEL_REQUEST),
    MethodDescriptor::shared_notification(PROGRESS),
    // window
    MethodDescriptor::client_notification("window/showMessage"),
    MethodDescriptor::client_request("window/showMessageRequest"),
    MethodDescriptor::client_request("window/showDocument"),
    MethodDescriptor::client_notification("window/logMessage"),
    MethodDescriptor::client_request("window/workDoneProgress/create"),
    MethodDescriptor::server_notification("window/workDoneProgress/cancel"),
    MethodDescriptor::client_notification("telemetry/event"),
    // workspace
    MethodDescriptor::server_request("workspace/symbol"),
    MethodDescriptor::server_request("workspaceSymbol/resolve"),
    MethodDescriptor::client_request("workspace/configuration"),
    MethodDescriptor::server_notification("workspace/didChangeConfiguration"),
    MethodDescriptor::client_request("workspace/workspaceFolders"),
    MethodDescriptor::server_notification("workspace/didChangeWorkspaceFolders"),
    MethodDescriptor::server_request("workspace/willCreateFiles"),
    MethodDescriptor::server_notification("workspace/didCreateFiles"),
    MethodDescriptor::server_request("workspace/willRenameFiles"),
    MethodDescriptor::server_notification("workspace/didRenameFiles"),
    MethodDescriptor::server_request("workspace/willDeleteFiles"),
    MethodDescriptor::server_notification("workspace/didDeleteFiles"),
    MethodDescriptor::server_notification("workspace/didChangeWatchedFiles"),
    MethodDescriptor::server_request("workspace/executeCommand"),
    MethodDescriptor::client_request("workspace/applyEdit"),
    MethodDescriptor::server_request("workspace/diagnostic"),
    MethodDescriptor::client_request("workspace/codeLens/refresh"),
    MethodDescriptor::client_request("workspace/semanticTokens/refresh"),
    MethodDescriptor::client_request("workspace/inlayHint/refresh"),
    MethodDescriptor::client_request("workspace/inlineValue/refresh"),
    MethodDescriptor::client_request("workspace/diagnostic/refresh"),
    // text document synchronisation
    MethodDescriptor::server_notification("textDocument/didOpen"),
    MethodDescriptor::server_notification("textDocument/didChange"),
    MethodDescriptor::server_notification("textDocument/willSave"),
    MethodDescriptor::server_request("textDocument/willSaveWaitUntil"),
    MethodDescriptor::server_notification("textDocument/didSave"),
    MethodDescriptor::server_notification("textDocument/didClose"),
    // notebook document synchronisation
    MethodDescriptor::server_notification("notebookDocument/didOpen"),
    MethodDescriptor::server_notification("notebookDocument/didChange"),
    MethodDescriptor::server_notification("notebookDocument/didSave"),
    MethodDescriptor::server_notification("notebookDocument/didClose"),
    // language features
    MethodDescriptor::server_request("textDocument/declaration"),
    MethodDescriptor::server_request("textDocument/definition"),
    MethodDescriptor::server_request("textDocument/typeDefinition"),
    MethodDescriptor::server_request("textDocument/implementation"),
    MethodDescriptor::server_request("textDocument/references"),
    MethodDescriptor::server_request("textDocument/prepareCallHierarchy"),
    MethodDescriptor::server_request("callHierarchy/incomingCalls"),
    MethodDescriptor::server_request("callHierarchy/outgoingCalls"),
    MethodDescriptor::server_request("textDocument/prepareTypeHierarchy"),
    MethodDescriptor::server_request("typeHierarchy/supertypes"),
    MethodDescriptor::server_request("typeHierarchy/subtypes"),
    MethodDescriptor::server_request("textDocument/documentHighlight"),
    MethodDescriptor::server_request("textDocument/documentLink"),
    MethodDescriptor::server_request("documentLink/resolve"),
    MethodDescriptor::server_request("textDocument/hover"),
    MethodDescriptor::server_request("textDocument/codeLens"),
    MethodDescriptor::server_request("codeLens/resolve"),
    MethodDescriptor::server_request("textDocument/foldingRange"),
    MethodDescriptor::server_request("textDocument/selectionRange"),
    MethodDescriptor::server_request("textDocument/documentSymbol"),
    MethodDescriptor::server_request("textDocument/semanticTokens/full"),
    MethodDescriptor::server_request("textDocument/semanticTokens/full/delta"),
    MethodDescriptor::server_request("textDocument/semanticTokens/range"),
    MethodDescriptor::server_request("textDocument/inlayHint"),
    MethodDescriptor::server_request("inlayHint/resolve"),
    MethodDescriptor::server_request("textDocument/inlineValue"),
    MethodDescriptor::server_request("textDocument/moniker"),
    MethodDescriptor::server_request("textDocument/completion"),
    MethodDescriptor::server_request("completionItem/resolve"),
    MethodDescriptor::client_notification("textDocument/publishDiagnostics"),
    MethodDescriptor::server_request("textDocument/diagnostic"),
    MethodDescriptor::server_request("textDocument/signatureHelp"),
    MethodDescriptor::server_request("textDocument/codeAction"),
    MethodDescriptor::server_request("codeAction/resolve"),
    MethodDescriptor::server_request("textDocument/documentColor"),
    MethodDescriptor::server_request("textDocument/colorPresentation"),
    MethodDescriptor::server_request("textDocument/formatting"),
    MethodDescriptor::server_request("textDocument/rangeFormatting"),
    MethodDescriptor::server_request("textDocument/onTypeFormatting"),
    MethodDescriptor::server_request("textDocument/rename"),
    MethodDescriptor::server_request("textDocument/prepareRename"),
    MethodDescriptor::server_request("textDocument/linkedEditingRange"),
];

static INDEX: Lazy<HashMap<&'static str, &'static MethodDescriptor>> = Lazy::new(|| {
    METHODS
        .iter()
        .map(|descriptor| (descriptor.name, descriptor))
        .collect()
});

/// Looks up a method by wire name.
#[must_use]
pub fn lookup(name: &str) -> Option<&'static MethodDescriptor> {
    INDEX.get(name).copied()
}

/// Looks up a method and checks its kind.
///
/// # Errors
///
/// Returns [`RegistryError::Unknown`] for names outside the protocol and
/// [`RegistryError::KindMismatch`] when the name belongs to the other kind.
pub fn resolve(name: &str, kind: MethodKind) -> Result<&'static MethodDescriptor, RegistryError> {
    let descriptor = lookup(name).ok_or_else(|| RegistryError::Unknown {
        name: name.to_owned(),
    })?;
    if descriptor.kind != kind {
        return Err(RegistryError::KindMismatch {
            name: descriptor.name,
            expected: kind,
            actual: descriptor.kind,
        });
    }
    Ok(descriptor)
}

/// Every method, in table order.
pub fn iter() -> impl Iterator<Item = &'static MethodDescriptor> {
    METHODS.iter()
}

/// Every request method.
pub fn requests() -> impl Iterator<Item = &'static MethodDescriptor> {
    iter().filter(|descriptor| descriptor.kind == MethodKind::Request)
}

/// Every notification method.
pub fn notifications() -> impl Iterator<Item = &'static MethodDescriptor> {
    iter().filter(|descriptor| descriptor.kind == MethodKind::Notification)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rstest::rstest;

    use super::*;

    #[rstest]
    fn names_are_unique() {
        let names: HashSet<_> = iter().map(|descriptor| descriptor.name).collect();

        assert_eq!(names.len(), METHODS.len());
    }

    #[rstest]
    #[case("initialize", Direction::ServerBound, MethodKind::Request)]
    #[case("initialized", Direction::ServerBound, MethodKind::Notification)]
    #[case("textDocument/definition", Direction::ServerBound, MethodKind::Request)]
    #[case("textDocument/publishDiagnostics", Direction::ClientBound, MethodKind::Notification)]
    #[case("workspace/applyEdit", Direction::ClientBound, MethodKind::Request)]
    #[case("$/cancelRequest", Direction::Both, MethodKind::Notification)]
    #[case("$/progress", Direction::Both, MethodKind::Notification)]
    #[case("notebookDocument/didChange", Direction::ServerBound, MethodKind::Notification)]
    fn records_direction_and_kind(
        #[case] name: &str,
        #[case] direction: Direction,
        #[case] kind: MethodKind,
    ) {
        let descriptor = lookup(name).expect("method should be registered");

        assert_eq!(descriptor.direction, direction);
        assert_eq!(descriptor.kind, kind);
    }

    #[rstest]
    fn unknown_names_are_absent() {
        assert!(lookup("doesNotExist").is_none());
        assert_eq!(
            resolve("doesNotExist", MethodKind::Request),
            Err(RegistryError::Unknown {
                name: String::from("doesNotExist"),
            })
        );
    }

    #[rstest]
    fn resolve_checks_kind() {
        let error = resolve(EXIT, MethodKind::Request).expect_err("exit is a notification");

        assert_eq!(error.to_string(), "exit is a Notification, not a Request");
    }

    #[rstest]
    #[case(Direction::ServerBound, Direction::ServerBound, true)]
    #[case(Direction::ServerBound, Direction::ClientBound, false)]
    #[case(Direction::ClientBound, Direction::ServerBound, false)]
    #[case(Direction::Both, Direction::ClientBound, true)]
    #[case(Direction::Both, Direction::ServerBound, true)]
    fn direction_acceptance(#[case] method: Direction, #[case] side: Direction, #[case] expected: bool) {
        assert_eq!(method.accepts(side), expected);
    }

    #[rstest]
    #[case("initialize", false)]
    #[case("shutdown", false)]
    #[case("textDocument/hover", true)]
    #[case("workspace/configuration", true)]
    #[case("exit", false)]
    fn cancellable_requests(#[case] name: &str, #[case] expected: bool) {
        let descriptor = lookup(name).expect("method should be registered");

        assert_eq!(descriptor.is_cancellable(), expected);
    }

    #[rstest]
    fn partitions_requests_and_notifications() {
        assert_eq!(requests().count() + notifications().count(), iter().count());
        assert!(requests().all(MethodDescriptor::is_request));
        assert!(notifications().all(|descriptor| !descriptor.is_request()));
    }
}
