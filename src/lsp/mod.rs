//! Language server integration
//!
//! One client per (project, language) speaks LSP over stdio to a server
//! subprocess. Diagnostics published by the server land in a store keyed by
//! (project, document URI); file operations wait on that store with a bounded
//! delay instead of a fixed sleep.

pub mod client;
pub mod detector;
pub mod service;

pub use client::{ClientState, LspClient};
pub use detector::LanguageDetector;
pub use service::{DiagnosticsStore, LspService, LspServiceImpl};

use std::collections::HashMap;
use std::path::Path;

use lsp_types::SymbolKind;
use serde::Serialize;

/// How to start a language server for a given language id
#[derive(Debug, Clone)]
pub struct ServerCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ServerCommand {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// The static language-server registry
pub fn server_registry() -> HashMap<String, ServerCommand> {
    HashMap::from([
        ("go".to_string(), ServerCommand::new("gopls", &[])),
        (
            "python".to_string(),
            ServerCommand::new("pyright-langserver", &["--stdio"]),
        ),
    ])
}

/// A workspace symbol flattened for the HTTP surface
#[derive(Debug, Clone, Serialize)]
pub struct SymbolInfo {
    pub name: String,
    pub kind: i64,
    pub location: lsp_types::Location,
}

/// Client-side filter over workspace symbols by LSP symbol kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolFilter {
    pub include_kinds: Vec<i64>,
    pub exclude_kinds: Vec<i64>,
}

impl SymbolFilter {
    pub fn keeps(&self, symbol: &SymbolInfo) -> bool {
        if !self.include_kinds.is_empty() && !self.include_kinds.contains(&symbol.kind) {
            return false;
        }

        !self.exclude_kinds.contains(&symbol.kind)
    }
}

/// Numeric value of an LSP symbol kind
pub fn symbol_kind_number(kind: SymbolKind) -> i64 {
    serde_json::to_value(kind)
        .ok()
        .and_then(|value| value.as_i64())
        .unwrap_or(0)
}

/// `file://` URI for an absolute document path
pub fn path_to_uri(path: &Path) -> String {
    format!("file://{}", path.to_string_lossy())
}
