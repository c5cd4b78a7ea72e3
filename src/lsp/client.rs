//! LSP client over stdio
//!
//! Speaks JSON-RPC 2.0 with `Content-Length` framing to a language-server
//! subprocess. A background reader resolves responses against a pending
//! request map and forwards `publishDiagnostics` notifications; server→client
//! requests are answered with a `null` result so servers do not stall waiting
//! for capabilities we do not implement.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lsp_types::{
    ClientCapabilities, DidChangeTextDocumentParams, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, InitializeParams, PublishDiagnosticsParams, WorkspaceFolder,
    WorkspaceSymbolParams, WorkspaceSymbolResponse,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};

use crate::error::{AppError, AppResult};
use crate::lsp::{ServerCommand, SymbolInfo, path_to_uri, symbol_kind_number};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Client lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Uninitialized,
    Initializing,
    Running,
    Stopping,
    Stopped,
}

type PendingRequests = Arc<Mutex<HashMap<i64, oneshot::Sender<AppResult<Value>>>>>;

/// A connection to one language-server subprocess
pub struct LspClient {
    state: Mutex<ClientState>,
    next_id: AtomicI64,
    pending: PendingRequests,
    outgoing: mpsc::UnboundedSender<String>,
    child: tokio::sync::Mutex<Child>,
}

impl LspClient {
    /// Spawn the server, perform the `initialize`/`initialized` handshake for
    /// the workspace, and return a running client.
    pub async fn start(
        server: &ServerCommand,
        workspace_root: &Path,
        diagnostics: mpsc::UnboundedSender<PublishDiagnosticsParams>,
    ) -> AppResult<Self> {
        tracing::debug!(program = %server.program, workspace = %workspace_root.display(), "Starting language server");

        let mut child = Command::new(&server.program)
            .args(&server.args)
            .current_dir(workspace_root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                AppError::Lsp(format!("failed to spawn {}: {e}", server.program))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| AppError::Lsp("language server stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AppError::Lsp("language server stdout unavailable".to_string()))?;
        let stderr = child.stderr.take();

        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<String>();
        let pending: PendingRequests = Arc::new(Mutex::new(HashMap::new()));

        tokio::spawn(async move {
            while let Some(body) = outgoing_rx.recv().await {
                let frame = format!("Content-Length: {}\r\n\r\n{}", body.len(), body);
                if stdin.write_all(frame.as_bytes()).await.is_err() {
                    break;
                }
                if stdin.flush().await.is_err() {
                    break;
                }
            }
        });

        {
            let pending = Arc::clone(&pending);
            let outgoing = outgoing.clone();
            let reader = BufReader::new(stdout);
            tokio::spawn(async move {
                read_loop(reader, pending, diagnostics, outgoing).await;
            });
        }

        if let Some(stderr) = stderr {
            let program = server.program.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(%program, %line, "Language server stderr");
                }
            });
        }

        let client = Self {
            state: Mutex::new(ClientState::Uninitialized),
            next_id: AtomicI64::new(1),
            pending,
            outgoing,
            child: tokio::sync::Mutex::new(child),
        };

        client.set_state(ClientState::Initializing);
        client.initialize(workspace_root).await?;
        client.set_state(ClientState::Running);

        Ok(client)
    }

    pub fn state(&self) -> ClientState {
        *self.state.lock().unwrap()
    }

    fn set_state(&self, state: ClientState) {
        *self.state.lock().unwrap() = state;
    }

    async fn initialize(&self, workspace_root: &Path) -> AppResult<()> {
        let uri: lsp_types::Uri = path_to_uri(workspace_root)
            .parse()
            .map_err(|_| AppError::Lsp(format!("invalid workspace uri for {workspace_root:?}")))?;

        let name = workspace_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "workspace".to_string());

        #[allow(deprecated)]
        let params = InitializeParams {
            root_uri: Some(uri.clone()),
            workspace_folders: Some(vec![WorkspaceFolder { uri, name }]),
            capabilities: ClientCapabilities::default(),
            ..Default::default()
        };

        self.request("initialize", serde_json::to_value(params).map_err(to_lsp_error)?)
            .await?;
        self.notify("initialized", json!({}))?;

        Ok(())
    }

    pub fn notify_did_open(&self, params: DidOpenTextDocumentParams) -> AppResult<()> {
        self.notify(
            "textDocument/didOpen",
            serde_json::to_value(params).map_err(to_lsp_error)?,
        )
    }

    pub fn notify_did_change(&self, params: DidChangeTextDocumentParams) -> AppResult<()> {
        self.notify(
            "textDocument/didChange",
            serde_json::to_value(params).map_err(to_lsp_error)?,
        )
    }

    pub fn notify_did_close(&self, params: DidCloseTextDocumentParams) -> AppResult<()> {
        self.notify(
            "textDocument/didClose",
            serde_json::to_value(params).map_err(to_lsp_error)?,
        )
    }

    /// `workspace/symbol` query, flattened to [`SymbolInfo`]
    pub async fn workspace_symbols(&self, query: &str) -> AppResult<Vec<SymbolInfo>> {
        let params = WorkspaceSymbolParams {
            query: query.to_string(),
            ..Default::default()
        };

        let result = self
            .request(
                "workspace/symbol",
                serde_json::to_value(params).map_err(to_lsp_error)?,
            )
            .await?;

        let response: Option<WorkspaceSymbolResponse> =
            serde_json::from_value(result).map_err(to_lsp_error)?;

        let symbols = match response {
            None => Vec::new(),
            Some(WorkspaceSymbolResponse::Flat(symbols)) => symbols
                .into_iter()
                .map(|symbol| SymbolInfo {
                    name: symbol.name,
                    kind: symbol_kind_number(symbol.kind),
                    location: symbol.location,
                })
                .collect(),
            Some(WorkspaceSymbolResponse::Nested(symbols)) => symbols
                .into_iter()
                .map(|symbol| {
                    let location = match symbol.location {
                        lsp_types::OneOf::Left(location) => location,
                        lsp_types::OneOf::Right(workspace) => lsp_types::Location {
                            uri: workspace.uri,
                            range: lsp_types::Range::default(),
                        },
                    };
                    SymbolInfo {
                        name: symbol.name,
                        kind: symbol_kind_number(symbol.kind),
                        location,
                    }
                })
                .collect(),
        };

        Ok(symbols)
    }

    /// Graceful shutdown: `shutdown` request (bounded), `exit` notification,
    /// then kill the subprocess.
    pub async fn stop_server(&self) -> AppResult<()> {
        self.set_state(ClientState::Stopping);

        let _ = tokio::time::timeout(SHUTDOWN_TIMEOUT, self.request("shutdown", Value::Null)).await;
        let _ = self.notify("exit", Value::Null);

        let mut child = self.child.lock().await;
        let _ = child.kill().await;

        self.set_state(ClientState::Stopped);

        Ok(())
    }

    async fn request(&self, method: &str, params: Value) -> AppResult<Value> {
        if self.state() == ClientState::Stopped {
            return Err(AppError::Lsp("language server is stopped".to_string()));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(id, tx);

        let body = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});
        self.send(body.to_string())?;

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(AppError::Lsp(format!(
                "language server closed before answering {method}"
            ))),
        }
    }

    fn notify(&self, method: &str, params: Value) -> AppResult<()> {
        if self.state() == ClientState::Stopped {
            return Err(AppError::Lsp("language server is stopped".to_string()));
        }

        let body = json!({"jsonrpc": "2.0", "method": method, "params": params});
        self.send(body.to_string())
    }

    fn send(&self, body: String) -> AppResult<()> {
        self.outgoing
            .send(body)
            .map_err(|_| AppError::Lsp("language server connection closed".to_string()))
    }
}

fn to_lsp_error(e: serde_json::Error) -> AppError {
    AppError::Lsp(format!("protocol serialization failed: {e}"))
}

#[derive(Debug, Deserialize)]
struct Incoming {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

async fn read_loop<R: AsyncBufRead + Unpin>(
    mut reader: R,
    pending: PendingRequests,
    diagnostics: mpsc::UnboundedSender<PublishDiagnosticsParams>,
    outgoing: mpsc::UnboundedSender<String>,
) {
    while let Some(body) = read_frame(&mut reader).await {
        let Ok(message) = serde_json::from_slice::<Incoming>(&body) else {
            tracing::warn!("Dropping unparseable language server message");
            continue;
        };

        dispatch(message, &pending, &diagnostics, &outgoing);
    }

    // EOF: fail everything still waiting for an answer.
    let mut pending = pending.lock().unwrap();
    for (_, tx) in pending.drain() {
        let _ = tx.send(Err(AppError::Lsp(
            "language server connection closed".to_string(),
        )));
    }
}

/// Read one `Content-Length`-framed message; `None` on EOF or framing error
async fn read_frame<R: AsyncBufRead + Unpin>(reader: &mut R) -> Option<Vec<u8>> {
    let mut content_length: Option<usize> = None;

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => return None,
            Ok(_) => {}
        }

        let line = line.trim_end();
        if line.is_empty() {
            break;
        }

        if let Some(value) = line.strip_prefix("Content-Length:") {
            content_length = value.trim().parse().ok();
        }
    }

    let length = content_length?;
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await.ok()?;

    Some(body)
}

fn dispatch(
    message: Incoming,
    pending: &PendingRequests,
    diagnostics: &mpsc::UnboundedSender<PublishDiagnosticsParams>,
    outgoing: &mpsc::UnboundedSender<String>,
) {
    match (message.id, message.method) {
        // Server-initiated request: acknowledge with a null result.
        (Some(id), Some(method)) => {
            tracing::debug!(method, "Answering server request with null result");
            let reply = json!({"jsonrpc": "2.0", "id": id, "result": null});
            let _ = outgoing.send(reply.to_string());
        }
        // Server notification.
        (None, Some(method)) => {
            if method == "textDocument/publishDiagnostics" {
                let Some(params) = message.params else { return };
                match serde_json::from_value::<PublishDiagnosticsParams>(params) {
                    Ok(params) => {
                        let _ = diagnostics.send(params);
                    }
                    Err(e) => tracing::warn!(error = %e, "Malformed publishDiagnostics"),
                }
            } else {
                tracing::trace!(method, "Ignoring server notification");
            }
        }
        // Response to one of our requests.
        (Some(id), None) => {
            let Some(id) = id.as_i64() else { return };
            let Some(tx) = pending.lock().unwrap().remove(&id) else {
                return;
            };

            let result = match message.error {
                Some(error) => Err(AppError::Lsp(format!(
                    "{} (code {})",
                    error.message, error.code
                ))),
                None => Ok(message.result.unwrap_or(Value::Null)),
            };

            let _ = tx.send(result);
        }
        (None, None) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn frame(body: &str) -> Vec<u8> {
        format!("Content-Length: {}\r\n\r\n{}", body.len(), body).into_bytes()
    }

    #[tokio::test]
    async fn test_read_frame() {
        let data = frame(r#"{"jsonrpc":"2.0","id":1,"result":null}"#);
        let mut reader = BufReader::new(Cursor::new(data));

        let body = read_frame(&mut reader).await.unwrap();
        assert_eq!(
            serde_json::from_slice::<Value>(&body).unwrap()["id"],
            json!(1)
        );
        assert!(read_frame(&mut reader).await.is_none());
    }

    #[tokio::test]
    async fn test_read_frame_with_extra_headers() {
        let body = r#"{"jsonrpc":"2.0","method":"x"}"#;
        let data = format!(
            "Content-Type: application/vscode-jsonrpc\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        let mut reader = BufReader::new(Cursor::new(data.into_bytes()));

        assert!(read_frame(&mut reader).await.is_some());
    }

    #[test]
    fn test_dispatch_resolves_pending_response() {
        let pending: PendingRequests = Arc::new(Mutex::new(HashMap::new()));
        let (diag_tx, _diag_rx) = mpsc::unbounded_channel();
        let (out_tx, _out_rx) = mpsc::unbounded_channel();

        let (tx, mut rx) = oneshot::channel();
        pending.lock().unwrap().insert(7, tx);

        let message: Incoming =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":7,"result":{"ok":true}}"#).unwrap();
        dispatch(message, &pending, &diag_tx, &out_tx);

        let result = rx.try_recv().unwrap().unwrap();
        assert_eq!(result["ok"], json!(true));
        assert!(pending.lock().unwrap().is_empty());
    }

    #[test]
    fn test_dispatch_error_response() {
        let pending: PendingRequests = Arc::new(Mutex::new(HashMap::new()));
        let (diag_tx, _diag_rx) = mpsc::unbounded_channel();
        let (out_tx, _out_rx) = mpsc::unbounded_channel();

        let (tx, mut rx) = oneshot::channel();
        pending.lock().unwrap().insert(3, tx);

        let message: Incoming = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":3,"error":{"code":-32601,"message":"method not found"}}"#,
        )
        .unwrap();
        dispatch(message, &pending, &diag_tx, &out_tx);

        assert!(matches!(rx.try_recv().unwrap(), Err(AppError::Lsp(_))));
    }

    #[test]
    fn test_dispatch_forwards_diagnostics() {
        let pending: PendingRequests = Arc::new(Mutex::new(HashMap::new()));
        let (diag_tx, mut diag_rx) = mpsc::unbounded_channel();
        let (out_tx, _out_rx) = mpsc::unbounded_channel();

        let message: Incoming = serde_json::from_str(
            r#"{
                "jsonrpc": "2.0",
                "method": "textDocument/publishDiagnostics",
                "params": {
                    "uri": "file:///tmp/p/main.go",
                    "diagnostics": [{
                        "range": {
                            "start": {"line": 0, "character": 0},
                            "end": {"line": 0, "character": 4}
                        },
                        "message": "undeclared name"
                    }]
                }
            }"#,
        )
        .unwrap();
        dispatch(message, &pending, &diag_tx, &out_tx);

        let params = diag_rx.try_recv().unwrap();
        assert_eq!(params.diagnostics.len(), 1);
        assert_eq!(params.diagnostics[0].message, "undeclared name");
    }

    #[test]
    fn test_dispatch_answers_server_requests() {
        let pending: PendingRequests = Arc::new(Mutex::new(HashMap::new()));
        let (diag_tx, _diag_rx) = mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();

        let message: Incoming = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":99,"method":"workspace/configuration","params":{}}"#,
        )
        .unwrap();
        dispatch(message, &pending, &diag_tx, &out_tx);

        let reply: Value = serde_json::from_str(&out_rx.try_recv().unwrap()).unwrap();
        assert_eq!(reply["id"], json!(99));
        assert_eq!(reply["result"], Value::Null);
    }
}
