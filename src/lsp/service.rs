//! LSP service: per-project client pool and diagnostics store

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use lsp_types::Diagnostic;
use tokio::sync::mpsc;

use crate::error::{AppError, AppResult};
use crate::lsp::client::LspClient;
use crate::lsp::detector::LanguageDetector;
use crate::lsp::{ServerCommand, SymbolFilter, SymbolInfo, path_to_uri};
use crate::models::{File, Project, ProjectId};

/// Diagnostics keyed by (project, document URI), last-write-wins per URI.
/// Waiters are woken on every publication so reads can block on "first
/// publish or deadline" instead of sleeping a fixed interval.
#[derive(Default)]
pub struct DiagnosticsStore {
    inner: Mutex<HashMap<(ProjectId, String), Vec<Diagnostic>>>,
    changed: tokio::sync::Notify,
}

impl DiagnosticsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, project_id: &str, uri: &str, diagnostics: Vec<Diagnostic>) {
        self.inner
            .lock()
            .unwrap()
            .insert((project_id.to_string(), uri.to_string()), diagnostics);
        self.changed.notify_waiters();
    }

    pub fn get(&self, project_id: &str, uri: &str) -> Option<Vec<Diagnostic>> {
        self.inner
            .lock()
            .unwrap()
            .get(&(project_id.to_string(), uri.to_string()))
            .cloned()
    }

    /// Diagnostics for the document, waiting up to `max_delay` for the first
    /// publication. On deadline, whatever is cached (possibly nothing) is
    /// returned; later publications stay cached for subsequent reads.
    pub async fn wait_for(
        &self,
        project_id: &str,
        uri: &str,
        max_delay: Duration,
    ) -> Vec<Diagnostic> {
        let deadline = tokio::time::Instant::now() + max_delay;

        loop {
            let notified = self.changed.notified();

            if let Some(diagnostics) = self.get(project_id, uri) {
                return diagnostics;
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.get(project_id, uri).unwrap_or_default();
            }
        }
    }

    pub fn drop_project(&self, project_id: &str) {
        self.inner
            .lock()
            .unwrap()
            .retain(|(project, _), _| project != project_id);
    }
}

/// Language server operations used by the project manager
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LspService: Send + Sync {
    /// Start a server for the language if one is registered
    async fn start_server(&self, project: &Project, language_id: &str) -> AppResult<()>;

    async fn notify_did_open(&self, project: &Project, file: &File) -> AppResult<()>;

    async fn notify_did_close(&self, project: &Project, file: &File) -> AppResult<()>;

    /// Diagnostics for the file, waiting up to `max_delay`
    async fn diagnostics(
        &self,
        project: &Project,
        file: &File,
        max_delay: Duration,
    ) -> AppResult<Vec<Diagnostic>>;

    async fn workspace_symbols(
        &self,
        project: &Project,
        query: &str,
        filter: &SymbolFilter,
    ) -> AppResult<Vec<SymbolInfo>>;

    /// Stop and drop every client and diagnostic of the project
    async fn cleanup_project(&self, project_id: &str) -> AppResult<()>;
}

type ClientKey = (ProjectId, String);

/// Service implementation owning the client pool
pub struct LspServiceImpl {
    clients: tokio::sync::Mutex<HashMap<ClientKey, Arc<LspClient>>>,
    registry: HashMap<String, ServerCommand>,
    diagnostics: Arc<DiagnosticsStore>,
    detector: LanguageDetector,
}

impl LspServiceImpl {
    pub fn new(
        registry: HashMap<String, ServerCommand>,
        diagnostics: Arc<DiagnosticsStore>,
        detector: LanguageDetector,
    ) -> Self {
        Self {
            clients: tokio::sync::Mutex::new(HashMap::new()),
            registry,
            diagnostics,
            detector,
        }
    }

    /// Language id of a file, or `LanguageServerNotFound` when the extension
    /// is unknown
    fn language_of(&self, file: &File) -> AppResult<String> {
        self.detector
            .detect_language(&file.path)
            .map(str::to_string)
            .ok_or_else(|| AppError::LanguageServerNotFound(file.path.clone()))
    }

    async fn get_or_create_client(
        &self,
        project: &Project,
        language_id: &str,
    ) -> AppResult<Arc<LspClient>> {
        let key = (project.id.clone(), language_id.to_string());
        let mut clients = self.clients.lock().await;

        if let Some(client) = clients.get(&key) {
            return Ok(Arc::clone(client));
        }

        let server = self
            .registry
            .get(language_id)
            .ok_or_else(|| AppError::LanguageServerNotFound(language_id.to_string()))?;

        tracing::debug!(project_id = %project.id, language_id, "Creating LSP client");

        let (tx, mut rx) = mpsc::unbounded_channel();
        let client = Arc::new(LspClient::start(server, &project.path, tx).await?);

        // Single writer per project/language: this pump feeds the store.
        let store = Arc::clone(&self.diagnostics);
        let project_id = project.id.clone();
        tokio::spawn(async move {
            while let Some(params) = rx.recv().await {
                tracing::debug!(%project_id, uri = %params.uri.as_str(), "Received diagnostics");
                store.publish(&project_id, params.uri.as_str(), params.diagnostics);
            }
        });

        clients.insert(key, Arc::clone(&client));

        Ok(client)
    }

    fn document_uri(&self, project: &Project, file: &File) -> String {
        path_to_uri(&project.path.join(&file.path))
    }
}

#[async_trait]
impl LspService for LspServiceImpl {
    async fn start_server(&self, project: &Project, language_id: &str) -> AppResult<()> {
        self.get_or_create_client(project, language_id).await?;
        Ok(())
    }

    async fn notify_did_open(&self, project: &Project, file: &File) -> AppResult<()> {
        let language_id = self.language_of(file)?;
        let client = self.get_or_create_client(project, &language_id).await?;

        let uri = self
            .document_uri(project, file)
            .parse()
            .map_err(|_| AppError::Lsp(format!("invalid document uri for {}", file.path)))?;

        client.notify_did_open(lsp_types::DidOpenTextDocumentParams {
            text_document: lsp_types::TextDocumentItem {
                uri,
                language_id,
                version: 1,
                text: file.get_content(),
            },
        })
    }

    async fn notify_did_close(&self, project: &Project, file: &File) -> AppResult<()> {
        let language_id = self.language_of(file)?;
        let client = self.get_or_create_client(project, &language_id).await?;

        let uri = self
            .document_uri(project, file)
            .parse()
            .map_err(|_| AppError::Lsp(format!("invalid document uri for {}", file.path)))?;

        client.notify_did_close(lsp_types::DidCloseTextDocumentParams {
            text_document: lsp_types::TextDocumentIdentifier { uri },
        })
    }

    async fn diagnostics(
        &self,
        project: &Project,
        file: &File,
        max_delay: Duration,
    ) -> AppResult<Vec<Diagnostic>> {
        let uri = self.document_uri(project, file);

        Ok(self
            .diagnostics
            .wait_for(&project.id, &uri, max_delay)
            .await)
    }

    async fn workspace_symbols(
        &self,
        project: &Project,
        query: &str,
        filter: &SymbolFilter,
    ) -> AppResult<Vec<SymbolInfo>> {
        let clients: Vec<Arc<LspClient>> = {
            let clients = self.clients.lock().await;
            clients
                .iter()
                .filter(|((project_id, _), _)| *project_id == project.id)
                .map(|(_, client)| Arc::clone(client))
                .collect()
        };

        if clients.is_empty() {
            return Err(AppError::LanguageServerNotFound(project.id.clone()));
        }

        let mut symbols = Vec::new();
        for client in clients {
            symbols.extend(client.workspace_symbols(query).await?);
        }

        symbols.retain(|symbol| filter.keeps(symbol));

        Ok(symbols)
    }

    async fn cleanup_project(&self, project_id: &str) -> AppResult<()> {
        let removed: Vec<(ClientKey, Arc<LspClient>)> = {
            let mut clients = self.clients.lock().await;
            let keys: Vec<ClientKey> = clients
                .keys()
                .filter(|(project, _)| project == project_id)
                .cloned()
                .collect();

            keys.into_iter()
                .filter_map(|key| clients.remove(&key).map(|client| (key, client)))
                .collect()
        };

        for ((_, language_id), client) in removed {
            tracing::debug!(project_id, %language_id, "Stopping LSP client");
            if let Err(e) = client.stop_server().await {
                tracing::warn!(project_id, %language_id, error = %e, "Failed to stop LSP client");
            }
        }

        self.diagnostics.drop_project(project_id);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lsp::server_registry;
    use crate::models::DevContainerConfig;

    fn project() -> Project {
        Project::new("p1", "/tmp/p1", "c1", DevContainerConfig::default())
    }

    fn service() -> LspServiceImpl {
        LspServiceImpl::new(
            server_registry(),
            Arc::new(DiagnosticsStore::new()),
            LanguageDetector::new(),
        )
    }

    #[test]
    fn test_store_publish_and_get() {
        let store = DiagnosticsStore::new();
        assert!(store.get("p1", "file:///a.go").is_none());

        store.publish("p1", "file:///a.go", vec![]);
        assert_eq!(store.get("p1", "file:///a.go"), Some(vec![]));
    }

    #[test]
    fn test_store_last_write_wins() {
        let store = DiagnosticsStore::new();
        let diagnostic = Diagnostic {
            message: "first".to_string(),
            ..Default::default()
        };

        store.publish("p1", "file:///a.go", vec![diagnostic.clone()]);
        store.publish("p1", "file:///a.go", vec![]);
        assert_eq!(store.get("p1", "file:///a.go"), Some(vec![]));
    }

    #[tokio::test]
    async fn test_wait_for_unblocks_on_publish() {
        let store = Arc::new(DiagnosticsStore::new());

        let waiter = Arc::clone(&store);
        let handle = tokio::spawn(async move {
            waiter
                .wait_for("p1", "file:///a.go", Duration::from_secs(5))
                .await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        store.publish(
            "p1",
            "file:///a.go",
            vec![Diagnostic {
                message: "oops".to_string(),
                ..Default::default()
            }],
        );

        let diagnostics = handle.await.unwrap();
        assert_eq!(diagnostics.len(), 1);
    }

    #[tokio::test]
    async fn test_wait_for_deadline_returns_empty() {
        let store = DiagnosticsStore::new();
        let diagnostics = store
            .wait_for("p1", "file:///a.go", Duration::from_millis(20))
            .await;
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_store_drop_project() {
        let store = DiagnosticsStore::new();
        store.publish("p1", "file:///a.go", vec![]);
        store.publish("p2", "file:///b.go", vec![]);

        store.drop_project("p1");
        assert!(store.get("p1", "file:///a.go").is_none());
        assert!(store.get("p2", "file:///b.go").is_some());
    }

    #[tokio::test]
    async fn test_unknown_language_is_not_found() {
        let service = service();
        let err = service
            .start_server(&project(), "cobol")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::LanguageServerNotFound(_)));
    }

    #[tokio::test]
    async fn test_did_open_unknown_extension_is_not_found() {
        let service = service();
        let file = File::new("notes.txt", "hello");
        let err = service
            .notify_did_open(&project(), &file)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::LanguageServerNotFound(_)));
    }

    #[tokio::test]
    async fn test_symbols_without_clients_is_not_found() {
        let service = service();
        let err = service
            .workspace_symbols(&project(), "main", &SymbolFilter::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::LanguageServerNotFound(_)));
    }
}
