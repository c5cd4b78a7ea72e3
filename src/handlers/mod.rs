//! HTTP Request Handlers
//!
//! This module contains all HTTP request handlers organized by domain.

pub mod files;
pub mod health;
pub mod projects;
pub mod search;
pub mod tasks;

use axum::Router;

use crate::state::AppState;

/// Create all API routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(projects::routes())
        .merge(tasks::routes())
        .merge(files::routes())
        .merge(search::routes())
}

/// Presence-style query flags: `?exact`, `?exact=true` and `?exact=1` all
/// enable the flag.
pub(crate) fn flag(value: &Option<String>) -> bool {
    matches!(value.as_deref(), Some("") | Some("true") | Some("1"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tokio::sync::oneshot;
    use tower::ServiceExt;

    use crate::config::{Config, DockerConfig, ServerConfig, StorageConfig};
    use crate::error::AppError;
    use crate::models::{DevContainerConfig, File, Project, Task};
    use crate::project::{MockProjectManager, TaskResult};
    use crate::state::AppState;

    #[test]
    fn test_flag_forms() {
        assert!(flag(&Some(String::new())));
        assert!(flag(&Some("true".to_string())));
        assert!(flag(&Some("1".to_string())));
        assert!(!flag(&Some("false".to_string())));
        assert!(!flag(&None));
    }

    fn app(manager: MockProjectManager) -> Router {
        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                rust_log: "info".to_string(),
            },
            docker: DockerConfig {
                user: None,
                token: None,
            },
            storage: StorageConfig {
                root: std::env::temp_dir().join("hide-handler-tests"),
            },
        };

        routes().with_state(AppState::new(Arc::new(manager), config))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, body)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn ready_receiver<T: Send + 'static>(value: T) -> oneshot::Receiver<T> {
        let (tx, rx) = oneshot::channel();
        tx.send(value).ok();
        rx
    }

    fn project(id: &str) -> Project {
        Project::new(
            id,
            format!("/home/dev/.hide/projects/{id}"),
            "container-1",
            DevContainerConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_create_project_created() {
        let mut manager = MockProjectManager::new();
        manager
            .expect_create_project()
            .returning(|_| ready_receiver(Ok(project("p1"))));

        let request = json_request(
            "POST",
            "/projects",
            json!({"repository": {"url": "https://github.com/x/y.git"}}),
        );
        let (status, body) = send(app(manager), request).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["id"], json!("p1"));
        assert_eq!(body["containerId"], json!("container-1"));
        assert_eq!(body["path"], json!("/home/dev/.hide/projects/p1"));
    }

    #[tokio::test]
    async fn test_create_project_invalid_url() {
        let request = json_request(
            "POST",
            "/projects",
            json!({"repository": {"url": "not a url"}}),
        );
        let (status, _) = send(app(MockProjectManager::new()), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_project_provisioning_failure() {
        let mut manager = MockProjectManager::new();
        manager
            .expect_create_project()
            .returning(|_| ready_receiver(Err(AppError::Docker("no daemon".to_string()))));

        let request = json_request(
            "POST",
            "/projects",
            json!({"repository": {"url": "https://github.com/x/y.git"}}),
        );
        let (status, _) = send(app(manager), request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_delete_project_no_content() {
        let mut manager = MockProjectManager::new();
        manager
            .expect_delete_project()
            .withf(|id| id == "p1")
            .returning(|_| ready_receiver(Ok(())));

        let request = Request::builder()
            .method("DELETE")
            .uri("/projects/p1")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app(manager), request).await;

        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_delete_missing_project_not_found() {
        let mut manager = MockProjectManager::new();
        manager
            .expect_delete_project()
            .returning(|id| ready_receiver(Err(AppError::ProjectNotFound(id.to_string()))));

        let request = Request::builder()
            .method("DELETE")
            .uri("/projects/ghost")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(manager), request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], json!("PROJECT_NOT_FOUND"));
    }

    #[tokio::test]
    async fn test_create_file_created() {
        let mut manager = MockProjectManager::new();
        manager
            .expect_create_file()
            .withf(|id, path, content| id == "p1" && path == "a.txt" && content == "hello\nworld")
            .returning(|_, path, content| Ok(File::new(path, content)));

        let request = json_request(
            "POST",
            "/projects/p1/files",
            json!({"path": "a.txt", "content": "hello\nworld"}),
        );
        let (status, body) = send(app(manager), request).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(
            body["lines"],
            json!([
                {"number": 1, "content": "hello"},
                {"number": 2, "content": "world"}
            ])
        );
    }

    #[tokio::test]
    async fn test_create_existing_file_conflict() {
        let mut manager = MockProjectManager::new();
        manager
            .expect_create_file()
            .returning(|_, path, _| Err(AppError::FileExists(path.to_string())));

        let request = json_request(
            "POST",
            "/projects/p1/files",
            json!({"path": "a.txt", "content": "x"}),
        );
        let (status, _) = send(app(manager), request).await;

        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_read_file_with_line_window() {
        let mut manager = MockProjectManager::new();
        manager
            .expect_read_file()
            .withf(|id, path| id == "p1" && path == "src/main.go")
            .returning(|_, path| Ok(File::new(path, "one\ntwo\nthree\nfour")));

        let request = get_request("/projects/p1/files/src/main.go?startLine=2&numLines=2");
        let (status, body) = send(app(manager), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["lines"],
            json!([
                {"number": 2, "content": "two"},
                {"number": 3, "content": "three"}
            ])
        );
    }

    #[tokio::test]
    async fn test_read_file_start_line_out_of_range() {
        let mut manager = MockProjectManager::new();
        manager
            .expect_read_file()
            .returning(|_, path| Ok(File::new(path, "only")));

        let request = get_request("/projects/p1/files/a.txt?startLine=5");
        let (status, _) = send(app(manager), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_file_linediff() {
        let mut manager = MockProjectManager::new();
        manager
            .expect_update_lines()
            .withf(|id, path, chunk| {
                id == "p1"
                    && path == "a.txt"
                    && chunk.start_line == 1
                    && chunk.end_line == 2
                    && chunk.content == "HELLO"
            })
            .returning(|_, path, _| Ok(File::new(path, "HELLO\nworld")));

        let request = json_request(
            "PUT",
            "/projects/p1/files/a.txt",
            json!({"type": "linediff", "linediff": {"startLine": 1, "endLine": 2, "content": "HELLO"}}),
        );
        let (status, body) = send(app(manager), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["lines"],
            json!([
                {"number": 1, "content": "HELLO"},
                {"number": 2, "content": "world"}
            ])
        );
    }

    #[tokio::test]
    async fn test_update_file_udiff() {
        let mut manager = MockProjectManager::new();
        manager
            .expect_apply_patch()
            .withf(|_, _, patch| patch.contains("+HELLO!"))
            .returning(|_, path, _| Ok(File::new(path, "HELLO!\nworld")));

        let patch = "--- a/a.txt\n+++ b/a.txt\n@@ -1,2 +1,2 @@\n-HELLO\n+HELLO!\n world\n";
        let request = json_request(
            "PUT",
            "/projects/p1/files/a.txt",
            json!({"type": "udiff", "udiff": {"patch": patch}}),
        );
        let (status, body) = send(app(manager), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["lines"][0]["content"], json!("HELLO!"));
    }

    #[tokio::test]
    async fn test_update_file_overwrite() {
        let mut manager = MockProjectManager::new();
        manager
            .expect_update_file()
            .returning(|_, path, content| Ok(File::new(path, content)));

        let request = json_request(
            "PUT",
            "/projects/p1/files/a.txt",
            json!({"type": "overwrite", "overwrite": {"content": "fresh"}}),
        );
        let (status, body) = send(app(manager), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["lines"][0]["content"], json!("fresh"));
    }

    #[tokio::test]
    async fn test_update_file_unknown_type() {
        let request = json_request(
            "PUT",
            "/projects/p1/files/a.txt",
            json!({"type": "replace", "overwrite": {"content": "x"}}),
        );
        let (status, _) = send(app(MockProjectManager::new()), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_file_no_content() {
        let mut manager = MockProjectManager::new();
        manager
            .expect_delete_file()
            .withf(|id, path| id == "p1" && path == "a.txt")
            .returning(|_, _| Ok(()));

        let request = Request::builder()
            .method("DELETE")
            .uri("/projects/p1/files/a.txt")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app(manager), request).await;

        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_list_files_passes_filter() {
        let mut manager = MockProjectManager::new();
        manager
            .expect_list_files()
            .withf(|id, show_hidden, filter| {
                id == "p1"
                    && *show_hidden
                    && filter.include == vec!["*.json".to_string(), "*.txt".to_string()]
                    && filter.exclude == vec!["node".to_string()]
            })
            .returning(|_, _, _| Ok(vec![File::empty("a.txt")]));

        let request =
            get_request("/projects/p1/files?showHidden&include=*.json,*.txt&exclude=node");
        let (status, body) = send(app(manager), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["path"], json!("a.txt"));
    }

    #[tokio::test]
    async fn test_search_case_insensitive() {
        let mut manager = MockProjectManager::new();
        manager.expect_search_content().returning(|_, _, _| {
            Ok(vec![File {
                path: "a.txt".to_string(),
                lines: vec![crate::models::Line {
                    number: 1,
                    content: "HELLO!".to_string(),
                }],
                diagnostics: None,
            }])
        });

        let request = get_request("/projects/p1/search?type=content&query=hello");
        let (status, body) = send(app(manager), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{"path": "a.txt", "lines": [{"number": 1, "content": "HELLO!"}]}])
        );
    }

    #[tokio::test]
    async fn test_search_requires_type_and_query() {
        let request = get_request("/projects/p1/search?query=x");
        let (status, _) = send(app(MockProjectManager::new()), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let request = get_request("/projects/p1/search?type=content");
        let (status, _) = send(app(MockProjectManager::new()), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_search_invalid_regex() {
        let request = get_request("/projects/p1/search?type=content&query=%5Bunclosed&regex");
        let (status, _) = send(app(MockProjectManager::new()), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_task_with_command() {
        let mut manager = MockProjectManager::new();
        manager
            .expect_create_task()
            .withf(|id, command| id == "p1" && command == "echo hi")
            .returning(|_, _| {
                Ok(TaskResult {
                    stdout: "hi\n".to_string(),
                    stderr: String::new(),
                    exit_code: 0,
                })
            });

        let request = json_request("POST", "/projects/p1/tasks", json!({"command": "echo hi"}));
        let (status, body) = send(app(manager), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"stdout": "hi\n", "stderr": "", "exitCode": 0})
        );
    }

    #[tokio::test]
    async fn test_create_task_with_alias() {
        let mut manager = MockProjectManager::new();
        manager
            .expect_resolve_task_alias()
            .withf(|id, alias| id == "p1" && alias == "test")
            .returning(|_, _| {
                Ok(Task {
                    alias: "test".to_string(),
                    command: "make test".to_string(),
                })
            });
        manager
            .expect_create_task()
            .withf(|_, command| command == "make test")
            .returning(|_, _| {
                Ok(TaskResult {
                    stdout: "ok".to_string(),
                    stderr: String::new(),
                    exit_code: 0,
                })
            });

        let request = json_request("POST", "/projects/p1/tasks", json!({"alias": "test"}));
        let (status, _) = send(app(manager), request).await;

        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_create_task_requires_exactly_one() {
        let request = json_request(
            "POST",
            "/projects/p1/tasks",
            json!({"command": "ls", "alias": "list"}),
        );
        let (status, _) = send(app(MockProjectManager::new()), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_tasks() {
        let mut manager = MockProjectManager::new();
        manager.expect_get_project().returning(|id| {
            let mut config = DevContainerConfig::default();
            config.customizations.hide.tasks = vec![Task {
                alias: "build".to_string(),
                command: "make".to_string(),
            }];
            Ok(Project::new(id, format!("/tmp/{id}"), "c1", config))
        });

        let request = get_request("/projects/p1/tasks");
        let (status, body) = send(app(manager), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([{"alias": "build", "command": "make"}]));
    }

    #[tokio::test]
    async fn test_search_symbols_without_server_not_found() {
        let mut manager = MockProjectManager::new();
        manager
            .expect_search_symbols()
            .returning(|id, _, _| Err(AppError::LanguageServerNotFound(id.to_string())));

        let request = get_request("/projects/p1/symbols?query=main");
        let (status, _) = send(app(manager), request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health() {
        let request = get_request("/health");
        let (status, body) = send(app(MockProjectManager::new()), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("healthy"));
    }
}
