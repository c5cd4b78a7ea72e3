//! Hide - Application Entry Point
//!
//! This is the main entry point for the Hide server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use bollard::Docker;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hide::{
    config::Config,
    constants::{CLEANUP_TIMEOUT, HTTP_TIMEOUT},
    devcontainer::{ContainerManager, DockerRunner, HostExecutor, ImageManager, RegistryCredentials},
    files::{FileManager, GitignoreMatcherFactory},
    git::CachingGitService,
    handlers,
    lsp::{DiagnosticsStore, LanguageDetector, LspServiceImpl, server_registry},
    project::{ProjectManager, ProjectManagerImpl, ProjectStore},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.server.rust_log.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Hide server...");

    if config.docker.user.is_none() || config.docker.token.is_none() {
        tracing::warn!(
            "DOCKER_USER or DOCKER_TOKEN environment variables are empty. \
             This might cause problems when pulling images from Docker Hub."
        );
    }

    // Initialize Docker client
    tracing::info!("Connecting to Docker...");
    let docker = Docker::connect_with_socket_defaults()?;

    // Verify Docker connection
    let docker_info = docker.version().await?;
    tracing::info!(
        "Connected to Docker version: {}",
        docker_info.version.unwrap_or_default()
    );

    // Prepare the on-disk state layout
    tokio::fs::create_dir_all(config.storage.projects_dir()).await?;
    tokio::fs::create_dir_all(config.storage.repositories_dir()).await?;

    // Wire up the orchestration core
    let credentials =
        RegistryCredentials::new(config.docker.user.clone(), config.docker.token.clone());
    let runner = DockerRunner::new(
        Arc::new(HostExecutor),
        ImageManager::new(docker.clone(), credentials),
        ContainerManager::new(docker),
    );
    let git = CachingGitService::new(config.storage.repositories_dir());
    let lsp = LspServiceImpl::new(
        server_registry(),
        Arc::new(DiagnosticsStore::new()),
        LanguageDetector::new(),
    );

    let manager: Arc<dyn ProjectManager> = Arc::new(ProjectManagerImpl::new(
        Arc::new(runner),
        Arc::new(git),
        Arc::new(ProjectStore::new()),
        config.storage.projects_dir(),
        Arc::new(FileManager::new(Arc::new(GitignoreMatcherFactory))),
        Arc::new(lsp),
        LanguageDetector::new(),
    ));

    // Create application state
    let state = AppState::new(Arc::clone(&manager), config.clone());

    // Build the router
    let app = Router::new()
        .merge(handlers::routes())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(HTTP_TIMEOUT))
        .with_state(state);

    // Start the server
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop containers and language servers before exiting
    tracing::info!("Server shutting down ...");
    if let Err(e) = manager.cleanup(CLEANUP_TIMEOUT).await {
        tracing::warn!(error = %e, "Failed to cleanup projects");
    }

    tracing::info!("Goodbye!");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
