use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dreammesh_api::config::ServerConfig;
use dreammesh_api::files::FileMaterializer;
use dreammesh_api::router::build_app_router;
use dreammesh_api::runner::JobRunner;
use dreammesh_api::state::AppState;
use dreammesh_api::store::TaskStore;
use dreammesh_api::background::retention;
use dreammesh_pipeline::PipelineSet;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dreammesh_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    config
        .create_dirs()
        .expect("Failed to create configured directories");
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Pipelines (process-wide singletons) ---
    let pipelines = Arc::new(
        PipelineSet::load(&config.pipeline_config()).expect("Failed to load generation pipelines"),
    );

    // --- Orchestration ---
    let store = TaskStore::new();
    let materializer = FileMaterializer::new(config.save_dir.clone(), config.max_output_files);
    let runner = JobRunner::new(
        store.clone(),
        Arc::clone(&pipelines),
        materializer.clone(),
        config.pipeline_concurrency,
    );

    // Spawn artifact retention (best-effort cap on the output directory).
    let retention_cancel = tokio_util::sync::CancellationToken::new();
    let retention_handle = tokio::spawn(retention::run(
        materializer,
        retention_cancel.clone(),
    ));

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        store,
        runner: runner.clone(),
        pipelines,
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Let in-flight generation jobs finish (bounded wait; a stuck pipeline
    // call would otherwise hold the process forever).
    runner.tracker().close();
    if tokio::time::timeout(Duration::from_secs(30), runner.tracker().wait())
        .await
        .is_err()
    {
        tracing::warn!("Timed out waiting for in-flight generation jobs");
    }

    // Stop the retention loop.
    retention_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), retention_handle).await;
    tracing::info!("Artifact retention stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
