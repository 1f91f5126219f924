use anyhow::{Context, Result};
use std::time::Duration;

use tracing::{error, info};

use axum::{
    extract::{DefaultBodyLimit, State},
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use super::audio_routes::make_audio_routes;
use super::metrics::metrics_handler;
use super::{log_requests, state::*, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub time: String,
    pub uptime: String,
    pub hash: String,
    pub store: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        time: chrono::Utc::now().to_rfc3339(),
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        store: state.record_store.name().to_string(),
    };
    Json(stats)
}

pub fn make_app(config: ServerConfig, record_store: GuardedRecordStore) -> Router {
    let state = ServerState::new(record_store);

    let audio_routes: Router =
        make_audio_routes(state.clone()).layer(DefaultBodyLimit::max(config.max_upload_bytes));

    let home_router: Router = Router::new().route("/", get(home)).with_state(state);

    home_router.nest("/audio", audio_routes).layer(middleware::from_fn_with_state(
        config.requests_logging_level.clone(),
        log_requests,
    ))
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, stopping server");
}

pub async fn run_server(config: ServerConfig, record_store: GuardedRecordStore) -> Result<()> {
    let port = config.port;
    let metrics_port = config.metrics_port;
    let app = make_app(config, record_store);

    let metrics_listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;
    info!("Metrics available on port {}", metrics_port);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(metrics_listener, make_metrics_app()).await {
            error!("Metrics server stopped: {}", e);
        }
    });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on port {}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}
