use std::net::SocketAddr;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::bootstrap::{BootstrapStatus, Phase, StatusBoard};
use crate::error::{BootstrapError, Result};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub bootstrap: BootstrapStatus,
}

/// 200 once the custom model is registered and the daemon is being supervised.
pub async fn health_check(State(board): State<StatusBoard>) -> impl IntoResponse {
    let bootstrap = board.snapshot().await;
    let healthy = bootstrap.phase == Phase::Supervising && bootstrap.registered;

    let (code, status) = if healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "starting")
    };
    let response = HealthResponse {
        status: status.to_string(),
        timestamp: Utc::now(),
        bootstrap,
    };

    (code, Json(response))
}

pub fn router(board: StatusBoard) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .with_state(board)
}

/// Bind `addr` and serve the health endpoint in the background.
pub async fn spawn(addr: SocketAddr, board: StatusBoard) -> Result<(SocketAddr, JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| BootstrapError::HealthEndpoint { addr, source })?;
    let local = listener
        .local_addr()
        .map_err(|source| BootstrapError::HealthEndpoint { addr, source })?;

    tracing::info!("Health endpoint listening on http://{}/health", local);

    let app = router(board);
    let handle = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            tracing::error!(error = %err, "Health endpoint stopped");
        }
    });

    Ok((local, handle))
}
