//! HTTP route handlers for the Agent.

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rotor_common::RotorError;
use rotor_common::constants::paths::UPDATE_SECRET;
use serde::Serialize;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod health;
mod rotate;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let request_timeout = state.config.request_timeout();

    Router::new()
        // Health & Status
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/metrics", get(health::metrics))

        // Rotation RPC (Coordinator only)
        .route(UPDATE_SECRET, post(rotate::update_secret))

        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))

        // Add shared state
        .with_state(state)
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// A [`RotorError`] rendered as an HTTP response
pub struct ApiError(pub RotorError);

impl From<RotorError> for ApiError {
    fn from(err: RotorError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::AppConfig;
    use crate::secret_store::SecretStore;
    use axum::body::Body;
    use axum::http::Request;
    use rotor_common::HostId;
    use rotor_store::MemoryLedger;
    use std::sync::Arc;
    use tower::ServiceExt;

    /// State over a temp-dir secret (None = no secret file)
    pub async fn state_with(secret: Option<&str>) -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret_key");
        if let Some(secret) = secret {
            tokio::fs::write(&path, secret).await.unwrap();
        }
        let state = AppState::new(
            AppConfig::default(),
            HostId::parse("abc123").unwrap(),
            Arc::new(SecretStore::new(path)),
            Arc::new(MemoryLedger::new()),
        );
        (dir, state)
    }

    /// Drive one request through the router, returning status and JSON body
    pub async fn send(
        state: &AppState,
        request: Request<Body>,
    ) -> (StatusCode, serde_json::Value) {
        let response = create_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }
}
