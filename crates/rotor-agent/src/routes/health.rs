//! Health check endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::state::{AppState, StatsSnapshot};

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Basic health check (is the server running?)
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
pub struct ReadyResponse {
    status: &'static str,
    host_id: String,
}

/// Readiness check (is there a secret to serve?)
pub async fn ready_check(
    State(state): State<AppState>,
) -> Result<Json<ReadyResponse>, StatusCode> {
    match state.secrets.read().await {
        Ok(_) => Ok(Json(ReadyResponse {
            status: "ready",
            host_id: state.host_id.to_string(),
        })),
        Err(e) => {
            tracing::warn!(error = %e, "Not ready: secret unreadable");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

#[derive(Serialize)]
pub struct MetricsResponse {
    host_id: String,
    #[serde(flatten)]
    stats: StatsSnapshot,
}

/// Metrics endpoint (for monitoring)
pub async fn metrics(
    State(state): State<AppState>,
) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        host_id: state.host_id.to_string(),
        stats: state.stats.snapshot(),
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{send, state_with};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (_dir, state) = state_with(None).await;
        let (status, body) = send(&state, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_ready_requires_secret() {
        let (_dir, state) = state_with(None).await;
        let (status, _) = send(&state, get("/ready")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (_dir, state) = state_with(Some("s3cr3t")).await;
        let (status, body) = send(&state, get("/ready")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["host_id"], "abc123");
    }

    #[tokio::test]
    async fn test_metrics_never_expose_secret() {
        let (_dir, state) = state_with(Some("s3cr3t")).await;
        let (status, body) = send(&state, get("/metrics")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rotations_accepted"], 0);
        assert!(!body.to_string().contains("s3cr3t"));
    }
}
