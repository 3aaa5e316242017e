//! Rotation RPC: swap the live secret for a caller that proves it knows
//! the current one.

use axum::{Json, extract::State};
use rotor_common::{RotateRequest, RotateResponse, RotorError};

use super::ApiError;
use crate::state::{AgentStats, AppState};

/// Rotate the secret
///
/// Returns:
/// - 200: Secret replaced
/// - 400: `old_key` does not match, or `new_key` is empty
/// - 500: Secret missing or could not be written (nothing changed)
pub async fn update_secret(
    State(state): State<AppState>,
    Json(payload): Json<RotateRequest>,
) -> Result<Json<RotateResponse>, ApiError> {
    let stats = &state.stats;

    match state.secrets.rotate(&payload.old_key, &payload.new_key).await {
        Ok(()) => {
            AgentStats::incr(&stats.rotations_accepted);
            tracing::info!(host_id = %state.host_id, "🔑 Secret rotated");
            Ok(Json(RotateResponse::success()))
        }
        Err(e @ (RotorError::Unauthorized(_) | RotorError::InvalidInput(_))) => {
            AgentStats::incr(&stats.rotations_rejected);
            tracing::warn!(host_id = %state.host_id, error = %e, "Rotation rejected");
            Err(e.into())
        }
        Err(e) => {
            AgentStats::incr(&stats.rotations_failed);
            tracing::error!(host_id = %state.host_id, error = %e, "Rotation failed");
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{send, state_with};
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use rotor_common::hash_secret;
    use std::sync::atomic::Ordering;

    fn rotate(old_key: &str, new_key: &str) -> Request<Body> {
        let body = serde_json::json!({ "old_key": old_key, "new_key": new_key });
        Request::builder()
            .method("POST")
            .uri("/update_secret")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_rotation_succeeds_with_current_hash() {
        let (_dir, state) = state_with(Some("s3cr3t")).await;
        let old = hash_secret("s3cr3t");

        let (status, body) = send(&state, rotate(old.as_str(), "n3w")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(state.secrets.read().await.unwrap(), b"n3w");
        assert_eq!(state.stats.rotations_accepted.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_wrong_old_key_is_400_and_unchanged() {
        let (_dir, state) = state_with(Some("s3cr3t")).await;

        let (status, body) = send(&state, rotate(hash_secret("guess").as_str(), "n3w")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Invalid old key"));
        assert_eq!(state.secrets.read().await.unwrap(), b"s3cr3t");
        assert_eq!(state.stats.rotations_rejected.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_empty_new_key_is_400() {
        let (_dir, state) = state_with(Some("s3cr3t")).await;
        let (status, _) = send(&state, rotate(hash_secret("s3cr3t").as_str(), "")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(state.secrets.read().await.unwrap(), b"s3cr3t");
    }

    #[tokio::test]
    async fn test_missing_secret_is_500() {
        let (_dir, state) = state_with(None).await;
        let (status, _) = send(&state, rotate("anything", "n3w")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(state.stats.rotations_failed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_malformed_body_is_client_error() {
        let (_dir, state) = state_with(Some("s3cr3t")).await;
        let request = Request::builder()
            .method("POST")
            .uri("/update_secret")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let (status, _) = send(&state, request).await;
        assert!(status.is_client_error());
        assert_eq!(state.secrets.read().await.unwrap(), b"s3cr3t");
    }

    #[tokio::test]
    async fn test_stalled_rotation_times_out_with_408() {
        let (_dir, state) = state_with(Some("s3cr3t")).await;
        let state = crate::state::AppState {
            config: crate::config::AppConfig {
                request_timeout_secs: 1,
                ..Default::default()
            },
            ..state
        };

        let held = state.secrets.lock_exclusive().await;
        let (status, _) = send(&state, rotate(hash_secret("s3cr3t").as_str(), "n3w")).await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);

        drop(held);
        assert_eq!(state.secrets.read().await.unwrap(), b"s3cr3t");
    }
}
