//! HTTP handlers.

use std::net::SocketAddr;

use axum::Json;
use axum::body::to_bytes;
use axum::extract::{ConnectInfo, Path, Request, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use tracing::{info, warn};

use rollhook_state::AttemptId;
use rollhook_webhook::{WebhookKind, normalize};

use crate::ApiState;

/// Largest webhook body accepted. Registry payloads are a few KiB.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Response wrapper for consistent API format.
#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

// ── Intake ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Accepted {
    pub attempt: AttemptId,
    pub kind: WebhookKind,
}

/// POST /push
///
/// Records the notification and returns before any update work starts.
pub async fn push(State(state): State<ApiState>, request: Request) -> impl IntoResponse {
    let source = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let body = match to_bytes(request.into_body(), MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(e) => {
            warn!(%source, error = %e, "failed to read webhook body");
            return error_response("failed to read request body", StatusCode::BAD_REQUEST)
                .into_response();
        }
    };

    let payload = match normalize(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(%source, error = %e, "rejected webhook");
            return error_response(&e.to_string(), StatusCode::BAD_REQUEST).into_response();
        }
    };

    let kind = payload.kind();
    info!(%source, %kind, repository = payload.repository().unwrap_or("-"), "webhook received");
    let attempt = state.coordinator.enqueue(payload, &source);

    (StatusCode::ACCEPTED, ApiResponse::ok(Accepted { attempt, kind })).into_response()
}

// ── Status ─────────────────────────────────────────────────────

/// GET /api/v1/attempts
pub async fn list_attempts(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.coordinator.log().snapshot())
}

/// GET /api/v1/attempts/{id}
pub async fn get_attempt(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Ok(id) = id.parse::<AttemptId>() else {
        return error_response("invalid attempt id", StatusCode::BAD_REQUEST).into_response();
    };
    match state.coordinator.log().get(id) {
        Some(record) => ApiResponse::ok(record).into_response(),
        None => error_response("attempt not found", StatusCode::NOT_FOUND).into_response(),
    }
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub attempts: usize,
    pub in_flight: Option<AttemptId>,
}

/// GET /healthz
pub async fn healthz(State(state): State<ApiState>) -> impl IntoResponse {
    let log = state.coordinator.log();
    ApiResponse::ok(Health {
        status: "ok",
        attempts: log.len(),
        in_flight: log.in_flight(),
    })
}
