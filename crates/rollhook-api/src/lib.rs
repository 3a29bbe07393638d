//! rollhook-api — HTTP surface of the daemon.
//!
//! Accepts registry push notifications and exposes the attempt log as
//! JSON. Mounts the dashboard at `/`.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/push` | Submit a Quay.io or Docker Hub webhook |
//! | GET | `/` | Dashboard |
//! | GET | `/api/v1/attempts` | Full attempt log |
//! | GET | `/api/v1/attempts/{id}` | One attempt |
//! | GET | `/healthz` | Liveness |
//!
//! Peer addresses are read from [`axum::extract::ConnectInfo`], so the
//! router must be served with
//! `into_make_service_with_connect_info::<SocketAddr>()`.

pub mod handlers;

use axum::Router;
use axum::routing::{get, post};
use rollhook_dashboard::DashboardState;
use rollhook_scheduler::Coordinator;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub coordinator: Coordinator,
}

/// Build the complete router (intake + status API + dashboard).
pub fn build_router(coordinator: Coordinator, controller: &str) -> Router {
    let dashboard_state = DashboardState {
        log: coordinator.log().clone(),
        controller: controller.to_string(),
    };
    let api_state = ApiState { coordinator };

    let api_routes = Router::new()
        .route("/attempts", get(handlers::list_attempts))
        .route("/attempts/{id}", get(handlers::get_attempt))
        .with_state(api_state.clone());

    Router::new()
        .route("/push", post(handlers::push))
        .route("/healthz", get(handlers::healthz))
        .with_state(api_state)
        .nest("/api/v1", api_routes)
        .merge(rollhook_dashboard::dashboard_router(dashboard_state))
}
