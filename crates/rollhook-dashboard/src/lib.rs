//! rollhook-dashboard — server-rendered status page.
//!
//! Renders the attempt log as a single HTML page, newest notification
//! first, with each record's progress trace and raw payload.
//!
//! # Routes
//!
//! | Route | Handler |
//! |---|---|
//! | `/` | Attempt history |

pub mod pages;
pub mod views;

use axum::Router;
use axum::routing::get;
use rollhook_state::AttemptLog;

/// Shared state for dashboard handlers.
#[derive(Clone)]
pub struct DashboardState {
    pub log: AttemptLog,
    /// Controller being updated, shown in the page header.
    pub controller: String,
}

/// Build the dashboard router.
pub fn dashboard_router(state: DashboardState) -> Router {
    Router::new()
        .route("/", get(pages::attempts))
        .with_state(state)
}
