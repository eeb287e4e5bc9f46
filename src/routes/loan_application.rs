//! Loan application route definitions

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::handlers::loan_application as handlers;
use crate::state::AppState;

pub fn loan_application_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/loan-applications",
            get(handlers::list_applications).post(handlers::create_application),
        )
        .route(
            "/api/loan-applications/dashboard/stats",
            get(handlers::dashboard_stats),
        )
        .route("/api/loan-applications/:id", get(handlers::get_application))
        .route(
            "/api/loan-applications/:id/status",
            patch(handlers::update_status),
        )
        .route(
            "/api/loan-applications/:id/approve",
            post(handlers::approve_application),
        )
        .route(
            "/api/loan-applications/:id/reject",
            post(handlers::reject_application),
        )
}
