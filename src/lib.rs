//! LMS Backend Library
//!
//! Loan management for loans against mutual fund holdings: authentication,
//! customer KYC, the product catalog, the loan application workflow and
//! collateral tracking.

pub mod auth;
pub mod collateral;
pub mod config;
pub mod customer;
pub mod db;
pub mod error;
pub mod handlers;
pub mod loan_application;
pub mod loan_product;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::config::Config;
use crate::middleware::RateLimiter;
use crate::state::AppState;

/// Assemble the full router with its middleware stack
pub fn build_app(state: AppState, config: &Config, rate_limiter: RateLimiter) -> Router {
    let api = Router::new()
        .merge(routes::auth_routes())
        .merge(routes::user_routes())
        .merge(routes::customer_routes())
        .merge(routes::loan_product_routes())
        .merge(routes::loan_application_routes())
        .merge(routes::collateral_routes())
        .layer(axum::middleware::from_fn(middleware::rate_limit_layer(
            rate_limiter,
        )));

    let mut app = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(api)
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::security_headers));

    if config.environment.is_production() {
        app = app.layer(axum::middleware::from_fn(middleware::hsts_header));
    }

    app.layer(axum::middleware::from_fn(middleware::request_tracing))
        .layer(configure_cors(config))
}

#[derive(Serialize)]
struct RootResponse {
    name: &'static str,
    version: &'static str,
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        name: "LMS API Server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    database: String,
    version: &'static str,
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match &state.db {
        Some(pool) => match db::check_health(pool).await {
            Ok(()) => "connected".to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Health check failed");
                "unavailable".to_string()
            }
        },
        None => "in-memory".to_string(),
    };

    let status = if database == "unavailable" {
        "unhealthy"
    } else {
        "healthy"
    };

    Json(HealthResponse {
        status,
        database,
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn configure_cors(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-api-key"),
        ])
        .allow_credentials(true)
}
