//! Customer route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::customer;
use crate::state::AppState;

pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/api/customers", get(customer::list_customers))
        .route(
            "/api/customers/:id",
            get(customer::get_customer).put(customer::update_customer),
        )
        .route("/api/customers/:id/kyc", post(customer::submit_kyc))
        .route("/api/customers/:id/verify-kyc", post(customer::verify_kyc))
}
