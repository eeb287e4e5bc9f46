//! Loan product route definitions

use axum::{routing::get, Router};

use crate::handlers::loan_product;
use crate::state::AppState;

pub fn loan_product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/loan-products",
            get(loan_product::list_products).post(loan_product::create_product),
        )
        .route(
            "/api/loan-products/:id",
            get(loan_product::get_product)
                .put(loan_product::update_product)
                .delete(loan_product::delete_product),
        )
}
