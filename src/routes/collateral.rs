//! Collateral route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::collateral::*;
use crate::state::AppState;

pub fn collateral_routes() -> Router<AppState> {
    Router::new()
        .route("/api/collaterals", get(list_collaterals))
        .route("/api/collaterals/valuation", get(valuation))
        .route(
            "/api/collaterals/customer/:customer_id",
            get(list_customer_collaterals),
        )
        .route("/api/collaterals/import-holdings", post(import_holdings))
        .route("/api/collaterals/pledge", post(pledge))
        .route("/api/collaterals/release", post(release))
}
