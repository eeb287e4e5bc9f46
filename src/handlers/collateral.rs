use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use super::{AuthenticatedUser, StaffUser};
use crate::collateral::{
    Collateral, CollateralFilter, CollateralService, ImportHoldingsRequest, PledgeRequest,
    ReleaseRequest, Valuation, ValuationQuery,
};
use crate::error::ApiError;
use crate::models::ApiResponse;

pub async fn import_holdings(
    State(service): State<Arc<CollateralService>>,
    user: AuthenticatedUser,
    Json(request): Json<ImportHoldingsRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<Collateral>>>), ApiError> {
    let holdings = service.import_holdings(&user, request).await?;
    let message = format!("Imported {} holdings", holdings.len());

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(holdings, message)),
    ))
}

pub async fn list_collaterals(
    State(service): State<Arc<CollateralService>>,
    user: AuthenticatedUser,
    Query(filter): Query<CollateralFilter>,
) -> Result<Json<ApiResponse<Vec<Collateral>>>, ApiError> {
    let holdings = service.list(&user, filter).await?;

    Ok(Json(ApiResponse::ok(holdings)))
}

pub async fn list_customer_collaterals(
    State(service): State<Arc<CollateralService>>,
    user: AuthenticatedUser,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Collateral>>>, ApiError> {
    let holdings = service.list_for_customer(&user, customer_id).await?;

    Ok(Json(ApiResponse::ok(holdings)))
}

pub async fn pledge(
    State(service): State<Arc<CollateralService>>,
    user: AuthenticatedUser,
    Json(request): Json<PledgeRequest>,
) -> Result<Json<ApiResponse<Vec<Collateral>>>, ApiError> {
    let pledged = service.pledge(&user, request).await?;

    Ok(Json(ApiResponse::with_message(
        pledged,
        "Collateral pledged successfully",
    )))
}

pub async fn release(
    State(service): State<Arc<CollateralService>>,
    StaffUser(user): StaffUser,
    Json(request): Json<ReleaseRequest>,
) -> Result<Json<ApiResponse<Vec<Collateral>>>, ApiError> {
    let released = service.release(&user, request).await?;

    Ok(Json(ApiResponse::with_message(
        released,
        "Collateral released successfully",
    )))
}

pub async fn valuation(
    State(service): State<Arc<CollateralService>>,
    user: AuthenticatedUser,
    Query(query): Query<ValuationQuery>,
) -> Result<Json<ApiResponse<Valuation>>, ApiError> {
    let valuation = service.valuation(&user, query).await?;

    Ok(Json(ApiResponse::ok(valuation)))
}
