//! Customer profile and KYC handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use super::{AuthenticatedUser, StaffUser};
use crate::customer::{CustomerListQuery, CustomerProfile, UpdateCustomerRequest, VerifyKycRequest};
use crate::error::ApiError;
use crate::models::{ApiResponse, PaginatedResponse};
use crate::state::AppState;

/// GET /api/customers - Staff listing, optional `kycStatus` filter
pub async fn list_customers(
    State(state): State<AppState>,
    StaffUser(user): StaffUser,
    Query(query): Query<CustomerListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<CustomerProfile>>>, ApiError> {
    let page = state.customer_service.list(&user, query).await?;

    Ok(Json(ApiResponse::ok(page)))
}

/// GET /api/customers/:id
pub async fn get_customer(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CustomerProfile>>, ApiError> {
    let profile = state.customer_service.get(&user, id).await?;

    Ok(Json(ApiResponse::ok(profile)))
}

/// PUT /api/customers/:id
pub async fn update_customer(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCustomerRequest>,
) -> Result<Json<ApiResponse<CustomerProfile>>, ApiError> {
    let profile = state.customer_service.update(&user, id, req).await?;

    Ok(Json(ApiResponse::with_message(
        profile,
        "Customer updated successfully",
    )))
}

/// POST /api/customers/:id/kyc - Owner submits KYC for review
pub async fn submit_kyc(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CustomerProfile>>, ApiError> {
    let profile = state.customer_service.submit_kyc(&user, id).await?;

    Ok(Json(ApiResponse::with_message(
        profile,
        "KYC submitted for verification",
    )))
}

/// POST /api/customers/:id/verify-kyc
pub async fn verify_kyc(
    State(state): State<AppState>,
    StaffUser(user): StaffUser,
    Path(id): Path<Uuid>,
    Json(req): Json<VerifyKycRequest>,
) -> Result<Json<ApiResponse<CustomerProfile>>, ApiError> {
    let profile = state.customer_service.verify_kyc(&user, id, req).await?;

    Ok(Json(ApiResponse::ok(profile)))
}
