//! Loan product catalog handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::AdminUser;
use crate::error::ApiError;
use crate::loan_product::{CreateLoanProductRequest, LoanProduct, UpdateLoanProductRequest};
use crate::models::ApiResponse;
use crate::state::AppState;

/// GET /api/loan-products - Active products, public
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<LoanProduct>>>, ApiError> {
    let products = state.loan_product_service.list().await?;

    Ok(Json(ApiResponse::ok(products)))
}

/// GET /api/loan-products/:id
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<LoanProduct>>, ApiError> {
    let product = state.loan_product_service.get(id).await?;

    Ok(Json(ApiResponse::ok(product)))
}

/// POST /api/loan-products
pub async fn create_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(req): Json<CreateLoanProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<LoanProduct>>), ApiError> {
    let product = state.loan_product_service.create(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            product,
            "Loan product created successfully",
        )),
    ))
}

/// PUT /api/loan-products/:id
pub async fn update_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateLoanProductRequest>,
) -> Result<Json<ApiResponse<LoanProduct>>, ApiError> {
    let product = state.loan_product_service.update(id, req).await?;

    Ok(Json(ApiResponse::with_message(
        product,
        "Loan product updated successfully",
    )))
}

/// DELETE /api/loan-products/:id - Soft delete
pub async fn delete_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<LoanProduct>>, ApiError> {
    let product = state.loan_product_service.deactivate(id).await?;

    Ok(Json(ApiResponse::with_message(
        product,
        "Loan product deactivated",
    )))
}
