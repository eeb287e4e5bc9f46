//! Loan application handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::{AuthenticatedUser, StaffUser};
use crate::error::ApiError;
use crate::loan_application::{
    ApproveRequest, CreateLoanApplicationRequest, CreatedApplication, ListApplicationsQuery,
    LoanApplication, LoanApplicationDetail, LoanApplicationSummary, RejectRequest,
    UpdateStatusRequest,
};
use crate::models::{ApiResponse, PaginatedResponse};
use crate::services::DashboardStats;
use crate::state::AppState;

/// POST /api/loan-applications - Customer creates a DRAFT application
pub async fn create_application(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<CreateLoanApplicationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedApplication>>), ApiError> {
    let created = state.loan_application_service.create(&user, req).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            created,
            "Loan application created successfully",
        )),
    ))
}

/// GET /api/loan-applications
pub async fn list_applications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ListApplicationsQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<LoanApplicationSummary>>>, ApiError> {
    let page = state.loan_application_service.list(&user, query).await?;

    Ok(Json(ApiResponse::ok(page)))
}

/// GET /api/loan-applications/:id
pub async fn get_application(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<LoanApplicationDetail>>, ApiError> {
    let detail = state.loan_application_service.get(&user, id).await?;

    Ok(Json(ApiResponse::ok(detail)))
}

/// PATCH /api/loan-applications/:id/status - Staff only, customers get 403
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<LoanApplication>>, ApiError> {
    let application = state
        .loan_application_service
        .update_status(&user, id, req)
        .await?;

    Ok(Json(ApiResponse::with_message(
        application,
        "Application status updated",
    )))
}

/// POST /api/loan-applications/:id/approve - Body optional
pub async fn approve_application(
    State(state): State<AppState>,
    StaffUser(user): StaffUser,
    Path(id): Path<Uuid>,
    body: Option<Json<ApproveRequest>>,
) -> Result<Json<ApiResponse<LoanApplication>>, ApiError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let application = state.loan_application_service.approve(&user, id, req).await?;

    Ok(Json(ApiResponse::with_message(
        application,
        "Application approved",
    )))
}

/// POST /api/loan-applications/:id/reject - Body optional
pub async fn reject_application(
    State(state): State<AppState>,
    StaffUser(user): StaffUser,
    Path(id): Path<Uuid>,
    body: Option<Json<RejectRequest>>,
) -> Result<Json<ApiResponse<LoanApplication>>, ApiError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let application = state.loan_application_service.reject(&user, id, req).await?;

    Ok(Json(ApiResponse::with_message(
        application,
        "Application rejected",
    )))
}

/// GET /api/loan-applications/dashboard/stats
pub async fn dashboard_stats(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<DashboardStats>>, ApiError> {
    let stats = state.dashboard_service.stats(&user).await?;

    Ok(Json(ApiResponse::ok(stats)))
}
