//! Staff user administration

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::AdminUser;
use crate::error::ApiError;
use crate::models::{ApiResponse, CreateStaffUserRequest, UserResponse};
use crate::state::AppState;

/// POST /api/users - Create a loan officer or admin
pub async fn create_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(req): Json<CreateStaffUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    let user = state.auth_service.create_staff_user(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(user, "User created successfully")),
    ))
}

/// GET /api/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user = state.auth_service.get_user(user_id).await?;

    Ok(Json(ApiResponse::ok(user)))
}
