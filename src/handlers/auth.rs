//! Authentication HTTP handlers
//!
//! Email/password registration and login, token refresh, sessions.

use axum::{extract::State, http::StatusCode, Json};

use super::AuthenticatedUser;
use crate::auth::ProfileResponse;
use crate::error::ApiError;
use crate::models::{
    ApiResponse, AuthResponse, ChangePasswordRequest, LoginRequest, LogoutAllResponse,
    RefreshTokenRequest, RegisterRequest,
};
use crate::state::AppState;

/// POST /api/auth/register - Create a customer account
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), ApiError> {
    let response = state.auth_service.register(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            response,
            "User registered successfully",
        )),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, ApiError> {
    let response = state.auth_service.login(req).await?;

    Ok(Json(ApiResponse::with_message(response, "Login successful")))
}

/// POST /api/auth/refresh-token - Rotate the session's token pair
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, ApiError> {
    let response = state.auth_service.refresh(&req.refresh_token).await?;

    Ok(Json(ApiResponse::ok(response)))
}

/// GET /api/auth/profile
pub async fn profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<ProfileResponse>>, ApiError> {
    let profile = state.auth_service.profile(user.user_id).await?;

    Ok(Json(ApiResponse::ok(profile)))
}

/// POST /api/auth/change-password
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.auth_service.change_password(&user, req).await?;

    Ok(Json(ApiResponse::message("Password changed successfully")))
}

/// POST /api/auth/logout - Revoke current session
pub async fn logout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.auth_service.logout(&user.jti).await?;

    Ok(Json(ApiResponse::message("Logged out successfully")))
}

/// POST /api/auth/logout-all - Revoke every session of the current user
pub async fn logout_all(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<LogoutAllResponse>>, ApiError> {
    let revoked_sessions = state.auth_service.logout_all(user.user_id).await?;

    tracing::info!(
        user_id = %user.user_id,
        revoked_sessions = revoked_sessions,
        "Logged out of all sessions"
    );

    Ok(Json(ApiResponse::ok(LogoutAllResponse { revoked_sessions })))
}
