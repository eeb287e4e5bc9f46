//! Authentication extractors
//!
//! Verify the bearer token on each request and gate handlers by role.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::AuthService;
use crate::error::ApiError;
use crate::models::UserRole;

/// Authenticated user extracted from JWT token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub jti: String,
}

/// Extractor for authenticated users
///
/// Reads the `Authorization: Bearer` header, verifies the access token and
/// checks that its session is live and the account ACTIVE.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(user: AuthenticatedUser) -> impl IntoResponse {
///     format!("Hello, user {}", user.user_id)
/// }
/// ```
#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    ApiError::unauthorized(
                        "MISSING_TOKEN",
                        "Authorization header with Bearer token required",
                    )
                })?;

        let auth_service = Arc::<AuthService>::from_ref(state);
        auth_service.authenticate(bearer.token()).await
    }
}

/// Requires the ADMIN role
pub struct AdminUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !matches!(user.role, UserRole::Admin) {
            tracing::warn!(
                user_id = %user.user_id,
                role = %user.role.as_str(),
                path = %parts.uri.path(),
                "Admin access denied"
            );
            return Err(ApiError::Forbidden("Admin access required".to_string()));
        }

        Ok(AdminUser(user))
    }
}

/// Requires LOAN_OFFICER or ADMIN
pub struct StaffUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for StaffUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !user.role.is_staff() {
            tracing::warn!(
                user_id = %user.user_id,
                role = %user.role.as_str(),
                path = %parts.uri.path(),
                "Staff access denied"
            );
            return Err(ApiError::Forbidden(
                "Loan officer or admin access required".to_string(),
            ));
        }

        Ok(StaffUser(user))
    }
}
