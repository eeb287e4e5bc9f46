//! Authentication service
//!
//! Registration, login, token refresh, revocable sessions and the
//! per-request check that turns a bearer token into an actor.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use super::jwt::{
    generate_access_token, generate_refresh_token, get_user_id_from_claims, verify_token_of_type,
    TokenType,
};
use super::password::{hash_password, verify_password};
use super::repository::{SessionRepository, UserRepository};
use crate::config::Config;
use crate::customer::{Customer, CustomerProfile, CustomerRepository, KycStatus};
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthenticatedUser;
use crate::models::{
    AuthResponse, AuthSession, AuthTokens, ChangePasswordRequest, CreateStaffUserRequest,
    LoginRequest, RegisterRequest, User, UserResponse, UserRole, UserStatus,
};
use crate::utils::{generate_customer_code, sha256_hex};

/// Token and hashing parameters
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub access_token_ttl_seconds: i64,
    pub refresh_token_ttl_days: i64,
    pub bcrypt_cost: u32,
}

impl From<&Config> for AuthSettings {
    fn from(config: &Config) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
            access_token_ttl_seconds: config.jwt_access_token_ttl_seconds,
            refresh_token_ttl_days: config.jwt_refresh_token_ttl_days,
            bcrypt_cost: config.bcrypt_cost,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub user: UserResponse,
    pub customer: Option<CustomerProfile>,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    customers: Arc<dyn CustomerRepository>,
    settings: AuthSettings,
}

fn invalid_credentials() -> ApiError {
    ApiError::unauthorized("INVALID_CREDENTIALS", "Invalid email or password")
}

fn account_inactive() -> ApiError {
    ApiError::unauthorized("ACCOUNT_INACTIVE", "Your account is inactive")
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
        customers: Arc<dyn CustomerRepository>,
        settings: AuthSettings,
    ) -> Self {
        Self {
            users,
            sessions,
            customers,
            settings,
        }
    }

    /// Self-registration: CUSTOMER user plus PENDING-KYC profile
    pub async fn register(&self, request: RegisterRequest) -> ApiResult<AuthResponse> {
        request.validate()?;

        let email = request.email.trim().to_lowercase();
        let pan_number = request.pan_number.trim().to_ascii_uppercase();

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(ApiError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }
        if self.customers.find_by_pan(&pan_number).await?.is_some() {
            return Err(ApiError::Conflict(
                "Customer with this PAN already exists".to_string(),
            ));
        }

        let password_hash = hash_password(&request.password, self.settings.bcrypt_cost).await?;
        let now = Utc::now();

        let user = User {
            id: Uuid::new_v4(),
            email: email.clone(),
            password_hash,
            role: UserRole::Customer,
            status: UserStatus::Active,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };

        let aadhaar = request.aadhaar_number.trim();
        let customer = Customer {
            id: Uuid::new_v4(),
            user_id: user.id,
            customer_code: generate_customer_code(),
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            email,
            phone_number: request.phone_number,
            date_of_birth: request.date_of_birth,
            pan_number,
            aadhaar_hash: sha256_hex(aadhaar),
            aadhaar_last4: aadhaar[aadhaar.len().saturating_sub(4)..].to_string(),
            address_line1: request.address.line1,
            address_line2: request.address.line2,
            city: request.address.city,
            state: request.address.state,
            pincode: request.address.pincode,
            annual_income: None,
            occupation: None,
            kyc_status: KycStatus::Pending,
            kyc_verified_at: None,
            kyc_verified_by_id: None,
            kyc_remarks: None,
            created_at: now,
            updated_at: now,
        };

        let (user, customer) = self.users.create_with_customer(&user, &customer).await?;
        let tokens = self.issue_tokens(&user).await?;

        tracing::info!(
            user_id = %user.id,
            customer_code = %customer.customer_code,
            "Customer registered"
        );

        Ok(AuthResponse {
            user: user.into(),
            customer: Some(customer.summary()),
            tokens,
        })
    }

    pub async fn login(&self, request: LoginRequest) -> ApiResult<AuthResponse> {
        request.validate()?;
        let email = request.email.trim().to_lowercase();

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(invalid_credentials)?;

        if !verify_password(&request.password, &user.password_hash).await? {
            tracing::warn!(user_id = %user.id, "Failed login attempt");
            return Err(invalid_credentials());
        }
        if !user.is_active() {
            return Err(account_inactive());
        }

        let now = Utc::now();
        self.users.record_login(user.id, now).await?;
        let tokens = self.issue_tokens(&user).await?;
        let customer = self.customers.find_by_user_id(user.id).await?;

        tracing::info!(user_id = %user.id, role = %user.role.as_str(), "User logged in");

        Ok(AuthResponse {
            user: UserResponse {
                last_login_at: Some(now),
                ..UserResponse::from(user)
            },
            customer: customer.map(|c| c.summary()),
            tokens,
        })
    }

    /// Exchange a refresh token for a new pair; the old pair stops working
    pub async fn refresh(&self, refresh_token: &str) -> ApiResult<AuthResponse> {
        let claims =
            verify_token_of_type(refresh_token, &self.settings.jwt_secret, TokenType::Refresh)?;
        let now = Utc::now();

        let session = self
            .sessions
            .find_live_by_refresh_hash(&sha256_hex(refresh_token), now)
            .await?
            .ok_or_else(|| ApiError::unauthorized("SESSION_REVOKED", "Session is no longer valid"))?;

        if get_user_id_from_claims(&claims)? != session.user_id {
            return Err(ApiError::unauthorized("INVALID_TOKEN", "Invalid token"));
        }

        let user = self.active_user(session.user_id).await?;

        let jti = Uuid::new_v4().to_string();
        let (tokens, refresh_hash) = self.sign_pair(&user, &jti)?;
        let expires_at = now + Duration::days(self.settings.refresh_token_ttl_days);

        if !self
            .sessions
            .rotate(session.id, &jti, &refresh_hash, expires_at, now)
            .await?
        {
            return Err(ApiError::unauthorized(
                "SESSION_REVOKED",
                "Session is no longer valid",
            ));
        }

        let customer = self.customers.find_by_user_id(user.id).await?;
        Ok(AuthResponse {
            user: user.into(),
            customer: customer.map(|c| c.summary()),
            tokens,
        })
    }

    pub async fn logout(&self, jti: &str) -> ApiResult<()> {
        if !self.sessions.revoke(jti, Utc::now()).await? {
            return Err(ApiError::unauthorized(
                "SESSION_REVOKED",
                "Session already revoked",
            ));
        }
        Ok(())
    }

    pub async fn logout_all(&self, user_id: Uuid) -> ApiResult<u64> {
        let revoked = self.sessions.revoke_all(user_id, None, Utc::now()).await?;
        tracing::info!(user_id = %user_id, revoked = revoked, "Revoked all sessions");
        Ok(revoked)
    }

    pub async fn profile(&self, user_id: Uuid) -> ApiResult<ProfileResponse> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
        let customer = self.customers.find_by_user_id(user_id).await?;

        Ok(ProfileResponse {
            user: user.into(),
            customer: customer.map(CustomerProfile::from),
        })
    }

    /// Change password and revoke every other session of the user
    pub async fn change_password(
        &self,
        actor: &AuthenticatedUser,
        request: ChangePasswordRequest,
    ) -> ApiResult<()> {
        request.validate()?;

        let user = self
            .users
            .find_by_id(actor.user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        if !verify_password(&request.old_password, &user.password_hash).await? {
            return Err(ApiError::unauthorized(
                "INVALID_OLD_PASSWORD",
                "Invalid old password",
            ));
        }

        let password_hash = hash_password(&request.new_password, self.settings.bcrypt_cost).await?;
        let now = Utc::now();
        self.users.update_password(user.id, &password_hash, now).await?;
        let revoked = self
            .sessions
            .revoke_all(user.id, Some(&actor.jti), now)
            .await?;

        tracing::info!(user_id = %user.id, revoked_sessions = revoked, "Password changed");
        Ok(())
    }

    /// Create the bootstrap administrator if the email is not taken.
    /// Returns whether a user was created.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> ApiResult<bool> {
        let email = email.trim().to_lowercase();
        if self.users.find_by_email(&email).await?.is_some() {
            return Ok(false);
        }

        let password_hash = hash_password(password, self.settings.bcrypt_cost).await?;
        let now = Utc::now();
        let admin = self
            .users
            .create(&User {
                id: Uuid::new_v4(),
                email,
                password_hash,
                role: UserRole::Admin,
                status: UserStatus::Active,
                last_login_at: None,
                created_at: now,
                updated_at: now,
            })
            .await?;

        tracing::info!(user_id = %admin.id, email = %admin.email, "Bootstrap admin created");
        Ok(true)
    }

    pub async fn create_staff_user(
        &self,
        request: CreateStaffUserRequest,
    ) -> ApiResult<UserResponse> {
        request.validate()?;
        if !request.role.is_staff() {
            return Err(ApiError::ValidationError(
                "Role must be LOAN_OFFICER or ADMIN".to_string(),
            ));
        }

        let email = request.email.trim().to_lowercase();
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(ApiError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }

        let password_hash = hash_password(&request.password, self.settings.bcrypt_cost).await?;
        let now = Utc::now();
        let user = self
            .users
            .create(&User {
                id: Uuid::new_v4(),
                email,
                password_hash,
                role: request.role,
                status: UserStatus::Active,
                last_login_at: None,
                created_at: now,
                updated_at: now,
            })
            .await?;

        tracing::info!(user_id = %user.id, role = %user.role.as_str(), "Staff user created");
        Ok(user.into())
    }

    pub async fn get_user(&self, id: Uuid) -> ApiResult<UserResponse> {
        self.users
            .find_by_id(id)
            .await?
            .map(UserResponse::from)
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    /// Bearer access token -> claims -> live session -> ACTIVE user
    pub async fn authenticate(&self, token: &str) -> ApiResult<AuthenticatedUser> {
        let claims = verify_token_of_type(token, &self.settings.jwt_secret, TokenType::Access)?;
        let user_id = get_user_id_from_claims(&claims)?;

        let session = self
            .sessions
            .find_live_by_jti(&claims.jti, Utc::now())
            .await?
            .ok_or_else(|| ApiError::unauthorized("SESSION_REVOKED", "Session has been revoked"))?;

        if session.user_id != user_id {
            return Err(ApiError::unauthorized("INVALID_TOKEN", "Invalid token"));
        }

        let user = self.active_user(user_id).await?;

        Ok(AuthenticatedUser {
            user_id: user.id,
            email: user.email,
            role: user.role,
            jti: claims.jti,
        })
    }

    async fn active_user(&self, user_id: Uuid) -> ApiResult<User> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::unauthorized("INVALID_TOKEN", "User no longer exists"))?;
        if !user.is_active() {
            return Err(account_inactive());
        }
        Ok(user)
    }

    fn sign_pair(&self, user: &User, jti: &str) -> ApiResult<(AuthTokens, String)> {
        let access_token = generate_access_token(
            user,
            jti,
            &self.settings.jwt_secret,
            self.settings.access_token_ttl_seconds,
        )?;
        let refresh_jti = Uuid::new_v4().to_string();
        let refresh_token = generate_refresh_token(
            user,
            &refresh_jti,
            &self.settings.jwt_secret,
            self.settings.refresh_token_ttl_days,
        )?;
        let refresh_hash = sha256_hex(&refresh_token);

        Ok((
            AuthTokens {
                access_token,
                refresh_token,
                token_type: "Bearer".to_string(),
                expires_in: self.settings.access_token_ttl_seconds,
            },
            refresh_hash,
        ))
    }

    /// Sign a token pair and open a session for it
    async fn issue_tokens(&self, user: &User) -> ApiResult<AuthTokens> {
        let jti = Uuid::new_v4().to_string();
        let (tokens, refresh_token_hash) = self.sign_pair(user, &jti)?;
        let now = Utc::now();

        self.sessions
            .create(&AuthSession {
                id: Uuid::new_v4(),
                user_id: user.id,
                jti,
                refresh_token_hash,
                expires_at: now + Duration::days(self.settings.refresh_token_ttl_days),
                revoked_at: None,
                created_at: now,
                updated_at: now,
            })
            .await?;

        Ok(tokens)
    }
}
