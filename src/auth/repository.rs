//! User and session storage

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::customer::repository::insert_in_tx;
use crate::customer::Customer;
use crate::error::ApiResult;
use crate::models::{AuthSession, User};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> ApiResult<Option<User>>;

    async fn create(&self, user: &User) -> ApiResult<User>;

    /// Create a CUSTOMER user and its profile in one unit
    async fn create_with_customer(
        &self,
        user: &User,
        customer: &Customer,
    ) -> ApiResult<(User, Customer)>;

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<()>;

    async fn record_login(&self, id: Uuid, now: DateTime<Utc>) -> ApiResult<()>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: &AuthSession) -> ApiResult<()>;

    /// Session for an access-token id, if not revoked and not expired
    async fn find_live_by_jti(&self, jti: &str, now: DateTime<Utc>)
        -> ApiResult<Option<AuthSession>>;

    async fn find_live_by_refresh_hash(
        &self,
        refresh_token_hash: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<Option<AuthSession>>;

    /// Swap in a new token pair. False when the session was revoked meanwhile.
    async fn rotate(
        &self,
        id: Uuid,
        jti: &str,
        refresh_token_hash: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> ApiResult<bool>;

    /// Revoke one session. False when already revoked or unknown.
    async fn revoke(&self, jti: &str, now: DateTime<Utc>) -> ApiResult<bool>;

    /// Revoke a user's live sessions, optionally sparing one
    async fn revoke_all(
        &self,
        user_id: Uuid,
        except_jti: Option<&str>,
        now: DateTime<Utc>,
    ) -> ApiResult<u64>;
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const INSERT_USER: &str = r#"
    INSERT INTO users (id, email, password_hash, role, status, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7)
    RETURNING *
"#;

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create(&self, user: &User) -> ApiResult<User> {
        let created = sqlx::query_as::<_, User>(INSERT_USER)
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role)
            .bind(user.status)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn create_with_customer(
        &self,
        user: &User,
        customer: &Customer,
    ) -> ApiResult<(User, Customer)> {
        let mut tx = self.pool.begin().await?;

        let created_user = sqlx::query_as::<_, User>(INSERT_USER)
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role)
            .bind(user.status)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&mut *tx)
            .await?;

        let created_customer = insert_in_tx(&mut tx, customer).await?;

        tx.commit().await?;
        Ok((created_user, created_customer))
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<()> {
        sqlx::query("UPDATE users SET password_hash = $1, updated_at = $2 WHERE id = $3")
            .bind(password_hash)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_login(&self, id: Uuid, now: DateTime<Utc>) -> ApiResult<()> {
        sqlx::query("UPDATE users SET last_login_at = $1 WHERE id = $2")
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn create(&self, session: &AuthSession) -> ApiResult<()> {
        sqlx::query(
            r#"
            INSERT INTO auth_sessions (id, user_id, jti, refresh_token_hash, expires_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.jti)
        .bind(&session.refresh_token_hash)
        .bind(session.expires_at)
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_live_by_jti(
        &self,
        jti: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<Option<AuthSession>> {
        let session = sqlx::query_as::<_, AuthSession>(
            r#"
            SELECT * FROM auth_sessions
            WHERE jti = $1 AND revoked_at IS NULL AND expires_at > $2
            "#,
        )
        .bind(jti)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn find_live_by_refresh_hash(
        &self,
        refresh_token_hash: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<Option<AuthSession>> {
        let session = sqlx::query_as::<_, AuthSession>(
            r#"
            SELECT * FROM auth_sessions
            WHERE refresh_token_hash = $1 AND revoked_at IS NULL AND expires_at > $2
            "#,
        )
        .bind(refresh_token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn rotate(
        &self,
        id: Uuid,
        jti: &str,
        refresh_token_hash: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> ApiResult<bool> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE auth_sessions
            SET jti = $1, refresh_token_hash = $2, expires_at = $3, updated_at = $4
            WHERE id = $5 AND revoked_at IS NULL
            "#,
        )
        .bind(jti)
        .bind(refresh_token_hash)
        .bind(expires_at)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(rows_affected == 1)
    }

    async fn revoke(&self, jti: &str, now: DateTime<Utc>) -> ApiResult<bool> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE auth_sessions
            SET revoked_at = $1, updated_at = $1
            WHERE jti = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(now)
        .bind(jti)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(rows_affected > 0)
    }

    async fn revoke_all(
        &self,
        user_id: Uuid,
        except_jti: Option<&str>,
        now: DateTime<Utc>,
    ) -> ApiResult<u64> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE auth_sessions
            SET revoked_at = $1, updated_at = $1
            WHERE user_id = $2 AND revoked_at IS NULL
              AND ($3::TEXT IS NULL OR jti <> $3)
            "#,
        )
        .bind(now)
        .bind(user_id)
        .bind(except_jti)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(rows_affected)
    }
}
