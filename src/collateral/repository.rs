use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::model::{Collateral, CollateralFilter, CollateralStatus};
use crate::error::{ApiError, ApiResult};
use crate::loan_application::{workflow, ApplicationStatus};

/// Storage for mutual fund holdings
#[async_trait]
pub trait CollateralRepository: Send + Sync {
    async fn insert_many(&self, holdings: &[Collateral]) -> ApiResult<Vec<Collateral>>;

    async fn find_by_ids(&self, ids: &[Uuid]) -> ApiResult<Vec<Collateral>>;

    async fn list(&self, filter: &CollateralFilter) -> ApiResult<Vec<Collateral>>;

    /// Mark every listed holding PLEDGED to `application_id`, or none of them.
    /// Fails with a conflict unless each one belongs to `customer_id` and is
    /// AVAILABLE, and the application still accepts collateral at write time.
    async fn pledge(
        &self,
        application_id: Uuid,
        customer_id: Uuid,
        ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> ApiResult<Vec<Collateral>>;

    /// Return every listed PLEDGED holding to AVAILABLE, or none of them
    async fn release(&self, ids: &[Uuid], now: DateTime<Utc>) -> ApiResult<Vec<Collateral>>;

    /// Sum of pledged value, optionally for one customer
    async fn pledged_value(&self, customer_id: Option<Uuid>) -> ApiResult<f64>;
}

pub(crate) fn pledge_conflict() -> ApiError {
    ApiError::Conflict(
        "One or more holdings are not available to pledge for this customer".to_string(),
    )
}

pub(crate) fn closed_application_conflict(status: ApplicationStatus) -> ApiError {
    ApiError::Conflict(format!(
        "Collateral cannot be pledged to an application in {} status",
        status
    ))
}

pub(crate) fn release_conflict() -> ApiError {
    ApiError::Conflict("One or more holdings are not currently pledged".to_string())
}

pub struct PgCollateralRepository {
    pool: PgPool,
}

impl PgCollateralRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Pledge inside an open transaction. Shared with application creation.
pub(crate) async fn pledge_in_tx(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    application_id: Uuid,
    customer_id: Uuid,
    ids: &[Uuid],
    now: DateTime<Utc>,
) -> ApiResult<Vec<Collateral>> {
    let pledged = sqlx::query_as::<_, Collateral>(
        r#"
        UPDATE collaterals
        SET status = $1, application_id = $2, pledged_at = $3, released_at = NULL, updated_at = $3
        WHERE id = ANY($4) AND customer_id = $5 AND status = $6
        RETURNING *
        "#,
    )
    .bind(CollateralStatus::Pledged)
    .bind(application_id)
    .bind(now)
    .bind(ids)
    .bind(customer_id)
    .bind(CollateralStatus::Available)
    .fetch_all(&mut **tx)
    .await?;

    if pledged.len() != ids.len() {
        return Err(pledge_conflict());
    }
    Ok(pledged)
}

/// Release everything pledged to an application inside an open transaction
pub(crate) async fn release_for_application_in_tx(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    application_id: Uuid,
    now: DateTime<Utc>,
) -> ApiResult<u64> {
    let result = sqlx::query(
        r#"
        UPDATE collaterals
        SET status = $1, application_id = NULL, released_at = $2, updated_at = $2
        WHERE application_id = $3 AND status = $4
        "#,
    )
    .bind(CollateralStatus::Available)
    .bind(now)
    .bind(application_id)
    .bind(CollateralStatus::Pledged)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected())
}

#[async_trait]
impl CollateralRepository for PgCollateralRepository {
    async fn insert_many(&self, holdings: &[Collateral]) -> ApiResult<Vec<Collateral>> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = Vec::with_capacity(holdings.len());

        for holding in holdings {
            let row = sqlx::query_as::<_, Collateral>(
                r#"
                INSERT INTO collaterals (
                    id, customer_id, isin, scheme_name, amc_name, folio_number,
                    category, units, nav, value, status, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                RETURNING *
                "#,
            )
            .bind(holding.id)
            .bind(holding.customer_id)
            .bind(&holding.isin)
            .bind(&holding.scheme_name)
            .bind(&holding.amc_name)
            .bind(&holding.folio_number)
            .bind(holding.category)
            .bind(holding.units)
            .bind(holding.nav)
            .bind(holding.value)
            .bind(holding.status)
            .bind(holding.created_at)
            .bind(holding.updated_at)
            .fetch_one(&mut *tx)
            .await?;
            inserted.push(row);
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> ApiResult<Vec<Collateral>> {
        let rows = sqlx::query_as::<_, Collateral>(
            "SELECT * FROM collaterals WHERE id = ANY($1) ORDER BY created_at",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list(&self, filter: &CollateralFilter) -> ApiResult<Vec<Collateral>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM collaterals WHERE 1=1");

        if let Some(customer_id) = filter.customer_id {
            qb.push(" AND customer_id = ").push_bind(customer_id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(application_id) = filter.application_id {
            qb.push(" AND application_id = ").push_bind(application_id);
        }
        qb.push(" ORDER BY created_at DESC");

        let rows = qb
            .build_query_as::<Collateral>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn pledge(
        &self,
        application_id: Uuid,
        customer_id: Uuid,
        ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> ApiResult<Vec<Collateral>> {
        let mut tx = self.pool.begin().await?;
        // An early return drops the transaction, which rolls it back.
        // The row lock holds off a concurrent reject or close until commit.
        let status = sqlx::query_scalar::<_, ApplicationStatus>(
            "SELECT status FROM loan_applications WHERE id = $1 FOR UPDATE",
        )
        .bind(application_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::NotFound("Loan application not found".to_string()))?;
        if !workflow::accepts_collateral(status) {
            return Err(closed_application_conflict(status));
        }

        let pledged = pledge_in_tx(&mut tx, application_id, customer_id, ids, now).await?;
        tx.commit().await?;
        Ok(pledged)
    }

    async fn release(&self, ids: &[Uuid], now: DateTime<Utc>) -> ApiResult<Vec<Collateral>> {
        let mut tx = self.pool.begin().await?;

        let released = sqlx::query_as::<_, Collateral>(
            r#"
            UPDATE collaterals
            SET status = $1, application_id = NULL, released_at = $2, updated_at = $2
            WHERE id = ANY($3) AND status = $4
            RETURNING *
            "#,
        )
        .bind(CollateralStatus::Available)
        .bind(now)
        .bind(ids)
        .bind(CollateralStatus::Pledged)
        .fetch_all(&mut *tx)
        .await?;

        if released.len() != ids.len() {
            return Err(release_conflict());
        }

        tx.commit().await?;
        Ok(released)
    }

    async fn pledged_value(&self, customer_id: Option<Uuid>) -> ApiResult<f64> {
        let total: f64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(value), 0)::DOUBLE PRECISION
            FROM collaterals
            WHERE status = $1 AND ($2::UUID IS NULL OR customer_id = $2)
            "#,
        )
        .bind(CollateralStatus::Pledged)
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }
}
