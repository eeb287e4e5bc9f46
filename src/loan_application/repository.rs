use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::model::{
    ApplicationFilter, ApplicationStats, ApplicationStatus, LoanApplication,
    LoanApplicationSummary,
};
use crate::collateral::repository::{pledge_in_tx, release_for_application_in_tx};
use crate::error::ApiResult;

#[async_trait]
pub trait LoanApplicationRepository: Send + Sync {
    /// Insert a new application and pledge `collateral_ids` to it atomically
    async fn create(
        &self,
        application: &LoanApplication,
        collateral_ids: &[Uuid],
    ) -> ApiResult<LoanApplication>;

    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<LoanApplication>>;

    /// Page of summaries, newest first, and the total matching count
    async fn list(
        &self,
        filter: &ApplicationFilter,
    ) -> ApiResult<(Vec<LoanApplicationSummary>, i64)>;

    /// Persist `updated` only while the stored status is still `expected`.
    /// Returns `None` when another writer got there first.
    async fn update_status(
        &self,
        updated: &LoanApplication,
        expected: ApplicationStatus,
        release_collateral: bool,
    ) -> ApiResult<Option<LoanApplication>>;

    async fn stats(&self, customer_id: Option<Uuid>) -> ApiResult<ApplicationStats>;
}

pub struct PgLoanApplicationRepository {
    pool: PgPool,
}

impl PgLoanApplicationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SUMMARY_SELECT: &str = r#"
    SELECT la.id, la.application_number, la.customer_id,
           c.first_name || ' ' || c.last_name AS customer_name,
           c.email AS customer_email,
           la.loan_product_id, p.product_name,
           la.requested_amount, la.approved_amount, la.tenure_months,
           la.interest_rate, la.calculated_emi, la.status, la.review_notes,
           la.created_at
    FROM loan_applications la
    JOIN customers c ON c.id = la.customer_id
    JOIN loan_products p ON p.id = la.loan_product_id
    WHERE 1=1
"#;

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ApplicationFilter) {
    if let Some(customer_id) = filter.customer_id {
        qb.push(" AND la.customer_id = ").push_bind(customer_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND la.status = ").push_bind(status);
    }
}

#[async_trait]
impl LoanApplicationRepository for PgLoanApplicationRepository {
    async fn create(
        &self,
        application: &LoanApplication,
        collateral_ids: &[Uuid],
    ) -> ApiResult<LoanApplication> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, LoanApplication>(
            r#"
            INSERT INTO loan_applications (
                id, application_number, customer_id, loan_product_id,
                requested_amount, tenure_months, interest_rate, purpose_of_loan,
                monthly_income, existing_emi, calculated_emi, status,
                created_by_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(application.id)
        .bind(&application.application_number)
        .bind(application.customer_id)
        .bind(application.loan_product_id)
        .bind(application.requested_amount)
        .bind(application.tenure_months)
        .bind(application.interest_rate)
        .bind(&application.purpose_of_loan)
        .bind(application.monthly_income)
        .bind(application.existing_emi)
        .bind(application.calculated_emi)
        .bind(application.status)
        .bind(application.created_by_id)
        .bind(application.created_at)
        .bind(application.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        if !collateral_ids.is_empty() {
            pledge_in_tx(
                &mut tx,
                created.id,
                created.customer_id,
                collateral_ids,
                created.created_at,
            )
            .await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<LoanApplication>> {
        let application =
            sqlx::query_as::<_, LoanApplication>("SELECT * FROM loan_applications WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(application)
    }

    async fn list(
        &self,
        filter: &ApplicationFilter,
    ) -> ApiResult<(Vec<LoanApplicationSummary>, i64)> {
        let mut qb = QueryBuilder::<Postgres>::new(SUMMARY_SELECT);
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY la.created_at DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        let rows = qb
            .build_query_as::<LoanApplicationSummary>()
            .fetch_all(&self.pool)
            .await?;

        let mut count_qb =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM loan_applications la WHERE 1=1");
        push_filters(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        Ok((rows, total))
    }

    async fn update_status(
        &self,
        updated: &LoanApplication,
        expected: ApplicationStatus,
        release_collateral: bool,
    ) -> ApiResult<Option<LoanApplication>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, LoanApplication>(
            r#"
            UPDATE loan_applications
            SET status = $1, review_notes = $2, rejection_reason = $3,
                approved_amount = $4, reviewed_by_id = $5, reviewed_at = $6,
                approved_by_id = $7, approved_at = $8, rejected_at = $9,
                disbursed_at = $10, closed_at = $11, updated_at = $12
            WHERE id = $13 AND status = $14
            RETURNING *
            "#,
        )
        .bind(updated.status)
        .bind(&updated.review_notes)
        .bind(&updated.rejection_reason)
        .bind(updated.approved_amount)
        .bind(updated.reviewed_by_id)
        .bind(updated.reviewed_at)
        .bind(updated.approved_by_id)
        .bind(updated.approved_at)
        .bind(updated.rejected_at)
        .bind(updated.disbursed_at)
        .bind(updated.closed_at)
        .bind(updated.updated_at)
        .bind(updated.id)
        .bind(expected)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        if release_collateral {
            let released = release_for_application_in_tx(&mut tx, row.id, row.updated_at).await?;
            tracing::info!(
                application_id = %row.id,
                released = released,
                "Released pledged collateral"
            );
        }

        tx.commit().await?;
        Ok(Some(row))
    }

    async fn stats(&self, customer_id: Option<Uuid>) -> ApiResult<ApplicationStats> {
        let groups = sqlx::query_as::<_, (ApplicationStatus, i64, f64)>(
            r#"
            SELECT status,
                   COUNT(*)::BIGINT,
                   COALESCE(SUM(COALESCE(approved_amount, requested_amount)), 0)::DOUBLE PRECISION
            FROM loan_applications
            WHERE ($1::UUID IS NULL OR customer_id = $1)
            GROUP BY status
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ApplicationStats::from_groups(groups))
    }
}
