use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::model::{LoanProduct, ProductStatus};
use crate::error::ApiResult;

#[async_trait]
pub trait LoanProductRepository: Send + Sync {
    /// ACTIVE products ordered by name
    async fn list_active(&self) -> ApiResult<Vec<LoanProduct>>;

    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<LoanProduct>>;

    async fn find_by_code(&self, code: &str) -> ApiResult<Option<LoanProduct>>;

    async fn create(&self, product: &LoanProduct) -> ApiResult<LoanProduct>;

    async fn update(&self, product: &LoanProduct) -> ApiResult<LoanProduct>;
}

pub struct PgLoanProductRepository {
    pool: PgPool,
}

impl PgLoanProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoanProductRepository for PgLoanProductRepository {
    async fn list_active(&self) -> ApiResult<Vec<LoanProduct>> {
        let products = sqlx::query_as::<_, LoanProduct>(
            "SELECT * FROM loan_products WHERE status = $1 ORDER BY product_name",
        )
        .bind(ProductStatus::Active)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<LoanProduct>> {
        let product = sqlx::query_as::<_, LoanProduct>("SELECT * FROM loan_products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    async fn find_by_code(&self, code: &str) -> ApiResult<Option<LoanProduct>> {
        let product =
            sqlx::query_as::<_, LoanProduct>("SELECT * FROM loan_products WHERE product_code = $1")
                .bind(code)
                .fetch_optional(&self.pool)
                .await?;
        Ok(product)
    }

    async fn create(&self, product: &LoanProduct) -> ApiResult<LoanProduct> {
        let created = sqlx::query_as::<_, LoanProduct>(
            r#"
            INSERT INTO loan_products (
                id, product_code, product_name, description, min_amount, max_amount,
                min_tenure_months, max_tenure_months, interest_rate,
                processing_fee_percentage, ltv_ratio, eligible_mf_categories, status,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(product.id)
        .bind(&product.product_code)
        .bind(&product.product_name)
        .bind(&product.description)
        .bind(product.min_amount)
        .bind(product.max_amount)
        .bind(product.min_tenure_months)
        .bind(product.max_tenure_months)
        .bind(product.interest_rate)
        .bind(product.processing_fee_percentage)
        .bind(product.ltv_ratio)
        .bind(&product.eligible_mf_categories)
        .bind(product.status)
        .bind(product.created_at)
        .bind(product.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update(&self, product: &LoanProduct) -> ApiResult<LoanProduct> {
        let updated = sqlx::query_as::<_, LoanProduct>(
            r#"
            UPDATE loan_products
            SET product_name = $1, description = $2, min_amount = $3, max_amount = $4,
                min_tenure_months = $5, max_tenure_months = $6, interest_rate = $7,
                processing_fee_percentage = $8, ltv_ratio = $9,
                eligible_mf_categories = $10, status = $11, updated_at = $12
            WHERE id = $13
            RETURNING *
            "#,
        )
        .bind(&product.product_name)
        .bind(&product.description)
        .bind(product.min_amount)
        .bind(product.max_amount)
        .bind(product.min_tenure_months)
        .bind(product.max_tenure_months)
        .bind(product.interest_rate)
        .bind(product.processing_fee_percentage)
        .bind(product.ltv_ratio)
        .bind(&product.eligible_mf_categories)
        .bind(product.status)
        .bind(product.updated_at)
        .bind(product.id)
        .fetch_one(&self.pool)
        .await?;
        Ok(updated)
    }
}
