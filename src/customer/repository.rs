use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::model::{Customer, KycStatus};
use crate::error::ApiResult;

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<Customer>>;

    async fn find_by_user_id(&self, user_id: Uuid) -> ApiResult<Option<Customer>>;

    async fn find_by_pan(&self, pan_number: &str) -> ApiResult<Option<Customer>>;

    async fn list(
        &self,
        kyc_status: Option<KycStatus>,
        offset: i64,
        limit: i64,
    ) -> ApiResult<(Vec<Customer>, i64)>;

    /// Overwrite the mutable profile and KYC columns
    async fn update(&self, customer: &Customer) -> ApiResult<Customer>;

    async fn count(&self) -> ApiResult<i64>;
}

pub struct PgCustomerRepository {
    pool: PgPool,
}

impl PgCustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerRepository for PgCustomerRepository {
    async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(customer)
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> ApiResult<Option<Customer>> {
        let customer =
            sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(customer)
    }

    async fn find_by_pan(&self, pan_number: &str) -> ApiResult<Option<Customer>> {
        let customer =
            sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE pan_number = $1")
                .bind(pan_number)
                .fetch_optional(&self.pool)
                .await?;
        Ok(customer)
    }

    async fn list(
        &self,
        kyc_status: Option<KycStatus>,
        offset: i64,
        limit: i64,
    ) -> ApiResult<(Vec<Customer>, i64)> {
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT * FROM customers
            WHERE ($1::kyc_status IS NULL OR kyc_status = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(kyc_status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM customers WHERE ($1::kyc_status IS NULL OR kyc_status = $1)",
        )
        .bind(kyc_status)
        .fetch_one(&self.pool)
        .await?;

        Ok((customers, total))
    }

    async fn update(&self, customer: &Customer) -> ApiResult<Customer> {
        let updated = sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers
            SET first_name = $1, last_name = $2, phone_number = $3,
                address_line1 = $4, address_line2 = $5, city = $6, state = $7, pincode = $8,
                annual_income = $9, occupation = $10, kyc_status = $11,
                kyc_verified_at = $12, kyc_verified_by_id = $13, kyc_remarks = $14,
                updated_at = $15
            WHERE id = $16
            RETURNING *
            "#,
        )
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.phone_number)
        .bind(&customer.address_line1)
        .bind(&customer.address_line2)
        .bind(&customer.city)
        .bind(&customer.state)
        .bind(&customer.pincode)
        .bind(customer.annual_income)
        .bind(&customer.occupation)
        .bind(customer.kyc_status)
        .bind(customer.kyc_verified_at)
        .bind(customer.kyc_verified_by_id)
        .bind(&customer.kyc_remarks)
        .bind(customer.updated_at)
        .bind(customer.id)
        .fetch_one(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn count(&self) -> ApiResult<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}

/// Insert a customer row inside an open transaction. Used by registration.
pub(crate) async fn insert_in_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    customer: &Customer,
) -> ApiResult<Customer> {
    let created = sqlx::query_as::<_, Customer>(
        r#"
        INSERT INTO customers (
            id, user_id, customer_code, first_name, last_name, email, phone_number,
            date_of_birth, pan_number, aadhaar_hash, aadhaar_last4,
            address_line1, address_line2, city, state, pincode,
            annual_income, occupation, kyc_status, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                $16, $17, $18, $19, $20, $21)
        RETURNING *
        "#,
    )
    .bind(customer.id)
    .bind(customer.user_id)
    .bind(&customer.customer_code)
    .bind(&customer.first_name)
    .bind(&customer.last_name)
    .bind(&customer.email)
    .bind(&customer.phone_number)
    .bind(customer.date_of_birth)
    .bind(&customer.pan_number)
    .bind(&customer.aadhaar_hash)
    .bind(&customer.aadhaar_last4)
    .bind(&customer.address_line1)
    .bind(&customer.address_line2)
    .bind(&customer.city)
    .bind(&customer.state)
    .bind(&customer.pincode)
    .bind(customer.annual_income)
    .bind(&customer.occupation)
    .bind(customer.kyc_status)
    .bind(customer.created_at)
    .bind(customer.updated_at)
    .fetch_one(&mut **tx)
    .await?;
    Ok(created)
}
