use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "product_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    Active,
    Inactive,
}

pub const DEFAULT_ELIGIBLE_CATEGORIES: &[&str] = &["MUTUAL_FUNDS"];

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LoanProduct {
    pub id: Uuid,
    pub product_code: String,
    pub product_name: String,
    pub description: Option<String>,
    pub min_amount: f64,
    pub max_amount: f64,
    pub min_tenure_months: i32,
    pub max_tenure_months: i32,
    pub interest_rate: f64,
    pub processing_fee_percentage: Option<f64>,
    pub ltv_ratio: f64,
    pub eligible_mf_categories: Vec<String>,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoanProduct {
    pub fn is_active(&self) -> bool {
        self.status == ProductStatus::Active
    }

    /// Cross-field checks the derive cannot express
    pub fn check_bounds(&self) -> ApiResult<()> {
        if self.min_amount <= 0.0 || self.min_amount > self.max_amount {
            return Err(ApiError::ValidationError(
                "minAmount must be positive and not exceed maxAmount".to_string(),
            ));
        }
        if self.min_tenure_months < 1 || self.min_tenure_months > self.max_tenure_months {
            return Err(ApiError::ValidationError(
                "minTenureMonths must be at least 1 and not exceed maxTenureMonths".to_string(),
            ));
        }
        if !self.interest_rate.is_finite() || self.interest_rate < 0.0 {
            return Err(ApiError::ValidationError(
                "interestRate must be zero or positive".to_string(),
            ));
        }
        if !(self.ltv_ratio > 0.0 && self.ltv_ratio <= 100.0) {
            return Err(ApiError::ValidationError(
                "ltvRatio must be greater than 0 and at most 100".to_string(),
            ));
        }
        Ok(())
    }

    /// Amount and tenure fall inside this product's limits
    pub fn check_request(&self, amount: f64, tenure_months: u32) -> ApiResult<()> {
        if amount < self.min_amount || amount > self.max_amount {
            return Err(ApiError::BadRequest(format!(
                "Requested amount must be between {} and {}",
                self.min_amount, self.max_amount
            )));
        }
        let tenure = tenure_months as i64;
        if tenure < self.min_tenure_months as i64 || tenure > self.max_tenure_months as i64 {
            return Err(ApiError::BadRequest(format!(
                "Tenure must be between {} and {} months",
                self.min_tenure_months, self.max_tenure_months
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoanProductRequest {
    #[validate(length(min = 2, max = 30))]
    pub product_code: String,

    #[validate(length(min = 3, max = 100))]
    pub product_name: String,

    #[validate(length(max = 1000))]
    pub description: Option<String>,

    pub min_amount: f64,
    pub max_amount: f64,

    #[validate(range(min = 1))]
    pub min_tenure_months: i32,

    #[validate(range(min = 1, max = 600))]
    pub max_tenure_months: i32,

    #[validate(range(min = 0.0, max = 100.0))]
    pub interest_rate: f64,

    #[validate(range(min = 0.0, max = 100.0))]
    pub processing_fee_percentage: Option<f64>,

    pub ltv_ratio: f64,

    pub eligible_mf_categories: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLoanProductRequest {
    #[validate(length(min = 3, max = 100))]
    pub product_name: Option<String>,

    #[validate(length(max = 1000))]
    pub description: Option<String>,

    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub min_tenure_months: Option<i32>,
    pub max_tenure_months: Option<i32>,

    #[validate(range(min = 0.0, max = 100.0))]
    pub interest_rate: Option<f64>,

    #[validate(range(min = 0.0, max = 100.0))]
    pub processing_fee_percentage: Option<f64>,

    pub ltv_ratio: Option<f64>,
    pub eligible_mf_categories: Option<Vec<String>>,
    pub status: Option<ProductStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product() -> LoanProduct {
        let now = Utc::now();
        LoanProduct {
            id: Uuid::new_v4(),
            product_code: "LAMF01".to_string(),
            product_name: "Loan Against Mutual Funds".to_string(),
            description: None,
            min_amount: 50_000.0,
            max_amount: 5_000_000.0,
            min_tenure_months: 6,
            max_tenure_months: 36,
            interest_rate: 10.5,
            processing_fee_percentage: Some(1.0),
            ltv_ratio: 50.0,
            eligible_mf_categories: vec!["MUTUAL_FUNDS".to_string()],
            status: ProductStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_request_within_bounds() {
        let p = product();
        assert!(p.check_request(50_000.0, 6).is_ok());
        assert!(p.check_request(5_000_000.0, 36).is_ok());
        assert!(p.check_request(49_999.0, 12).is_err());
        assert!(p.check_request(100_000.0, 48).is_err());
        assert!(p.check_request(100_000.0, 3).is_err());
    }

    #[test]
    fn test_product_bounds() {
        assert!(product().check_bounds().is_ok());

        let mut p = product();
        p.min_amount = 10_000_000.0;
        assert!(p.check_bounds().is_err());

        let mut p = product();
        p.ltv_ratio = 0.0;
        assert!(p.check_bounds().is_err());

        let mut p = product();
        p.ltv_ratio = 100.0;
        assert!(p.check_bounds().is_ok());

        let mut p = product();
        p.min_tenure_months = 48;
        assert!(p.check_bounds().is_err());
    }
}
