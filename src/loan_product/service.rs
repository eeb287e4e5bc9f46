use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use super::model::{
    CreateLoanProductRequest, LoanProduct, ProductStatus, UpdateLoanProductRequest,
    DEFAULT_ELIGIBLE_CATEGORIES,
};
use super::repository::LoanProductRepository;
use crate::error::{ApiError, ApiResult};

#[derive(Clone)]
pub struct LoanProductService {
    products: Arc<dyn LoanProductRepository>,
}

impl LoanProductService {
    pub fn new(products: Arc<dyn LoanProductRepository>) -> Self {
        Self { products }
    }

    pub async fn list(&self) -> ApiResult<Vec<LoanProduct>> {
        self.products.list_active().await
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<LoanProduct> {
        self.products
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Loan product not found".to_string()))
    }

    pub async fn create(&self, request: CreateLoanProductRequest) -> ApiResult<LoanProduct> {
        request.validate()?;

        let product_code = request.product_code.trim().to_ascii_uppercase();
        if self.products.find_by_code(&product_code).await?.is_some() {
            return Err(ApiError::DuplicateEntry(format!(
                "Product code {} already exists",
                product_code
            )));
        }

        let now = Utc::now();
        let product = LoanProduct {
            id: Uuid::new_v4(),
            product_code,
            product_name: request.product_name,
            description: request.description,
            min_amount: request.min_amount,
            max_amount: request.max_amount,
            min_tenure_months: request.min_tenure_months,
            max_tenure_months: request.max_tenure_months,
            interest_rate: request.interest_rate,
            processing_fee_percentage: request.processing_fee_percentage,
            ltv_ratio: request.ltv_ratio,
            eligible_mf_categories: request
                .eligible_mf_categories
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| {
                    DEFAULT_ELIGIBLE_CATEGORIES
                        .iter()
                        .map(|c| c.to_string())
                        .collect()
                }),
            status: ProductStatus::Active,
            created_at: now,
            updated_at: now,
        };
        product.check_bounds()?;

        let created = self.products.create(&product).await?;
        tracing::info!(
            product_id = %created.id,
            product_code = %created.product_code,
            "Loan product created"
        );
        Ok(created)
    }

    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateLoanProductRequest,
    ) -> ApiResult<LoanProduct> {
        request.validate()?;
        let mut product = self.get(id).await?;

        if let Some(v) = request.product_name {
            product.product_name = v;
        }
        if request.description.is_some() {
            product.description = request.description;
        }
        if let Some(v) = request.min_amount {
            product.min_amount = v;
        }
        if let Some(v) = request.max_amount {
            product.max_amount = v;
        }
        if let Some(v) = request.min_tenure_months {
            product.min_tenure_months = v;
        }
        if let Some(v) = request.max_tenure_months {
            product.max_tenure_months = v;
        }
        if let Some(v) = request.interest_rate {
            product.interest_rate = v;
        }
        if request.processing_fee_percentage.is_some() {
            product.processing_fee_percentage = request.processing_fee_percentage;
        }
        if let Some(v) = request.ltv_ratio {
            product.ltv_ratio = v;
        }
        if let Some(v) = request.eligible_mf_categories.filter(|c| !c.is_empty()) {
            product.eligible_mf_categories = v;
        }
        if let Some(v) = request.status {
            product.status = v;
        }
        product.check_bounds()?;
        product.updated_at = Utc::now();

        let updated = self.products.update(&product).await?;
        tracing::info!(product_id = %id, "Loan product updated");
        Ok(updated)
    }

    /// Soft delete: the product stops accepting applications but existing
    /// applications keep their reference.
    pub async fn deactivate(&self, id: Uuid) -> ApiResult<LoanProduct> {
        let mut product = self.get(id).await?;
        product.status = ProductStatus::Inactive;
        product.updated_at = Utc::now();

        let updated = self.products.update(&product).await?;
        tracing::info!(product_id = %id, "Loan product deactivated");
        Ok(updated)
    }
}
