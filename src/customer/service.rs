use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use super::model::{
    Customer, CustomerListQuery, CustomerProfile, KycStatus, UpdateCustomerRequest,
    VerifyKycRequest,
};
use super::repository::CustomerRepository;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthenticatedUser;
use crate::models::PaginatedResponse;
use crate::utils::Pagination;

#[derive(Clone)]
pub struct CustomerService {
    customers: Arc<dyn CustomerRepository>,
}

impl CustomerService {
    pub fn new(customers: Arc<dyn CustomerRepository>) -> Self {
        Self { customers }
    }

    /// Load a customer and check the actor may see it: staff always, customers
    /// only their own profile.
    pub async fn load_accessible(&self, actor: &AuthenticatedUser, id: Uuid) -> ApiResult<Customer> {
        let customer = self
            .customers
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Customer not found".to_string()))?;

        if !actor.role.is_staff() && customer.user_id != actor.user_id {
            tracing::warn!(
                user_id = %actor.user_id,
                customer_id = %id,
                "Customer attempted to access another profile"
            );
            return Err(ApiError::Forbidden(
                "You can only access your own profile".to_string(),
            ));
        }
        Ok(customer)
    }

    /// Profile linked to the actor's user account
    pub async fn own_profile(&self, actor: &AuthenticatedUser) -> ApiResult<Customer> {
        self.customers
            .find_by_user_id(actor.user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Customer profile not found".to_string()))
    }

    pub async fn list(
        &self,
        actor: &AuthenticatedUser,
        query: CustomerListQuery,
    ) -> ApiResult<PaginatedResponse<CustomerProfile>> {
        if !actor.role.is_staff() {
            return Err(ApiError::Forbidden("Staff access required".to_string()));
        }

        let page = Pagination::from_params(query.pagination());
        let (customers, total) = self
            .customers
            .list(query.kyc_status, page.offset(), page.limit)
            .await?;

        Ok(PaginatedResponse::new(
            customers.into_iter().map(CustomerProfile::from).collect(),
            total,
            page.page,
            page.limit,
        ))
    }

    pub async fn get(&self, actor: &AuthenticatedUser, id: Uuid) -> ApiResult<CustomerProfile> {
        Ok(self.load_accessible(actor, id).await?.into())
    }

    pub async fn update(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
        request: UpdateCustomerRequest,
    ) -> ApiResult<CustomerProfile> {
        request.validate()?;
        let mut customer = self.load_accessible(actor, id).await?;

        if let Some(first_name) = request.first_name {
            customer.first_name = first_name;
        }
        if let Some(last_name) = request.last_name {
            customer.last_name = last_name;
        }
        if let Some(phone_number) = request.phone_number {
            customer.phone_number = phone_number;
        }
        if let Some(address) = request.address {
            customer.set_address(address);
        }
        if request.annual_income.is_some() {
            customer.annual_income = request.annual_income;
        }
        if request.occupation.is_some() {
            customer.occupation = request.occupation;
        }
        customer.updated_at = Utc::now();

        let updated = self.customers.update(&customer).await?;
        tracing::info!(customer_id = %id, updated_by = %actor.user_id, "Customer profile updated");
        Ok(updated.into())
    }

    /// Owner hands the profile over for verification
    pub async fn submit_kyc(&self, actor: &AuthenticatedUser, id: Uuid) -> ApiResult<CustomerProfile> {
        let mut customer = self.load_accessible(actor, id).await?;
        if customer.user_id != actor.user_id {
            return Err(ApiError::Forbidden(
                "Only the customer can submit their KYC".to_string(),
            ));
        }

        match customer.kyc_status {
            KycStatus::Pending | KycStatus::Rejected => {}
            other => {
                return Err(ApiError::Conflict(format!(
                    "KYC cannot be submitted while {:?}",
                    other
                )))
            }
        }

        customer.kyc_status = KycStatus::Submitted;
        customer.kyc_remarks = None;
        customer.updated_at = Utc::now();

        let updated = self.customers.update(&customer).await?;
        tracing::info!(customer_id = %id, "KYC submitted");
        Ok(updated.into())
    }

    pub async fn verify_kyc(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
        request: VerifyKycRequest,
    ) -> ApiResult<CustomerProfile> {
        if !actor.role.is_staff() {
            return Err(ApiError::Forbidden("Staff access required".to_string()));
        }
        let mut customer = self.load_accessible(actor, id).await?;

        if !matches!(customer.kyc_status, KycStatus::Pending | KycStatus::Submitted) {
            return Err(ApiError::Conflict(format!(
                "KYC already {:?}",
                customer.kyc_status
            )));
        }

        let now = Utc::now();
        customer.kyc_status = if request.approved {
            KycStatus::Verified
        } else {
            KycStatus::Rejected
        };
        customer.kyc_verified_at = Some(now);
        customer.kyc_verified_by_id = Some(actor.user_id);
        customer.kyc_remarks = request.remarks;
        customer.updated_at = now;

        let updated = self.customers.update(&customer).await?;
        tracing::info!(
            customer_id = %id,
            verified_by = %actor.user_id,
            kyc_status = ?updated.kyc_status,
            "KYC reviewed"
        );
        Ok(updated.into())
    }
}
