use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use super::model::{
    ApplicantView, ApplicationFilter, ApplicationStatus, ApproveRequest,
    CreateLoanApplicationRequest, CreatedApplication, ListApplicationsQuery, LoanApplication,
    LoanApplicationDetail, LoanApplicationSummary, ProductView, RejectRequest,
    UpdateStatusRequest,
};
use super::repository::LoanApplicationRepository;
use super::workflow::{self, Transition};
use crate::collateral::{total_value, CollateralFilter, CollateralRepository, CollateralStatus};
use crate::customer::{Customer, CustomerRepository};
use crate::error::{ApiError, ApiResult};
use crate::loan_product::LoanProductRepository;
use crate::middleware::AuthenticatedUser;
use crate::models::{PaginatedResponse, UserRole};
use crate::services::calculator::{calculate_emi, calculate_ltv, calculate_total_interest};
use crate::utils::{
    generate_application_number, mask_aadhaar, mask_email, mask_pan, mask_phone, unique_ids,
    Pagination,
};

#[derive(Clone)]
pub struct LoanApplicationService {
    applications: Arc<dyn LoanApplicationRepository>,
    products: Arc<dyn LoanProductRepository>,
    customers: Arc<dyn CustomerRepository>,
    collaterals: Arc<dyn CollateralRepository>,
}

impl LoanApplicationService {
    pub fn new(
        applications: Arc<dyn LoanApplicationRepository>,
        products: Arc<dyn LoanProductRepository>,
        customers: Arc<dyn CustomerRepository>,
        collaterals: Arc<dyn CollateralRepository>,
    ) -> Self {
        Self {
            applications,
            products,
            customers,
            collaterals,
        }
    }

    async fn own_customer(&self, actor: &AuthenticatedUser) -> ApiResult<Customer> {
        self.customers
            .find_by_user_id(actor.user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Customer profile not found".to_string()))
    }

    async fn load(&self, id: Uuid) -> ApiResult<LoanApplication> {
        self.applications
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Loan application not found".to_string()))
    }

    /// Create a DRAFT application for the calling customer
    pub async fn create(
        &self,
        actor: &AuthenticatedUser,
        request: CreateLoanApplicationRequest,
    ) -> ApiResult<CreatedApplication> {
        if actor.role != UserRole::Customer {
            return Err(ApiError::Forbidden(
                "Only customers can create loan applications".to_string(),
            ));
        }
        request.validate()?;

        let customer = self.own_customer(actor).await?;
        let product = self
            .products
            .find_by_id(request.loan_product_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Loan product not found".to_string()))?;

        if !product.is_active() {
            return Err(ApiError::BadRequest("Loan product is not active".to_string()));
        }
        product.check_request(request.requested_amount, request.tenure)?;

        let calculated_emi =
            calculate_emi(request.requested_amount, product.interest_rate, request.tenure)?;
        let total_interest =
            calculate_total_interest(request.requested_amount, product.interest_rate, request.tenure)?;

        let now = Utc::now();
        let application = LoanApplication {
            id: Uuid::new_v4(),
            application_number: generate_application_number(now),
            customer_id: customer.id,
            loan_product_id: product.id,
            requested_amount: request.requested_amount,
            approved_amount: None,
            tenure_months: request.tenure as i32,
            interest_rate: product.interest_rate,
            purpose_of_loan: request.purpose_of_loan,
            monthly_income: request.monthly_income,
            existing_emi: request.existing_emi,
            calculated_emi,
            status: ApplicationStatus::Draft,
            review_notes: None,
            rejection_reason: None,
            reviewed_by_id: None,
            reviewed_at: None,
            approved_by_id: None,
            approved_at: None,
            rejected_at: None,
            disbursed_at: None,
            closed_at: None,
            created_by_id: actor.user_id,
            created_at: now,
            updated_at: now,
        };

        let collateral_ids = unique_ids(&request.collateral_ids);
        let created = self.applications.create(&application, &collateral_ids).await?;

        let collateral_value = if collateral_ids.is_empty() {
            0.0
        } else {
            total_value(&self.collaterals.find_by_ids(&collateral_ids).await?)
        };

        tracing::info!(
            application_id = %created.id,
            application_number = %created.application_number,
            customer_id = %customer.id,
            requested_amount = created.requested_amount,
            calculated_emi = created.calculated_emi,
            pledged = collateral_ids.len(),
            "Loan application created"
        );

        Ok(CreatedApplication {
            ltv_ratio: calculate_ltv(created.requested_amount, collateral_value),
            application: created,
            total_interest,
            collateral_value,
        })
    }

    /// Newest first. Customers see only their own applications.
    pub async fn list(
        &self,
        actor: &AuthenticatedUser,
        query: ListApplicationsQuery,
    ) -> ApiResult<PaginatedResponse<LoanApplicationSummary>> {
        let status = match query.status.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(ApplicationStatus::parse(raw).ok_or_else(|| {
                ApiError::ValidationError(format!("Invalid status: {}", raw))
            })?),
        };

        let customer_id = if actor.role.is_staff() {
            None
        } else {
            Some(self.own_customer(actor).await?.id)
        };

        let page = Pagination::from_params(query.pagination());
        let (rows, total) = self
            .applications
            .list(&ApplicationFilter {
                customer_id,
                status,
                offset: page.offset(),
                limit: page.limit,
            })
            .await?;

        Ok(PaginatedResponse::new(rows, total, page.page, page.limit))
    }

    pub async fn get(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
    ) -> ApiResult<LoanApplicationDetail> {
        let application = self.load(id).await?;

        let customer = self
            .customers
            .find_by_id(application.customer_id)
            .await?
            .ok_or_else(|| ApiError::InternalError("Application customer missing".to_string()))?;

        if !actor.role.is_staff() && customer.user_id != actor.user_id {
            tracing::warn!(
                user_id = %actor.user_id,
                application_id = %id,
                "Customer attempted to view another customer's application"
            );
            return Err(ApiError::Forbidden(
                "You can only view your own applications".to_string(),
            ));
        }

        let product = self
            .products
            .find_by_id(application.loan_product_id)
            .await?
            .ok_or_else(|| ApiError::InternalError("Application product missing".to_string()))?;

        let collaterals = self
            .collaterals
            .list(&CollateralFilter {
                application_id: Some(application.id),
                status: Some(CollateralStatus::Pledged),
                ..Default::default()
            })
            .await?;
        let collateral_value = total_value(&collaterals);

        let total_interest = calculate_total_interest(
            application.requested_amount,
            application.interest_rate,
            application.tenure_months.max(1) as u32,
        )?;

        Ok(LoanApplicationDetail {
            ltv_ratio: calculate_ltv(application.principal(), collateral_value),
            customer: ApplicantView {
                id: customer.id,
                customer_code: customer.customer_code,
                first_name: customer.first_name,
                last_name: customer.last_name,
                email: mask_email(&customer.email),
                phone_number: mask_phone(&customer.phone_number),
                pan_number: mask_pan(&customer.pan_number),
                aadhaar_number: mask_aadhaar(&customer.aadhaar_last4),
                kyc_status: customer.kyc_status,
            },
            loan_product: ProductView {
                id: product.id,
                product_code: product.product_code,
                product_name: product.product_name,
                interest_rate: product.interest_rate,
                processing_fee_percentage: product.processing_fee_percentage,
                ltv_ratio: product.ltv_ratio,
            },
            application,
            collaterals,
            collateral_value,
            total_interest,
        })
    }

    /// Generic status change. The target arrives as a wire string.
    pub async fn update_status(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
        request: UpdateStatusRequest,
    ) -> ApiResult<LoanApplication> {
        self.ensure_reviewer(actor, id)?;
        let to = ApplicationStatus::parse(&request.status).ok_or_else(|| {
            ApiError::ValidationError(format!("Invalid status: {}", request.status))
        })?;

        self.transition(
            actor,
            id,
            Transition {
                to,
                review_notes: request.review_notes,
                approved_amount: request.approved_amount,
            },
        )
        .await
    }

    pub async fn approve(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
        request: ApproveRequest,
    ) -> ApiResult<LoanApplication> {
        self.ensure_reviewer(actor, id)?;
        self.transition(
            actor,
            id,
            Transition {
                to: ApplicationStatus::Approved,
                review_notes: request.review_notes,
                approved_amount: request.approved_amount,
            },
        )
        .await
    }

    pub async fn reject(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
        request: RejectRequest,
    ) -> ApiResult<LoanApplication> {
        self.ensure_reviewer(actor, id)?;
        self.transition(
            actor,
            id,
            Transition {
                to: ApplicationStatus::Rejected,
                review_notes: request.review_notes,
                approved_amount: None,
            },
        )
        .await
    }

    /// Customers never move an application, whatever the target
    fn ensure_reviewer(&self, actor: &AuthenticatedUser, id: Uuid) -> ApiResult<()> {
        if actor.role.is_staff() {
            return Ok(());
        }
        tracing::warn!(
            user_id = %actor.user_id,
            role = %actor.role.as_str(),
            application_id = %id,
            "Status change attempted without reviewer role"
        );
        Err(ApiError::Forbidden(
            "Only loan officers and admins can change application status".to_string(),
        ))
    }

    async fn transition(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
        transition: Transition,
    ) -> ApiResult<LoanApplication> {
        let current = self.load(id).await?;
        let from = current.status;
        let updated = workflow::apply(&current, transition, actor.user_id, Utc::now())?;
        let to = updated.status;

        let saved = self
            .applications
            .update_status(&updated, from, workflow::releases_collateral(to))
            .await?
            .ok_or_else(|| {
                ApiError::Conflict(
                    "Application status changed concurrently; reload and retry".to_string(),
                )
            })?;

        tracing::info!(
            application_id = %id,
            from = %from,
            to = %to,
            reviewed_by = %actor.user_id,
            "Application status updated"
        );
        Ok(saved)
    }
}
