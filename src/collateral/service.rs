use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use super::model::{
    total_value, Collateral, CollateralFilter, CollateralStatus, ImportHoldingsRequest,
    PledgeRequest, ReleaseRequest, Valuation, ValuationQuery,
};
use super::repository::{closed_application_conflict, CollateralRepository};
use crate::customer::{Customer, CustomerRepository};
use crate::error::{ApiError, ApiResult};
use crate::loan_application::{workflow, LoanApplication, LoanApplicationRepository};
use crate::middleware::AuthenticatedUser;
use crate::services::calculator::{calculate_ltv, round2};
use crate::utils::unique_ids;

/// Upper bound on holdings per import call
const MAX_IMPORT_BATCH: usize = 100;

#[derive(Clone)]
pub struct CollateralService {
    collaterals: Arc<dyn CollateralRepository>,
    applications: Arc<dyn LoanApplicationRepository>,
    customers: Arc<dyn CustomerRepository>,
}

impl CollateralService {
    pub fn new(
        collaterals: Arc<dyn CollateralRepository>,
        applications: Arc<dyn LoanApplicationRepository>,
        customers: Arc<dyn CustomerRepository>,
    ) -> Self {
        Self {
            collaterals,
            applications,
            customers,
        }
    }

    async fn own_customer(&self, actor: &AuthenticatedUser) -> ApiResult<Customer> {
        self.customers
            .find_by_user_id(actor.user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Customer profile not found".to_string()))
    }

    async fn accessible_application(
        &self,
        actor: &AuthenticatedUser,
        application_id: Uuid,
    ) -> ApiResult<LoanApplication> {
        let application = self
            .applications
            .find_by_id(application_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Loan application not found".to_string()))?;

        if !actor.role.is_staff() {
            let customer = self.own_customer(actor).await?;
            if application.customer_id != customer.id {
                return Err(ApiError::Forbidden(
                    "You can only access your own applications".to_string(),
                ));
            }
        }
        Ok(application)
    }

    /// Resolve the customer a request targets. Customers always act on their
    /// own profile; staff must name one.
    async fn target_customer(
        &self,
        actor: &AuthenticatedUser,
        requested: Option<Uuid>,
    ) -> ApiResult<Customer> {
        if !actor.role.is_staff() {
            let own = self.own_customer(actor).await?;
            if requested.is_some_and(|id| id != own.id) {
                return Err(ApiError::Forbidden(
                    "You can only manage your own holdings".to_string(),
                ));
            }
            return Ok(own);
        }

        let id = requested
            .ok_or_else(|| ApiError::BadRequest("customerId is required".to_string()))?;
        self.customers
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Customer not found".to_string()))
    }

    pub async fn import_holdings(
        &self,
        actor: &AuthenticatedUser,
        request: ImportHoldingsRequest,
    ) -> ApiResult<Vec<Collateral>> {
        request.validate()?;
        if request.holdings.is_empty() || request.holdings.len() > MAX_IMPORT_BATCH {
            return Err(ApiError::ValidationError(format!(
                "Provide between 1 and {} holdings",
                MAX_IMPORT_BATCH
            )));
        }

        let customer = self.target_customer(actor, request.customer_id).await?;
        let now = Utc::now();

        let holdings: Vec<Collateral> = request
            .holdings
            .into_iter()
            .map(|h| Collateral {
                id: Uuid::new_v4(),
                customer_id: customer.id,
                value: round2(h.units * h.nav),
                isin: h.isin,
                scheme_name: h.scheme_name,
                amc_name: h.amc_name,
                folio_number: h.folio_number,
                category: h.category,
                units: h.units,
                nav: h.nav,
                status: CollateralStatus::Available,
                application_id: None,
                pledged_at: None,
                released_at: None,
                created_at: now,
                updated_at: now,
            })
            .collect();

        let inserted = self.collaterals.insert_many(&holdings).await?;
        tracing::info!(
            customer_id = %customer.id,
            count = inserted.len(),
            total_value = total_value(&inserted),
            "Imported mutual fund holdings"
        );
        Ok(inserted)
    }

    pub async fn list(
        &self,
        actor: &AuthenticatedUser,
        mut filter: CollateralFilter,
    ) -> ApiResult<Vec<Collateral>> {
        if !actor.role.is_staff() {
            let own = self.own_customer(actor).await?;
            filter.customer_id = Some(own.id);
        }
        self.collaterals.list(&filter).await
    }

    pub async fn list_for_customer(
        &self,
        actor: &AuthenticatedUser,
        customer_id: Uuid,
    ) -> ApiResult<Vec<Collateral>> {
        let customer = self.target_customer(actor, Some(customer_id)).await?;
        self.collaterals
            .list(&CollateralFilter {
                customer_id: Some(customer.id),
                ..Default::default()
            })
            .await
    }

    pub async fn pledge(
        &self,
        actor: &AuthenticatedUser,
        request: PledgeRequest,
    ) -> ApiResult<Vec<Collateral>> {
        let ids = unique_ids(&request.collateral_ids);
        if ids.is_empty() {
            return Err(ApiError::ValidationError(
                "collateralIds must not be empty".to_string(),
            ));
        }

        let application = self
            .accessible_application(actor, request.application_id)
            .await?;
        if !workflow::accepts_collateral(application.status) {
            return Err(closed_application_conflict(application.status));
        }

        let pledged = self
            .collaterals
            .pledge(application.id, application.customer_id, &ids, Utc::now())
            .await?;

        tracing::info!(
            application_id = %application.id,
            count = pledged.len(),
            pledged_by = %actor.user_id,
            "Collateral pledged"
        );
        Ok(pledged)
    }

    pub async fn release(
        &self,
        actor: &AuthenticatedUser,
        request: ReleaseRequest,
    ) -> ApiResult<Vec<Collateral>> {
        if !actor.role.is_staff() {
            return Err(ApiError::Forbidden("Staff access required".to_string()));
        }
        let ids = unique_ids(&request.collateral_ids);
        if ids.is_empty() {
            return Err(ApiError::ValidationError(
                "collateralIds must not be empty".to_string(),
            ));
        }

        let released = self.collaterals.release(&ids, Utc::now()).await?;
        tracing::info!(
            count = released.len(),
            released_by = %actor.user_id,
            "Collateral released"
        );
        Ok(released)
    }

    pub async fn valuation(
        &self,
        actor: &AuthenticatedUser,
        query: ValuationQuery,
    ) -> ApiResult<Valuation> {
        let (customer_id, application) = match query.application_id {
            Some(application_id) => {
                let application = self.accessible_application(actor, application_id).await?;
                (application.customer_id, Some(application))
            }
            None => (self.target_customer(actor, query.customer_id).await?.id, None),
        };

        let holdings = self
            .collaterals
            .list(&CollateralFilter {
                customer_id: Some(customer_id),
                status: Some(CollateralStatus::Pledged),
                application_id: application.as_ref().map(|a| a.id),
            })
            .await?;

        let mut by_category: BTreeMap<String, f64> = BTreeMap::new();
        for holding in &holdings {
            *by_category
                .entry(holding.category.as_str().to_string())
                .or_insert(0.0) += holding.value;
        }
        for value in by_category.values_mut() {
            *value = round2(*value);
        }

        let total = total_value(&holdings);
        let loan_amount = application.as_ref().map(LoanApplication::principal);

        Ok(Valuation {
            customer_id: Some(customer_id),
            application_id: application.as_ref().map(|a| a.id),
            holdings: holdings.len(),
            total_value: total,
            by_category,
            loan_amount,
            ltv_ratio: loan_amount.map(|amount| calculate_ltv(amount, total)),
        })
    }
}
