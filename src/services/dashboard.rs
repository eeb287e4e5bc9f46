//! Dashboard statistics

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::collateral::CollateralRepository;
use crate::customer::CustomerRepository;
use crate::error::{ApiError, ApiResult};
use crate::loan_application::LoanApplicationRepository;
use crate::middleware::AuthenticatedUser;
use crate::services::calculator::round2;

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDashboard {
    pub total_applications: i64,
    pub active_loans: i64,
    pub total_outstanding: f64,
    pub pledged_collateral_value: f64,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StaffDashboard {
    pub total_applications: i64,
    pub by_status: BTreeMap<String, i64>,
    pub active_loans: i64,
    pub total_customers: i64,
    pub total_collateral: f64,
    pub total_outstanding: f64,
}

/// Shape depends on who asks
#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum DashboardStats {
    Customer(CustomerDashboard),
    Staff(StaffDashboard),
}

pub struct DashboardService {
    applications: Arc<dyn LoanApplicationRepository>,
    customers: Arc<dyn CustomerRepository>,
    collaterals: Arc<dyn CollateralRepository>,
}

impl DashboardService {
    pub fn new(
        applications: Arc<dyn LoanApplicationRepository>,
        customers: Arc<dyn CustomerRepository>,
        collaterals: Arc<dyn CollateralRepository>,
    ) -> Self {
        Self {
            applications,
            customers,
            collaterals,
        }
    }

    pub async fn stats(&self, actor: &AuthenticatedUser) -> ApiResult<DashboardStats> {
        if actor.role.is_staff() {
            return self.staff_stats().await.map(DashboardStats::Staff);
        }

        let customer = self
            .customers
            .find_by_user_id(actor.user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Customer profile not found".to_string()))?;

        let stats = self.applications.stats(Some(customer.id)).await?;
        let pledged = self.collaterals.pledged_value(Some(customer.id)).await?;

        Ok(DashboardStats::Customer(CustomerDashboard {
            total_applications: stats.total,
            active_loans: stats.disbursed_count,
            total_outstanding: stats.disbursed_principal,
            pledged_collateral_value: round2(pledged),
        }))
    }

    async fn staff_stats(&self) -> ApiResult<StaffDashboard> {
        let stats = self.applications.stats(None).await?;
        let total_customers = self.customers.count().await?;
        let total_collateral = self.collaterals.pledged_value(None).await?;

        Ok(StaffDashboard {
            total_applications: stats.total,
            by_status: stats.by_status,
            active_loans: stats.disbursed_count,
            total_customers,
            total_collateral: round2(total_collateral),
            total_outstanding: stats.disbursed_principal,
        })
    }
}
