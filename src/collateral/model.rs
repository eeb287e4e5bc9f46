use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::utils::validate_isin;

/// Mutual fund category
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "mf_category", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MfCategory {
    Equity,
    Hybrid,
    Debt,
    Liquid,
}

impl MfCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MfCategory::Equity => "EQUITY",
            MfCategory::Hybrid => "HYBRID",
            MfCategory::Debt => "DEBT",
            MfCategory::Liquid => "LIQUID",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "collateral_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollateralStatus {
    Available,
    Pledged,
}

/// A mutual fund holding that can back a loan
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Collateral {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub isin: String,
    pub scheme_name: String,
    pub amc_name: String,
    pub folio_number: String,
    pub category: MfCategory,
    pub units: f64,
    pub nav: f64,
    pub value: f64,
    pub status: CollateralStatus,
    pub application_id: Option<Uuid>,
    pub pledged_at: Option<DateTime<Utc>>,
    pub released_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct HoldingInput {
    #[validate(custom = "validate_isin")]
    pub isin: String,

    #[validate(length(min = 1, max = 200))]
    pub scheme_name: String,

    #[validate(length(min = 1, max = 100))]
    pub amc_name: String,

    #[validate(length(min = 1, max = 50))]
    pub folio_number: String,

    pub category: MfCategory,

    #[validate(range(min = 0.001, message = "Units must be positive"))]
    pub units: f64,

    #[validate(range(min = 0.01, message = "NAV must be positive"))]
    pub nav: f64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ImportHoldingsRequest {
    /// Target customer when staff import on a customer's behalf
    pub customer_id: Option<Uuid>,

    #[validate]
    pub holdings: Vec<HoldingInput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PledgeRequest {
    pub application_id: Uuid,
    pub collateral_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRequest {
    pub collateral_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CollateralFilter {
    pub customer_id: Option<Uuid>,
    pub status: Option<CollateralStatus>,
    pub application_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ValuationQuery {
    pub application_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
}

/// Pledged value summary, with LTV when an application is in scope
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Valuation {
    pub customer_id: Option<Uuid>,
    pub application_id: Option<Uuid>,
    pub holdings: usize,
    pub total_value: f64,
    pub by_category: BTreeMap<String, f64>,
    pub loan_amount: Option<f64>,
    pub ltv_ratio: Option<f64>,
}

/// Sum of holding values, rounded to paise
pub fn total_value(holdings: &[Collateral]) -> f64 {
    crate::services::calculator::round2(holdings.iter().map(|c| c.value).sum())
}
