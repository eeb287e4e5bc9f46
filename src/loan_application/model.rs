use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::collateral::Collateral;
use crate::customer::KycStatus;
use crate::models::PaginationParams;

/// Lifecycle state of a loan application
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash)]
#[sqlx(type_name = "application_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    Disbursed,
    Closed,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 7] = [
        ApplicationStatus::Draft,
        ApplicationStatus::Submitted,
        ApplicationStatus::UnderReview,
        ApplicationStatus::Approved,
        ApplicationStatus::Rejected,
        ApplicationStatus::Disbursed,
        ApplicationStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "DRAFT",
            ApplicationStatus::Submitted => "SUBMITTED",
            ApplicationStatus::UnderReview => "UNDER_REVIEW",
            ApplicationStatus::Approved => "APPROVED",
            ApplicationStatus::Rejected => "REJECTED",
            ApplicationStatus::Disbursed => "DISBURSED",
            ApplicationStatus::Closed => "CLOSED",
        }
    }

    /// Case-insensitive parse of the wire name
    pub fn parse(s: &str) -> Option<Self> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL.into_iter().find(|status| status.as_str() == upper)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loan application row
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LoanApplication {
    pub id: Uuid,
    pub application_number: String,
    pub customer_id: Uuid,
    pub loan_product_id: Uuid,
    pub requested_amount: f64,
    pub approved_amount: Option<f64>,
    pub tenure_months: i32,
    pub interest_rate: f64,
    pub purpose_of_loan: String,
    pub monthly_income: Option<f64>,
    pub existing_emi: Option<f64>,
    pub calculated_emi: f64,
    pub status: ApplicationStatus,
    pub review_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub reviewed_by_id: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub approved_by_id: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub disbursed_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoanApplication {
    /// Principal used for LTV and outstanding totals
    pub fn principal(&self) -> f64 {
        self.approved_amount.unwrap_or(self.requested_amount)
    }
}

/// Row shape for list views
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LoanApplicationSummary {
    pub id: Uuid,
    pub application_number: String,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub loan_product_id: Uuid,
    pub product_name: String,
    pub requested_amount: f64,
    pub approved_amount: Option<f64>,
    pub tenure_months: i32,
    pub interest_rate: f64,
    pub calculated_emi: f64,
    pub status: ApplicationStatus,
    pub review_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoanApplicationRequest {
    pub loan_product_id: Uuid,

    #[validate(range(min = 1.0, message = "Requested amount must be positive"))]
    pub requested_amount: f64,

    #[validate(range(min = 1, max = 600, message = "Tenure must be between 1 and 600 months"))]
    pub tenure: u32,

    #[validate(length(min = 3, max = 500))]
    pub purpose_of_loan: String,

    #[validate(range(min = 0.0))]
    pub monthly_income: Option<f64>,

    #[serde(alias = "existingEMI")]
    #[validate(range(min = 0.0))]
    pub existing_emi: Option<f64>,

    #[serde(default)]
    pub collateral_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: String,
    pub review_notes: Option<String>,
    pub approved_amount: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ApproveRequest {
    pub approved_amount: Option<f64>,
    pub review_notes: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RejectRequest {
    pub review_notes: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListApplicationsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
}

impl ListApplicationsQuery {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            limit: self.limit,
        }
    }
}

/// Repository-level list filter
#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    pub customer_id: Option<Uuid>,
    pub status: Option<ApplicationStatus>,
    pub offset: i64,
    pub limit: i64,
}

// ============================================================================
// Responses
// ============================================================================

/// Creation response: the stored application plus derived figures
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedApplication {
    #[serde(flatten)]
    pub application: LoanApplication,
    pub total_interest: f64,
    pub collateral_value: f64,
    pub ltv_ratio: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantView {
    pub id: Uuid,
    pub customer_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub pan_number: String,
    pub aadhaar_number: String,
    pub kyc_status: KycStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: Uuid,
    pub product_code: String,
    pub product_name: String,
    pub interest_rate: f64,
    pub processing_fee_percentage: Option<f64>,
    pub ltv_ratio: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanApplicationDetail {
    #[serde(flatten)]
    pub application: LoanApplication,
    pub customer: ApplicantView,
    pub loan_product: ProductView,
    pub collaterals: Vec<Collateral>,
    pub collateral_value: f64,
    pub ltv_ratio: f64,
    pub total_interest: f64,
}

/// Aggregates over applications, optionally scoped to one customer
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStats {
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
    pub disbursed_count: i64,
    pub disbursed_principal: f64,
}

impl ApplicationStats {
    /// Fold `(status, count, principal)` groups; every status gets a key
    pub fn from_groups(groups: impl IntoIterator<Item = (ApplicationStatus, i64, f64)>) -> Self {
        let mut stats = ApplicationStats {
            by_status: ApplicationStatus::ALL
                .iter()
                .map(|s| (s.as_str().to_string(), 0))
                .collect(),
            ..Default::default()
        };
        for (status, count, principal) in groups {
            stats.total += count;
            *stats.by_status.entry(status.as_str().to_string()).or_insert(0) += count;
            if status == ApplicationStatus::Disbursed {
                stats.disbursed_count += count;
                stats.disbursed_principal += principal;
            }
        }
        stats.disbursed_principal = crate::services::calculator::round2(stats.disbursed_principal);
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_accepts_wire_names() {
        assert_eq!(
            ApplicationStatus::parse("UNDER_REVIEW"),
            Some(ApplicationStatus::UnderReview)
        );
        assert_eq!(
            ApplicationStatus::parse(" approved "),
            Some(ApplicationStatus::Approved)
        );
        assert_eq!(ApplicationStatus::parse("PENDING"), None);
        assert_eq!(ApplicationStatus::parse(""), None);
    }

    #[test]
    fn test_status_display_matches_serde() {
        for status in ApplicationStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status));
        }
    }

    #[test]
    fn test_create_request_accepts_legacy_emi_spelling() {
        let body = serde_json::json!({
            "loanProductId": Uuid::new_v4(),
            "requestedAmount": 200000.0,
            "tenure": 12,
            "purposeOfLoan": "Business expansion",
            "existingEMI": 4500.0
        });
        let request: CreateLoanApplicationRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.existing_emi, Some(4500.0));
        assert!(request.collateral_ids.is_empty());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_stats_from_groups() {
        let stats = ApplicationStats::from_groups([
            (ApplicationStatus::Draft, 3, 300_000.0),
            (ApplicationStatus::Disbursed, 2, 750_000.5),
        ]);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.by_status["DRAFT"], 3);
        assert_eq!(stats.by_status["CLOSED"], 0);
        assert_eq!(stats.by_status.len(), 7);
        assert_eq!(stats.disbursed_count, 2);
        assert_eq!(stats.disbursed_principal, 750_000.5);
    }

    #[test]
    fn test_create_request_rejects_zero_tenure() {
        let body = serde_json::json!({
            "loanProductId": Uuid::new_v4(),
            "requestedAmount": 200000.0,
            "tenure": 0,
            "purposeOfLoan": "Business expansion"
        });
        let request: CreateLoanApplicationRequest = serde_json::from_value(body).unwrap();
        assert!(request.validate().is_err());
    }
}
