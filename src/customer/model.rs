use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::models::{CustomerSummary, PaginationParams};
use crate::utils::{mask_aadhaar, validate_indian_phone, validate_pincode};

/// KYC verification state
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "kyc_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KycStatus {
    Pending,
    Submitted,
    Verified,
    Rejected,
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[validate(length(min = 1, max = 200))]
    pub line1: String,

    #[validate(length(max = 200))]
    pub line2: Option<String>,

    #[validate(length(min = 2, max = 100))]
    pub city: String,

    #[validate(length(min = 2, max = 100))]
    pub state: String,

    #[validate(custom = "validate_pincode")]
    pub pincode: String,
}

/// Customer profile row
#[derive(Debug, Deserialize, sqlx::FromRow, Clone)]
pub struct Customer {
    pub id: Uuid,
    pub user_id: Uuid,
    pub customer_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub date_of_birth: NaiveDate,
    pub pan_number: String,
    pub aadhaar_hash: String,
    pub aadhaar_last4: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub annual_income: Option<f64>,
    pub occupation: Option<String>,
    pub kyc_status: KycStatus,
    pub kyc_verified_at: Option<DateTime<Utc>>,
    pub kyc_verified_by_id: Option<Uuid>,
    pub kyc_remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn address(&self) -> Address {
        Address {
            line1: self.address_line1.clone(),
            line2: self.address_line2.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            pincode: self.pincode.clone(),
        }
    }

    pub fn set_address(&mut self, address: Address) {
        self.address_line1 = address.line1;
        self.address_line2 = address.line2;
        self.city = address.city;
        self.state = address.state;
        self.pincode = address.pincode;
    }

    pub fn summary(&self) -> CustomerSummary {
        CustomerSummary {
            id: self.id,
            customer_code: self.customer_code.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            kyc_status: self.kyc_status,
        }
    }
}

/// Customer as returned by the API. The Aadhaar digest never leaves the server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub customer_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub date_of_birth: NaiveDate,
    pub pan_number: String,
    pub aadhaar_number: String,
    pub address: Address,
    pub annual_income: Option<f64>,
    pub occupation: Option<String>,
    pub kyc_status: KycStatus,
    pub kyc_verified_at: Option<DateTime<Utc>>,
    pub kyc_remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Customer> for CustomerProfile {
    fn from(c: Customer) -> Self {
        let address = c.address();
        Self {
            id: c.id,
            user_id: c.user_id,
            customer_code: c.customer_code,
            first_name: c.first_name,
            last_name: c.last_name,
            email: c.email,
            phone_number: c.phone_number,
            date_of_birth: c.date_of_birth,
            pan_number: c.pan_number,
            aadhaar_number: mask_aadhaar(&c.aadhaar_last4),
            address,
            annual_income: c.annual_income,
            occupation: c.occupation,
            kyc_status: c.kyc_status,
            kyc_verified_at: c.kyc_verified_at,
            kyc_remarks: c.kyc_remarks,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerRequest {
    #[validate(length(min = 2, max = 50))]
    pub first_name: Option<String>,

    #[validate(length(min = 2, max = 50))]
    pub last_name: Option<String>,

    #[validate(custom = "validate_indian_phone")]
    pub phone_number: Option<String>,

    #[validate]
    pub address: Option<Address>,

    #[validate(range(min = 0.0))]
    pub annual_income: Option<f64>,

    #[validate(length(max = 100))]
    pub occupation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyKycRequest {
    pub approved: bool,
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CustomerListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub kyc_status: Option<KycStatus>,
}

impl CustomerListQuery {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            limit: self.limit,
        }
    }
}
