//! Identifier generation, pagination, PII masking and field validators

use std::collections::HashSet;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;
use validator::ValidationError;

use crate::models::PaginationParams;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;
/// Highest page whose offset still fits in an `i64` at the largest page size
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

// ============================================================================
// Identifiers
// ============================================================================

/// `APP` + year and month + five random digits, e.g. `APP20260412345`
pub fn generate_application_number(now: DateTime<Utc>) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..100_000);
    format!("APP{}{:05}", now.format("%Y%m"), suffix)
}

/// `CUST` + six random digits
pub fn generate_customer_code() -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("CUST{:06}", suffix)
}

/// Order-preserving de-duplication of requested ids
pub fn unique_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Hex-encoded SHA-256 digest
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

// ============================================================================
// Pagination
// ============================================================================

/// Normalized page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn from_params(params: PaginationParams) -> Self {
        let page = params.page.unwrap_or(1).clamp(1, MAX_PAGE);
        let limit = params
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

pub fn total_pages(total: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

// ============================================================================
// Masking
// ============================================================================

fn last_chars(value: &str, n: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    let start = chars.len().saturating_sub(n);
    chars[start..].iter().collect()
}

/// `ABCDE1234F` -> `AB******4F`
pub fn mask_pan(pan: &str) -> String {
    let chars: Vec<char> = pan.chars().collect();
    if chars.len() < 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}{}{}", head, "*".repeat(chars.len() - 4), tail)
}

/// Aadhaar is only ever held as its last four digits
pub fn mask_aadhaar(last4: &str) -> String {
    format!("XXXX-XXXX-{}", last4)
}

/// `9876543210` -> `******3210`
pub fn mask_phone(phone: &str) -> String {
    let len = phone.chars().count();
    if len <= 4 {
        return phone.to_string();
    }
    format!("{}{}", "*".repeat(len - 4), last_chars(phone, 4))
}

/// `rahul.sharma@example.com` -> `rah***@example.com`
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let visible: String = local.chars().take(3).collect();
            format!("{}***@{}", visible, domain)
        }
        None => "***".to_string(),
    }
}

// ============================================================================
// Validators
// ============================================================================

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Ten digit Indian mobile number starting 6-9
pub fn validate_indian_phone(phone: &str) -> Result<(), ValidationError> {
    let valid = phone.len() == 10
        && phone.chars().all(|c| c.is_ascii_digit())
        && matches!(phone.as_bytes()[0], b'6'..=b'9');
    if valid {
        Ok(())
    } else {
        Err(invalid("phone", "Please provide a valid 10-digit Indian mobile number"))
    }
}

/// Five letters, four digits, one letter. Case is normalized on storage.
pub fn validate_pan(pan: &str) -> Result<(), ValidationError> {
    let bytes = pan.as_bytes();
    let valid = bytes.len() == 10
        && bytes[..5].iter().all(u8::is_ascii_alphabetic)
        && bytes[5..9].iter().all(u8::is_ascii_digit)
        && bytes[9].is_ascii_alphabetic();
    if valid {
        Ok(())
    } else {
        Err(invalid("pan", "Please provide a valid PAN number"))
    }
}

/// Twelve digits, not starting with 0 or 1
pub fn validate_aadhaar(aadhaar: &str) -> Result<(), ValidationError> {
    let valid = aadhaar.len() == 12
        && aadhaar.chars().all(|c| c.is_ascii_digit())
        && !matches!(aadhaar.as_bytes()[0], b'0' | b'1');
    if valid {
        Ok(())
    } else {
        Err(invalid("aadhaar", "Please provide a valid 12-digit Aadhaar number"))
    }
}

/// Six digit postal code, not starting with 0
pub fn validate_pincode(pincode: &str) -> Result<(), ValidationError> {
    let valid = pincode.len() == 6
        && pincode.chars().all(|c| c.is_ascii_digit())
        && !pincode.starts_with('0');
    if valid {
        Ok(())
    } else {
        Err(invalid("pincode", "Please provide a valid 6-digit pincode"))
    }
}

/// Two letter country prefix, nine alphanumerics, one check digit
pub fn validate_isin(isin: &str) -> Result<(), ValidationError> {
    let bytes = isin.as_bytes();
    let valid = bytes.len() == 12
        && bytes[..2].iter().all(u8::is_ascii_uppercase)
        && bytes[2..11].iter().all(u8::is_ascii_alphanumeric)
        && bytes[11].is_ascii_digit();
    if valid {
        Ok(())
    } else {
        Err(invalid("isin", "Please provide a valid ISIN"))
    }
}

pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age
}

/// Applicant must be 18 or older
pub fn validate_adult(date_of_birth: &NaiveDate) -> Result<(), ValidationError> {
    if age_on(*date_of_birth, Utc::now().date_naive()) >= 18 {
        Ok(())
    } else {
        Err(invalid("date_of_birth", "Applicant must be at least 18 years old"))
    }
}
