//! Customer profiles and the KYC review cycle

mod common;

use lms_server::customer::{
    CustomerListQuery, KycStatus, UpdateCustomerRequest, VerifyKycRequest,
};
use lms_server::middleware::AuthenticatedUser;
use lms_server::models::UserRole;
use lms_server::state::AppState;

use common::{customer, memory_state, staff};

struct Fixture {
    state: AppState,
    rahul: AuthenticatedUser,
    priya: AuthenticatedUser,
    officer: AuthenticatedUser,
}

async fn fixture() -> Fixture {
    let state = memory_state();
    let rahul = customer(&state, "rahul@example.com", "ABCDE1234F").await;
    let priya = customer(&state, "priya@example.com", "PQRST6789K").await;
    let officer = staff(&state, "officer@example.com", UserRole::LoanOfficer).await;
    Fixture {
        state,
        rahul,
        priya,
        officer,
    }
}

fn verdict(approved: bool, remarks: &str) -> VerifyKycRequest {
    VerifyKycRequest {
        approved,
        remarks: Some(remarks.to_string()),
    }
}

#[tokio::test]
async fn test_owner_submits_kyc_once() {
    let f = fixture().await;
    let service = &f.state.customer_service;
    let id = service.own_profile(&f.rahul).await.unwrap().id;

    let submitted = service.submit_kyc(&f.rahul, id).await.unwrap();
    assert_eq!(submitted.kyc_status, KycStatus::Submitted);

    let err = service.submit_kyc(&f.rahul, id).await.unwrap_err();
    assert_eq!(err.error_code(), "CONFLICT");

    // Neither another customer nor staff submits on the owner's behalf
    let err = service.submit_kyc(&f.priya, id).await.unwrap_err();
    assert_eq!(err.error_code(), "FORBIDDEN");
    let err = service.submit_kyc(&f.officer, id).await.unwrap_err();
    assert_eq!(err.error_code(), "FORBIDDEN");
}

#[tokio::test]
async fn test_verify_kyc_is_staff_only_and_records_verifier() {
    let f = fixture().await;
    let service = &f.state.customer_service;
    let id = service.own_profile(&f.rahul).await.unwrap().id;
    service.submit_kyc(&f.rahul, id).await.unwrap();

    let err = service
        .verify_kyc(&f.rahul, id, verdict(true, "Self approval"))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "FORBIDDEN");

    let verified = service
        .verify_kyc(&f.officer, id, verdict(true, "Documents match"))
        .await
        .unwrap();
    assert_eq!(verified.kyc_status, KycStatus::Verified);
    assert_eq!(verified.kyc_remarks.as_deref(), Some("Documents match"));
    assert!(verified.kyc_verified_at.is_some());

    let stored = service.load_accessible(&f.officer, id).await.unwrap();
    assert_eq!(stored.kyc_verified_by_id, Some(f.officer.user_id));

    // Verified is final for both sides
    let err = service
        .verify_kyc(&f.officer, id, verdict(false, "Second look"))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "CONFLICT");
    let err = service.submit_kyc(&f.rahul, id).await.unwrap_err();
    assert_eq!(err.error_code(), "CONFLICT");
}

#[tokio::test]
async fn test_rejected_kyc_can_be_resubmitted() {
    let f = fixture().await;
    let service = &f.state.customer_service;
    let id = service.own_profile(&f.rahul).await.unwrap().id;
    service.submit_kyc(&f.rahul, id).await.unwrap();

    let rejected = service
        .verify_kyc(&f.officer, id, verdict(false, "PAN copy unreadable"))
        .await
        .unwrap();
    assert_eq!(rejected.kyc_status, KycStatus::Rejected);
    assert_eq!(rejected.kyc_remarks.as_deref(), Some("PAN copy unreadable"));

    let err = service
        .verify_kyc(&f.officer, id, verdict(true, "Changed my mind"))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "CONFLICT");

    let resubmitted = service.submit_kyc(&f.rahul, id).await.unwrap();
    assert_eq!(resubmitted.kyc_status, KycStatus::Submitted);
    assert!(resubmitted.kyc_remarks.is_none());
}

#[tokio::test]
async fn test_customer_cannot_read_or_edit_another_profile() {
    let f = fixture().await;
    let service = &f.state.customer_service;
    let rahul_id = service.own_profile(&f.rahul).await.unwrap().id;

    let err = service.get(&f.priya, rahul_id).await.unwrap_err();
    assert_eq!(err.error_code(), "FORBIDDEN");

    let err = service
        .update(
            &f.priya,
            rahul_id,
            UpdateCustomerRequest {
                occupation: Some("Hijacked".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "FORBIDDEN");

    let updated = service
        .update(
            &f.rahul,
            rahul_id,
            UpdateCustomerRequest {
                occupation: Some("Engineer".to_string()),
                annual_income: Some(1_800_000.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.occupation.as_deref(), Some("Engineer"));
    assert_eq!(updated.first_name, "Rahul");

    // Staff may read any profile
    let seen = service.get(&f.officer, rahul_id).await.unwrap();
    assert_eq!(seen.occupation.as_deref(), Some("Engineer"));
    assert_eq!(seen.aadhaar_number, "XXXX-XXXX-1234");
}

#[tokio::test]
async fn test_list_is_staff_only_and_filters_by_kyc_status() {
    let f = fixture().await;
    let service = &f.state.customer_service;
    let rahul_id = service.own_profile(&f.rahul).await.unwrap().id;
    service.submit_kyc(&f.rahul, rahul_id).await.unwrap();

    let err = service
        .list(&f.rahul, CustomerListQuery::default())
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "FORBIDDEN");

    let all = service
        .list(&f.officer, CustomerListQuery::default())
        .await
        .unwrap();
    assert_eq!(all.total, 2);

    let submitted = service
        .list(
            &f.officer,
            CustomerListQuery {
                kyc_status: Some(KycStatus::Submitted),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(submitted.total, 1);
    assert_eq!(submitted.data[0].id, rahul_id);

    let pending = service
        .list(
            &f.officer,
            CustomerListQuery {
                kyc_status: Some(KycStatus::Pending),
                limit: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(pending.total, 1);
    assert_eq!(pending.data[0].email, "priya@example.com");
    assert!(!pending.has_next);
}
