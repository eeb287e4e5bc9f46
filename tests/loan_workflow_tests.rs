//! Loan application lifecycle over the in-memory store

mod common;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use lms_server::collateral::{CollateralFilter, CollateralStatus, PledgeRequest, ValuationQuery};
use lms_server::loan_application::{
    ApplicationStatus, ApproveRequest, CreateLoanApplicationRequest, ListApplicationsQuery,
    RejectRequest, UpdateStatusRequest,
};
use lms_server::middleware::AuthenticatedUser;
use lms_server::models::UserRole;
use lms_server::services::DashboardStats;
use lms_server::state::AppState;

use common::{customer, holdings, memory_state, product, staff};

fn create_request(
    product_id: Uuid,
    amount: f64,
    tenure: u32,
    collateral_ids: Vec<Uuid>,
) -> CreateLoanApplicationRequest {
    serde_json::from_value(json!({
        "loanProductId": product_id,
        "requestedAmount": amount,
        "tenure": tenure,
        "purposeOfLoan": "Working capital",
        "monthlyIncome": 120000.0,
        "collateralIds": collateral_ids
    }))
    .unwrap()
}

fn status(to: &str) -> UpdateStatusRequest {
    UpdateStatusRequest {
        status: to.to_string(),
        review_notes: None,
        approved_amount: None,
    }
}

struct Fixture {
    state: AppState,
    customer: AuthenticatedUser,
    officer: AuthenticatedUser,
    product_id: Uuid,
}

async fn fixture() -> Fixture {
    let state = memory_state();
    let customer = customer(&state, "rahul@example.com", "ABCDE1234F").await;
    let officer = staff(&state, "officer@example.com", UserRole::LoanOfficer).await;
    let product_id = product(&state).await.id;
    Fixture {
        state,
        customer,
        officer,
        product_id,
    }
}

#[tokio::test]
async fn test_create_application_starts_in_draft_with_emi() {
    let f = fixture().await;
    let pledged = holdings(&f.state, &f.customer, &[600_000.0, 400_000.0]).await;
    let ids = pledged.iter().map(|c| c.id).collect();

    let created = f
        .state
        .loan_application_service
        .create(&f.customer, create_request(f.product_id, 500_000.0, 24, ids))
        .await
        .unwrap();

    assert_eq!(created.application.status, ApplicationStatus::Draft);
    assert_eq!(created.application.calculated_emi, 23536.74);
    assert_eq!(created.total_interest, 64881.76);
    assert_eq!(created.application.interest_rate, 12.0);
    assert!(created.application.application_number.starts_with("APP"));
    assert_eq!(created.collateral_value, 1_000_000.0);
    assert_eq!(created.ltv_ratio, 50.0);

    let listed = f
        .state
        .collateral_service
        .list(&f.customer, CollateralFilter::default())
        .await
        .unwrap();
    assert!(listed
        .iter()
        .all(|c| c.status == CollateralStatus::Pledged
            && c.application_id == Some(created.application.id)));
}

#[tokio::test]
async fn test_create_outside_product_bounds_is_rejected() {
    let f = fixture().await;

    let err = f
        .state
        .loan_application_service
        .create(&f.customer, create_request(f.product_id, 10_000.0, 24, vec![]))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "BAD_REQUEST");

    let err = f
        .state
        .loan_application_service
        .create(&f.customer, create_request(f.product_id, 100_000.0, 48, vec![]))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "BAD_REQUEST");
}

#[tokio::test]
async fn test_staff_cannot_create_applications() {
    let f = fixture().await;

    let err = f
        .state
        .loan_application_service
        .create(&f.officer, create_request(f.product_id, 100_000.0, 12, vec![]))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "FORBIDDEN");
}

#[tokio::test]
async fn test_foreign_collateral_aborts_creation() {
    let f = fixture().await;
    let other = customer(&f.state, "priya@example.com", "PQRST6789K").await;
    let theirs = holdings(&f.state, &other, &[300_000.0]).await;

    let err = f
        .state
        .loan_application_service
        .create(
            &f.customer,
            create_request(f.product_id, 100_000.0, 12, vec![theirs[0].id]),
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "CONFLICT");

    let page = f
        .state
        .loan_application_service
        .list(&f.officer, ListApplicationsQuery::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);

    let still_available = f
        .state
        .collateral_service
        .list(&other, CollateralFilter::default())
        .await
        .unwrap();
    assert_eq!(still_available[0].status, CollateralStatus::Available);
}

#[tokio::test]
async fn test_customer_never_changes_status() {
    let f = fixture().await;
    let app = f
        .state
        .loan_application_service
        .create(&f.customer, create_request(f.product_id, 100_000.0, 12, vec![]))
        .await
        .unwrap()
        .application;

    for target in ApplicationStatus::ALL {
        let err = f
            .state
            .loan_application_service
            .update_status(&f.customer, app.id, status(target.as_str()))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "FORBIDDEN", "target {}", target);
    }

    let err = f
        .state
        .loan_application_service
        .approve(&f.customer, app.id, ApproveRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "FORBIDDEN");

    // Even for an application that does not exist
    let err = f
        .state
        .loan_application_service
        .reject(&f.customer, Uuid::new_v4(), RejectRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "FORBIDDEN");
}

#[tokio::test]
async fn test_full_lifecycle_to_closed_releases_collateral() {
    let f = fixture().await;
    let pledged = holdings(&f.state, &f.customer, &[800_000.0]).await;
    let service = &f.state.loan_application_service;

    let app = service
        .create(
            &f.customer,
            create_request(f.product_id, 400_000.0, 12, vec![pledged[0].id]),
        )
        .await
        .unwrap()
        .application;

    let submitted = service
        .update_status(&f.officer, app.id, status("SUBMITTED"))
        .await
        .unwrap();
    assert_eq!(submitted.status, ApplicationStatus::Submitted);
    assert_eq!(submitted.reviewed_by_id, Some(f.officer.user_id));

    service
        .update_status(&f.officer, app.id, status("under_review"))
        .await
        .unwrap();

    let approved = service
        .approve(
            &f.officer,
            app.id,
            ApproveRequest {
                approved_amount: Some(350_000.0),
                review_notes: Some("Reduced against volatility".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(approved.status, ApplicationStatus::Approved);
    assert_eq!(approved.approved_amount, Some(350_000.0));
    assert_eq!(approved.approved_by_id, Some(f.officer.user_id));
    assert!(approved.approved_at.is_some());
    // EMI stays on the requested amount
    assert_eq!(approved.calculated_emi, app.calculated_emi);

    let disbursed = service
        .update_status(&f.officer, app.id, status("DISBURSED"))
        .await
        .unwrap();
    assert!(disbursed.disbursed_at.is_some());

    let valuation = f
        .state
        .collateral_service
        .valuation(
            &f.customer,
            ValuationQuery {
                application_id: Some(app.id),
                customer_id: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(valuation.total_value, 800_000.0);
    assert_eq!(valuation.loan_amount, Some(350_000.0));
    assert_eq!(valuation.ltv_ratio, Some(43.75));

    match f.state.dashboard_service.stats(&f.customer).await.unwrap() {
        DashboardStats::Customer(stats) => {
            assert_eq!(stats.total_applications, 1);
            assert_eq!(stats.active_loans, 1);
            assert_eq!(stats.total_outstanding, 350_000.0);
            assert_eq!(stats.pledged_collateral_value, 800_000.0);
        }
        other => panic!("expected customer dashboard, got {:?}", other),
    }

    let closed = service
        .update_status(&f.officer, app.id, status("CLOSED"))
        .await
        .unwrap();
    assert!(closed.closed_at.is_some());

    let after = f
        .state
        .collateral_service
        .list(&f.customer, CollateralFilter::default())
        .await
        .unwrap();
    assert_eq!(after[0].status, CollateralStatus::Available);
    assert_eq!(after[0].application_id, None);
    assert!(after[0].released_at.is_some());

    let err = service
        .update_status(&f.officer, app.id, status("DRAFT"))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_STATUS_TRANSITION");
}

#[tokio::test]
async fn test_invalid_edges_are_rejected() {
    let f = fixture().await;
    let service = &f.state.loan_application_service;
    let app = service
        .create(&f.customer, create_request(f.product_id, 100_000.0, 12, vec![]))
        .await
        .unwrap()
        .application;

    // DRAFT cannot jump straight to APPROVED or DISBURSED
    let err = service
        .approve(&f.officer, app.id, ApproveRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_STATUS_TRANSITION");

    let err = service
        .update_status(&f.officer, app.id, status("DISBURSED"))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_STATUS_TRANSITION");

    let err = service
        .update_status(&f.officer, app.id, status("PENDING"))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");

    let err = service
        .update_status(&f.officer, Uuid::new_v4(), status("SUBMITTED"))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "NOT_FOUND");
}

#[tokio::test]
async fn test_reject_records_reason_and_releases_collateral() {
    let f = fixture().await;
    let pledged = holdings(&f.state, &f.customer, &[200_000.0]).await;
    let service = &f.state.loan_application_service;
    let app = service
        .create(
            &f.customer,
            create_request(f.product_id, 100_000.0, 12, vec![pledged[0].id]),
        )
        .await
        .unwrap()
        .application;

    let rejected = service
        .reject(
            &f.officer,
            app.id,
            RejectRequest {
                review_notes: Some("Incomplete KYC".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(rejected.status, ApplicationStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("Incomplete KYC"));
    assert!(rejected.rejected_at.is_some());

    let holdings = f
        .state
        .collateral_service
        .list(&f.customer, CollateralFilter::default())
        .await
        .unwrap();
    assert_eq!(holdings[0].status, CollateralStatus::Available);

    // Terminal
    let err = service
        .update_status(&f.officer, app.id, status("UNDER_REVIEW"))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_STATUS_TRANSITION");
}

#[tokio::test]
async fn test_stale_status_write_is_not_applied() {
    use lms_server::db::MemoryStore;
    use lms_server::loan_application::LoanApplicationRepository;
    use std::sync::Arc;

    let store = Arc::new(MemoryStore::new());
    let state = AppState::in_memory(store.clone(), common::settings());
    let customer = customer(&state, "rahul@example.com", "ABCDE1234F").await;
    let product_id = product(&state).await.id;

    let app = state
        .loan_application_service
        .create(&customer, create_request(product_id, 100_000.0, 12, vec![]))
        .await
        .unwrap()
        .application;

    let mut stale = app.clone();
    stale.status = ApplicationStatus::Rejected;
    stale.updated_at = Utc::now();

    // Expected status no longer matches what is stored
    let written = LoanApplicationRepository::update_status(
        store.as_ref(),
        &stale,
        ApplicationStatus::Submitted,
        true,
    )
    .await
    .unwrap();
    assert!(written.is_none());

    let stored = LoanApplicationRepository::find_by_id(store.as_ref(), app.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ApplicationStatus::Draft);
}

#[tokio::test]
async fn test_pledge_rechecks_status_at_write_time() {
    use lms_server::collateral::CollateralRepository;
    use lms_server::db::MemoryStore;
    use std::sync::Arc;

    let store = Arc::new(MemoryStore::new());
    let state = AppState::in_memory(store.clone(), common::settings());
    let customer = customer(&state, "rahul@example.com", "ABCDE1234F").await;
    let officer = staff(&state, "officer@example.com", UserRole::LoanOfficer).await;
    let product_id = product(&state).await.id;

    let app = state
        .loan_application_service
        .create(&customer, create_request(product_id, 100_000.0, 12, vec![]))
        .await
        .unwrap()
        .application;
    let holding = holdings(&state, &customer, &[250_000.0]).await;

    // The pledge was checked against DRAFT, then the application was rejected
    state
        .loan_application_service
        .reject(&officer, app.id, RejectRequest { review_notes: None })
        .await
        .unwrap();

    let err = CollateralRepository::pledge(
        store.as_ref(),
        app.id,
        app.customer_id,
        &[holding[0].id],
        Utc::now(),
    )
    .await
    .unwrap_err();
    assert_eq!(err.error_code(), "CONFLICT");

    let err = CollateralRepository::pledge(
        store.as_ref(),
        Uuid::new_v4(),
        app.customer_id,
        &[holding[0].id],
        Utc::now(),
    )
    .await
    .unwrap_err();
    assert_eq!(err.error_code(), "NOT_FOUND");

    let after = state
        .collateral_service
        .list(&customer, CollateralFilter::default())
        .await
        .unwrap();
    assert_eq!(after[0].status, CollateralStatus::Available);
    assert!(after[0].application_id.is_none());
}

#[tokio::test]
async fn test_customer_sees_only_own_applications() {
    let f = fixture().await;
    let other = customer(&f.state, "priya@example.com", "PQRST6789K").await;
    let service = &f.state.loan_application_service;

    let mine = service
        .create(&f.customer, create_request(f.product_id, 100_000.0, 12, vec![]))
        .await
        .unwrap()
        .application;
    service
        .create(&other, create_request(f.product_id, 200_000.0, 12, vec![]))
        .await
        .unwrap();

    let page = service
        .list(&f.customer, ListApplicationsQuery::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.data[0].id, mine.id);
    assert_eq!(page.data[0].customer_name, "Rahul Sharma");
    assert_eq!(page.data[0].product_name, "Loan Against Mutual Funds");

    let all = service
        .list(&f.officer, ListApplicationsQuery::default())
        .await
        .unwrap();
    assert_eq!(all.total, 2);

    let err = service.get(&other, mine.id).await.unwrap_err();
    assert_eq!(err.error_code(), "FORBIDDEN");

    let detail = service.get(&f.officer, mine.id).await.unwrap();
    assert_eq!(detail.customer.pan_number, "AB******4F");
    assert_eq!(detail.customer.aadhaar_number, "XXXX-XXXX-1234");
}

#[tokio::test]
async fn test_list_filters_by_status_and_paginates() {
    let f = fixture().await;
    let service = &f.state.loan_application_service;

    for _ in 0..3 {
        service
            .create(&f.customer, create_request(f.product_id, 100_000.0, 12, vec![]))
            .await
            .unwrap();
    }
    let first = service
        .list(
            &f.officer,
            ListApplicationsQuery {
                page: Some(1),
                limit: Some(2),
                status: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(first.data.len(), 2);
    assert_eq!(first.total_pages, 2);
    assert!(first.has_next);

    service
        .update_status(&f.officer, first.data[0].id, status("SUBMITTED"))
        .await
        .unwrap();

    let submitted = service
        .list(
            &f.officer,
            ListApplicationsQuery {
                status: Some("SUBMITTED".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(submitted.total, 1);

    let err = service
        .list(
            &f.officer,
            ListApplicationsQuery {
                status: Some("OPEN".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_pledge_after_creation_and_staff_dashboard() {
    let f = fixture().await;
    let service = &f.state.loan_application_service;
    let app = service
        .create(&f.customer, create_request(f.product_id, 100_000.0, 12, vec![]))
        .await
        .unwrap()
        .application;
    let holding = holdings(&f.state, &f.customer, &[250_000.0]).await;

    let pledged = f
        .state
        .collateral_service
        .pledge(
            &f.customer,
            PledgeRequest {
                application_id: app.id,
                collateral_ids: vec![holding[0].id, holding[0].id],
            },
        )
        .await
        .unwrap();
    assert_eq!(pledged.len(), 1);

    // Already pledged
    let err = f
        .state
        .collateral_service
        .pledge(
            &f.officer,
            PledgeRequest {
                application_id: app.id,
                collateral_ids: vec![holding[0].id],
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "CONFLICT");

    match f.state.dashboard_service.stats(&f.officer).await.unwrap() {
        DashboardStats::Staff(stats) => {
            assert_eq!(stats.total_applications, 1);
            assert_eq!(stats.by_status["DRAFT"], 1);
            assert_eq!(stats.by_status["CLOSED"], 0);
            assert_eq!(stats.total_customers, 1);
            assert_eq!(stats.total_collateral, 250_000.0);
            assert_eq!(stats.active_loans, 0);
        }
        other => panic!("expected staff dashboard, got {:?}", other),
    }
}
