//! HTTP surface: routing, envelopes, auth extraction and middleware

mod common;

use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use lms_server::build_app;
use lms_server::middleware::{RateLimiter, REQUEST_ID_HEADER};
use lms_server::models::{LoginRequest, UserRole};
use lms_server::state::AppState;

use common::{memory_state, product, staff, test_config, PASSWORD};

fn app(state: AppState) -> Router {
    build_app(
        state,
        &test_config(),
        RateLimiter::new(1_000, Duration::from_secs(60)),
    )
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn with_token(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn register_body(email: &str, pan: &str) -> Value {
    json!({
        "email": email,
        "password": PASSWORD,
        "confirmPassword": PASSWORD,
        "firstName": "Rahul",
        "lastName": "Sharma",
        "phoneNumber": "9876543210",
        "dateOfBirth": "1990-05-15",
        "panNumber": pan,
        "aadhaarNumber": "234567891234",
        "address": {
            "line1": "12 MG Road",
            "city": "Bengaluru",
            "state": "Karnataka",
            "pincode": "560001"
        }
    })
}

async fn access_token(state: &AppState, email: &str) -> String {
    state
        .auth_service
        .login(LoginRequest {
            email: email.to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap()
        .tokens
        .access_token
}

#[tokio::test]
async fn test_health_reports_in_memory_store() {
    let response = app(memory_state())
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    assert_eq!(
        response.headers()["x-content-type-options"],
        "nosniff"
    );
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "in-memory");
}

#[tokio::test]
async fn test_register_then_profile() {
    let app = app(memory_state());

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/register",
            register_body("rahul@example.com", "ABCDE1234F"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["role"], "CUSTOMER");
    let token = body["data"]["tokens"]["accessToken"].as_str().unwrap().to_string();

    let response = app
        .oneshot(with_token("GET", "/api/auth/profile", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["customer"]["kycStatus"], "PENDING");
    assert_eq!(body["data"]["customer"]["aadhaarNumber"], "XXXX-XXXX-1234");
    assert!(body["data"]["customer"].get("aadhaarHash").is_none());
}

#[tokio::test]
async fn test_invalid_registration_is_a_validation_error() {
    let mut body = register_body("rahul@example.com", "NOTAPAN");
    body["confirmPassword"] = json!("Different@123");

    let response = app(memory_state())
        .oneshot(post_json("/api/auth/register", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_protected_route_without_token() {
    let response = app(memory_state())
        .oneshot(
            Request::get("/api/loan-applications")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "MISSING_TOKEN");
}

#[tokio::test]
async fn test_products_are_public_but_admin_writes() {
    let state = memory_state();
    product(&state).await;
    staff(&state, "officer@example.com", UserRole::LoanOfficer).await;
    let officer_token = access_token(&state, "officer@example.com").await;
    let app = app(state);

    let response = app
        .clone()
        .oneshot(Request::get("/api/loan-products").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"][0]["productCode"], "LAMF01");

    let response = app
        .oneshot(with_token(
            "POST",
            "/api/loan-products",
            &officer_token,
            Some(json!({
                "productCode": "LAMF02",
                "productName": "Debt Fund Loan",
                "minAmount": 50000.0,
                "maxAmount": 1000000.0,
                "minTenureMonths": 6,
                "maxTenureMonths": 24,
                "interestRate": 10.5,
                "ltvRatio": 80.0
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_approve_without_body() {
    let state = memory_state();
    let product_id = product(&state).await.id;
    let customer = common::customer(&state, "rahul@example.com", "ABCDE1234F").await;
    let officer = staff(&state, "officer@example.com", UserRole::LoanOfficer).await;
    let officer_token = access_token(&state, "officer@example.com").await;

    let request = serde_json::from_value(json!({
        "loanProductId": product_id,
        "requestedAmount": 200000.0,
        "tenure": 12,
        "purposeOfLoan": "Home renovation"
    }))
    .unwrap();
    let application = state
        .loan_application_service
        .create(&customer, request)
        .await
        .unwrap()
        .application;
    state
        .loan_application_service
        .update_status(
            &officer,
            application.id,
            serde_json::from_value(json!({ "status": "SUBMITTED" })).unwrap(),
        )
        .await
        .unwrap();

    let response = app(state)
        .oneshot(with_token(
            "POST",
            &format!("/api/loan-applications/{}/approve", application.id),
            &officer_token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "APPROVED");
    assert!(body["data"]["approvedAmount"].is_null());
    assert!(body["data"]["approvedById"].is_string());
}

#[tokio::test]
async fn test_customer_status_change_is_forbidden_over_http() {
    let state = memory_state();
    common::customer(&state, "rahul@example.com", "ABCDE1234F").await;
    let token = access_token(&state, "rahul@example.com").await;

    let response = app(state)
        .oneshot(with_token(
            "PATCH",
            &format!("/api/loan-applications/{}/status", uuid::Uuid::new_v4()),
            &token,
            Some(json!({ "status": "APPROVED" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_rate_limit_returns_429_with_retry_after() {
    let app = build_app(
        memory_state(),
        &test_config(),
        RateLimiter::new(2, Duration::from_secs(60)),
    );

    let request = || {
        Request::get("/api/loan-products")
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::empty())
            .unwrap()
    };

    for _ in 0..2 {
        let response = app.clone().oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("ratelimit-remaining"));
    }

    let response = app.clone().oneshot(request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "TOO_MANY_REQUESTS");

    // Health checks sit outside the limited surface
    let response = app
        .oneshot(
            Request::get("/health")
                .header("x-forwarded-for", "203.0.113.7")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
