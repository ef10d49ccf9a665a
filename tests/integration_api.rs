//! API Integration Tests

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use bank_ledger::api::routes::{
    CreateAccountRequest, DepositRequest, SetPinRequest, UpdateProfileRequest, WithdrawRequest,
};
use serde::Serialize;
use serde_json::Value;
use tower::util::ServiceExt;
use uuid::Uuid;

mod common;

fn json_request(method: &str, uri: &str, body: &impl Serialize) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn create_request(user_id: Uuid) -> CreateAccountRequest {
    CreateAccountRequest {
        user_id,
        bank_id: None,
        name: "Ada Lovelace".to_string(),
        address: None,
        phone_number: None,
        pin: None,
        account_type: None,
        initial_deposit: None,
    }
}

#[tokio::test]
async fn test_account_lifecycle_e2e() {
    let fx = common::setup_memory_ledger();
    let app = fx.app();

    // 1. Open an account with a PIN and an opening deposit
    let request = CreateAccountRequest {
        bank_id: Some(fx.bank_id),
        pin: Some("1234".to_string()),
        initial_deposit: Some("500.00".to_string()),
        ..create_request(fx.user_id)
    };
    let (status, account) = send(&app, json_request("POST", "/api/v1/accounts", &request)).await;
    assert_eq!(status, StatusCode::CREATED, "Account creation failed: {account}");
    assert_eq!(account["balance"], "500.00");
    assert_eq!(account["account_type"], "SAVINGS");
    assert_eq!(account["bank_name"], "Test Bank");
    assert_eq!(account["has_pin"], true);
    let number = account["account_number"].as_str().unwrap().to_string();
    let account_id = account["id"].as_str().unwrap().to_string();

    // 2. Deposit
    let deposit = DepositRequest {
        account_number: number.clone(),
        amount: "25.50".to_string(),
        description: Some("Salary".to_string()),
    };
    let (status, record) = send(&app, json_request("POST", "/api/v1/deposit", &deposit)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["type"], "DEPOSIT");
    assert_eq!(record["balance_after"], "525.50");

    // 3. Withdraw with the right PIN
    let withdraw = WithdrawRequest {
        account_number: number.clone(),
        amount: "100".to_string(),
        pin: Some("1234".to_string()),
        description: None,
    };
    let (status, record) = send(&app, json_request("POST", "/api/v1/withdraw", &withdraw)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["type"], "WITHDRAW");
    assert_eq!(record["amount"], "100.00");
    assert_eq!(record["balance_after"], "425.50");

    // 4. Balance and history
    let (status, balance) = send(&app, get(&format!("/api/v1/balance/{number}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balance["balance"], "425.50");
    assert_eq!(balance["name"], "Ada Lovelace");

    let (status, history) = send(&app, get(&format!("/api/v1/transactions/{number}"))).await;
    assert_eq!(status, StatusCode::OK);
    let types: Vec<_> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["type"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(types, vec!["WITHDRAW", "DEPOSIT", "DEPOSIT"]);

    // 5. Update the profile
    let update = UpdateProfileRequest {
        phone_number: Some("555-0100".to_string()),
        ..Default::default()
    };
    let (status, updated) = send(
        &app,
        json_request("PATCH", &format!("/api/v1/accounts/{account_id}"), &update),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["phone_number"], "555-0100");
    assert_eq!(updated["name"], "Ada Lovelace");

    // 6. Total balance, then deactivate
    let (_, total) = send(&app, get("/api/v1/reports/total-balance")).await;
    assert_eq!(total["total_balance"], "425.50");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/accounts/{account_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let (_, total) = send(&app, get("/api/v1/reports/total-balance")).await;
    assert_eq!(total["total_balance"], "0.00");

    // 7. Inactive accounts reject money movement
    let (status, error) = send(&app, json_request("POST", "/api/v1/deposit", &deposit)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error_code"], "account_inactive");
}

#[tokio::test]
async fn test_error_status_codes() {
    let fx = common::setup_memory_ledger();
    let app = fx.app();

    let (_, account) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/accounts",
            &CreateAccountRequest {
                pin: Some("9999".to_string()),
                initial_deposit: Some("50".to_string()),
                ..create_request(fx.user_id)
            },
        ),
    )
    .await;
    let number = account["account_number"].as_str().unwrap().to_string();

    // Wrong PIN
    let (status, error) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/withdraw",
            &WithdrawRequest {
                account_number: number.clone(),
                amount: "10".to_string(),
                pin: Some("0000".to_string()),
                description: None,
            },
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error["error_code"], "invalid_pin");

    // Overdraw
    let (status, error) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/withdraw",
            &WithdrawRequest {
                account_number: number.clone(),
                amount: "50.01".to_string(),
                pin: None,
                description: None,
            },
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error_code"], "insufficient_balance");

    // Non-positive amount
    let (status, error) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/deposit",
            &DepositRequest {
                account_number: number.clone(),
                amount: "-5".to_string(),
                description: None,
            },
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error_code"], "invalid_amount");

    // Unknown account
    let unknown = if number == "0000000001" { "0000000002" } else { "0000000001" };
    let (status, error) = send(&app, get(&format!("/api/v1/balance/{unknown}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["error_code"], "account_not_found");

    // Malformed account number
    let (status, error) = send(&app, get("/api/v1/balance/12ab")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error_code"], "invalid_request");

    // Unknown owner
    let (status, error) = send(
        &app,
        json_request("POST", "/api/v1/accounts", &create_request(Uuid::new_v4())),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["error_code"], "user_not_found");

    // Malformed request user header
    let request = Request::builder()
        .method("GET")
        .uri("/api/v1/accounts")
        .header("X-Request-User-Id", "not-a-uuid")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_set_pin_and_listing() {
    let fx = common::setup_memory_ledger();
    let app = fx.app();

    let (_, account) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/accounts",
            &CreateAccountRequest {
                initial_deposit: Some("20".to_string()),
                ..create_request(fx.user_id)
            },
        ),
    )
    .await;
    let number = account["account_number"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/pin",
            &SetPinRequest {
                account_number: number.clone(),
                pin: "4321".to_string(),
            },
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/withdraw",
            &WithdrawRequest {
                account_number: number.clone(),
                amount: "5".to_string(),
                pin: Some("4321".to_string()),
                description: None,
            },
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, owned) = send(&app, get(&format!("/api/v1/accounts?user_id={}", fx.user_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(owned.as_array().unwrap().len(), 1);
    assert_eq!(owned[0]["has_pin"], true);

    let (_, others) = send(&app, get(&format!("/api/v1/accounts?user_id={}", Uuid::new_v4()))).await;
    assert!(others.as_array().unwrap().is_empty());

    let (_, all) = send(&app, get("/api/v1/transactions")).await;
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_health_check() {
    let fx = common::setup_memory_ledger();
    let response = fx.app().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"OK");
}
