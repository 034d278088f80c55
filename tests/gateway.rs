#![cfg(feature = "server")]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tax_records::api::{self, AppState, AuthSettings};
use tax_records::Store;
use tower::ServiceExt;

fn app_with(auth: AuthSettings) -> (Router, Store) {
    let store = Store::open_in_memory().unwrap();
    let app = api::router(AppState::new(store.clone(), auth));
    (app, store)
}

fn open_app() -> Router {
    app_with(AuthSettings::disabled()).0
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send_with_token(app, method, uri, body, None).await
}

async fn send_with_token(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health() {
    let app = open_app();
    let (status, body) = send(&app, Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "data": "OK"}));
}

#[tokio::test]
async fn test_year_scenario_summary() {
    let app = open_app();

    let (status, body) = send(&app, Method::POST, "/api/years", Some(json!({"year": 2024}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["year"], 2024);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/income",
        Some(json!({
            "year": 2024,
            "date": "2024-05-01",
            "description": "Salary May",
            "amount": 1000,
            "category": "Salary",
            "taxDeductions": 100
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/expenses",
        Some(json!({
            "year": 2024,
            "date": "2024-05-02",
            "description": "Rent",
            "amount": "500",
            "category": "Housing"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let expense_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, Method::GET, "/api/summary?year=2024", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalIncome"], "1000.00");
    assert_eq!(body["data"]["totalExpenses"], "500.00");
    assert_eq!(body["data"]["totalDeductions"], "100.00");
    assert_eq!(body["data"]["netAmount"], "500.00");
    assert_eq!(body["data"]["label"], "2023/2024");

    let uri = format!("/api/expenses?id={expense_id}");
    let (status, body) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], expense_id.as_str());

    let (_, body) = send(&app, Method::GET, "/api/summary?year=2024", None).await;
    assert_eq!(body["data"]["totalExpenses"], "0.00");
    assert_eq!(body["data"]["netAmount"], "1000.00");
}

#[tokio::test]
async fn test_list_requires_year() {
    let app = open_app();

    for uri in ["/api/income", "/api/expenses", "/api/summary", "/api/income?year="] {
        let (status, body) = send(&app, Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "year parameter is required");
        assert!(body.get("data").is_none());
    }

    let (status, body) = send(&app, Method::GET, "/api/expenses?year=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("abc"));
}

#[tokio::test]
async fn test_out_of_range_year_is_rejected() {
    let app = open_app();

    for uri in [
        "/api/summary?year=-2147483648",
        "/api/summary?year=2147483647",
        "/api/income?year=10000",
        "/api/expenses?year=1899",
    ] {
        let (status, body) = send(&app, Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["success"], false);
    }
}

#[tokio::test]
async fn test_oversized_amount_keeps_summary_available() {
    let app = open_app();

    for _ in 0..2 {
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/income",
            Some(json!({
                "year": 2024,
                "date": "2024-01-10",
                "description": "Windfall",
                "amount": "79228162514264337593543950335",
                "category": "Salary"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("amount"));
    }

    let (status, body) = send(&app, Method::GET, "/api/summary?year=2024", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalIncome"], "0.00");
    assert_eq!(body["data"]["incomeCount"], 0);
}

#[tokio::test]
async fn test_list_is_scoped_to_year() {
    let app = open_app();
    for (year, date) in [(2024, "2023-06-01"), (2025, "2024-06-01")] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/expenses",
            Some(json!({
                "year": year,
                "date": date,
                "description": "Phone",
                "amount": 30,
                "category": "Utilities"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, body) = send(&app, Method::GET, "/api/expenses?year=2024", None).await;
    let records = body["data"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["year"], 2024);
}

#[tokio::test]
async fn test_duplicate_year_conflict() {
    let app = open_app();
    send(&app, Method::POST, "/api/years", Some(json!({"year": 2024}))).await;

    let (status, body) = send(&app, Method::POST, "/api/years", Some(json!({"year": 2024}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "tax year 2024 already exists");

    let (_, body) = send(&app, Method::GET, "/api/years", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_create_is_client_error() {
    let app = open_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/expenses",
        Some(json!({"year": 2024, "amount": 10})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("description"));
    assert!(message.contains("date"));

    let (status, body) = send(&app, Method::POST, "/api/years", Some(json!({"year": "twenty"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_delete_edge_cases() {
    let app = open_app();

    let (status, body) = send(&app, Method::DELETE, "/api/income", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "id parameter is required");

    let unknown = uuid::Uuid::new_v4();
    let uri = format!("/api/income?id={unknown}");
    let (status, body) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "data": null}));

    let (status, body) = send(&app, Method::DELETE, "/api/expenses?id=not-a-uuid", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], Value::Null);
}

#[tokio::test]
async fn test_year_with_records_cannot_be_deleted() {
    let app = open_app();
    let (_, body) = send(&app, Method::POST, "/api/years", Some(json!({"year": 2024}))).await;
    let year_id = body["data"]["id"].as_str().unwrap().to_string();

    send(
        &app,
        Method::POST,
        "/api/income",
        Some(json!({
            "year": 2024,
            "date": "2023-07-01",
            "description": "Bonus",
            "amount": 250,
            "category": "Salary"
        })),
    )
    .await;

    let uri = format!("/api/years?id={year_id}");
    let (status, body) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (_, body) = send(&app, Method::GET, "/api/income?year=2024", None).await;
    let income = body["data"].as_array().unwrap();
    assert_eq!(income.len(), 1);
    assert_eq!(income[0]["taxDeductions"], "0");

    let income_id = income[0]["id"].as_str().unwrap().to_string();
    send(&app, Method::DELETE, &format!("/api/income?id={income_id}"), None).await;

    let (status, body) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["year"], 2024);
}

#[tokio::test]
async fn test_session_required_when_auth_enabled() {
    let auth = AuthSettings::new(true, "test-secret", chrono::Duration::hours(1));
    let (app, store) = app_with(auth);
    store
        .with_conn(|conn| tax_records::users::create_user(conn, "alice", "s3cret"))
        .unwrap();

    // Health stays open
    let (status, _) = send(&app, Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, "/api/years", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        Some(json!({"username": "alice", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        Some(json!({"username": "alice", "password": "s3cret"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) =
        send_with_token(&app, Method::GET, "/api/years", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));

    let (status, body) = send_with_token(
        &app,
        Method::POST,
        "/api/years",
        Some(json!({"year": 2024})),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["year"], 2024);

    let (status, _) =
        send_with_token(&app, Method::GET, "/api/years", None, Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
