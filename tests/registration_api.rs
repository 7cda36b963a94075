use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use project_portal::api::{create_router, AppState};
use project_portal::infrastructure::user::{Argon2Hasher, InMemoryUserRepository, UserService};

fn app() -> Router {
    let repository = Arc::new(InMemoryUserRepository::new());
    let hasher = Arc::new(Argon2Hasher::with_params(8, 1, 1).unwrap());

    create_router(AppState::new(Arc::new(UserService::new(repository, hasher))))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, json)
}

fn registration(email: &str, password: &str) -> Value {
    json!({
        "first_name": "Foo",
        "last_name": "Bar",
        "email": email,
        "password": password,
    })
}

#[tokio::test]
async fn test_register_form_is_served() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/register", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["action"], "/register");
    assert_eq!(body["fields"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_register_creates_user() {
    let app = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/register",
        Some(registration("Foo@Bar.com", "foobar!23")),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "foo@bar.com");
    assert_eq!(body["first_name"], "Foo");
    assert!(body.get("password_hash").is_none());
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn test_register_reports_field_errors() {
    let app = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/register",
        Some(json!({
            "first_name": "F",
            "last_name": "Bar1",
            "email": "not-an-email",
            "password": "foobar1",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["type"], "validation_error");

    let fields = body["error"]["fields"].as_object().unwrap();
    assert!(fields.contains_key("first_name"));
    assert!(fields.contains_key("last_name"));
    assert!(fields.contains_key("email"));
    assert!(fields.contains_key("password"));
}

#[tokio::test]
async fn test_register_missing_password_stores_nothing() {
    let app = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/register",
        Some(json!({ "first_name": "Foo", "last_name": "Bar", "email": "foo@bar.com" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["fields"]["password"][0], "can't be blank");

    let (status, _) = send(
        &app,
        Method::POST,
        "/register",
        Some(registration("foo@bar.com", "foobar!23")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_register_null_fields_are_reported_as_blank() {
    let app = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/register",
        Some(json!({
            "first_name": null,
            "last_name": "Bar",
            "email": 7,
            "password": "foobar!23",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["type"], "validation_error");
    assert_eq!(body["error"]["fields"]["first_name"][0], "can't be blank");
    assert_eq!(body["error"]["fields"]["email"][0], "is not a valid email address");

    let fields = body["error"]["fields"].as_object().unwrap();
    assert!(!fields.contains_key("last_name"));
    assert!(!fields.contains_key("password"));
}

#[tokio::test]
async fn test_register_duplicate_email_is_taken() {
    let app = app();

    let (status, _) = send(
        &app,
        Method::POST,
        "/register",
        Some(registration("foo@bar.com", "foobar!23")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        Method::POST,
        "/register",
        Some(registration("FOO@bar.com", "foobar!23")),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["fields"]["email"][0], "has already been taken");
}

#[tokio::test]
async fn test_register_rejects_malformed_json() {
    let app = app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], "json_parse_error");
}

#[tokio::test]
async fn test_login_with_valid_credentials() {
    let app = app();
    send(
        &app,
        Method::POST,
        "/register",
        Some(registration("foo@bar.com", "foobar!23")),
    )
    .await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/login",
        Some(json!({ "email": "foo@bar.com", "password": "foobar!23" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "foo@bar.com");
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = app();
    send(
        &app,
        Method::POST,
        "/register",
        Some(registration("foo@bar.com", "foobar!23")),
    )
    .await;

    let attempts = [
        json!({ "email": "foo@bar.com", "password": "wrong!123" }),
        json!({ "email": "nobody@bar.com", "password": "foobar!23" }),
        json!({ "password": "foobar!23" }),
        json!({ "email": "foo@bar.com" }),
    ];

    for attempt in attempts {
        let (status, body) = send(&app, Method::POST, "/login", Some(attempt)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["message"], "Invalid email or password");
    }
}

#[tokio::test]
async fn test_health_probes() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);

    let (status, body) = send(&app, Method::GET, "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_store"]["reachable"], true);
    assert_eq!(body["user_store"]["users"], 0);

    let (status, _) = send(&app, Method::GET, "/live", None).await;
    assert_eq!(status, StatusCode::OK);
}
