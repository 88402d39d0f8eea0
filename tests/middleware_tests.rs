use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
    routing::get,
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use route_gate::{
    AppConfig, AppState, Claims, GateState, create_router, parse_cookie, with_gate,
};
use tower::ServiceExt;

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "middleware-test-secret";

fn test_config() -> AppConfig {
    AppConfig {
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    }
}

fn token_for(role: &str) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        subject_id: Some("u-7".to_string()),
        email: None,
        role: Some(role.to_string()),
        exp: now + 3600,
        iat: Some(now),
    };
    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

async fn send(app: Router, uri: &str, cookie: Option<String>) -> Response<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap()
}

fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
}

// --- Tests ---

#[tokio::test]
async fn test_anonymous_protected_request_is_redirected() {
    let app = create_router(AppState::new(test_config()));

    let response = send(app, "/users/profile", None).await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), Some("/users/sign-in"));
}

#[tokio::test]
async fn test_redirect_preserves_query_string() {
    let app = create_router(AppState::new(test_config()));

    let response = send(app, "/users/withdraw?amount=50&method=bank", None).await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), Some("/users/sign-in?amount=50&method=bank"));
}

#[tokio::test]
async fn test_authorized_request_is_forwarded() {
    let app = create_router(AppState::new(test_config()));
    let cookie = format!("theme=dark; auth_token={}", token_for("user"));

    let response = send(app, "/users/profile", Some(cookie)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(location(&response).is_none());
}

#[tokio::test]
async fn test_signed_in_visitor_on_landing_is_sent_home() {
    let app = create_router(AppState::new(test_config()));
    let cookie = format!("auth_token={}", token_for("agent"));

    let response = send(app, "/", Some(cookie)).await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), Some("/agents"));
}

#[tokio::test]
async fn test_health_bypasses_gate() {
    let app = create_router(AppState::new(test_config()));

    let response = send(app, "/api/health", Some("auth_token=garbage".to_string())).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let app = create_router(AppState::new(test_config()));

    let response = send(app, "/", None).await;

    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_custom_cookie_name() {
    let config = AppConfig {
        cookie_name: "session".to_string(),
        ..test_config()
    };
    let app = create_router(AppState::new(config));
    let token = token_for("admin");

    let ignored = send(app.clone(), "/admins", Some(format!("auth_token={token}"))).await;
    assert_eq!(location(&ignored), Some("/users/sign-in"));

    let honored = send(app, "/admins", Some(format!("session={token}"))).await;
    assert_eq!(honored.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_with_gate_wraps_existing_router() {
    let gate = GateState::from_config(&test_config());
    let app = with_gate(
        Router::new().route("/agents/dashboard", get(|| async { "dashboard" })),
        gate,
    );

    let as_user = send(
        app.clone(),
        "/agents/dashboard",
        Some(format!("auth_token={}", token_for("user"))),
    )
    .await;
    assert_eq!(location(&as_user), Some("/not-found"));

    let as_agent = send(
        app,
        "/agents/dashboard",
        Some(format!("auth_token={}", token_for("agent"))),
    )
    .await;
    assert_eq!(as_agent.status(), StatusCode::OK);
}

#[test]
fn test_parse_cookie() {
    let mut headers = axum::http::HeaderMap::new();
    headers.insert(header::COOKIE, "a=1; auth_token=abc.def.ghi; b=2".parse().unwrap());

    assert_eq!(parse_cookie(&headers, "auth_token").as_deref(), Some("abc.def.ghi"));
    assert_eq!(parse_cookie(&headers, "b").as_deref(), Some("2"));
    assert!(parse_cookie(&headers, "missing").is_none());
}
