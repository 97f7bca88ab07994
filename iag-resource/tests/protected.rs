//! Bearer/audience/scope enforcement over the in-process RS, using
//! local token verification so no AS needs to run.

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;

use iag_resource::{configure, AppState, Config};

const SECRET: &str = "rs-test-secret";
const ISSUER: &str = "http://localhost:9092";
const RESOURCE: &str = "http://localhost:9091";

fn test_config() -> Config {
    Config {
        port: 0,
        resource: RESOURCE.into(),
        as_base: ISSUER.into(),
        as_metadata_url: None,
        introspect_url: format!("{ISSUER}/introspect"),
        expected_aud: RESOURCE.into(),
        jwt_secret: Some(SECRET.into()),
        scopes_supported: vec![
            "echo:read".into(),
            "tickets:read".into(),
            "payments:charge".into(),
        ],
    }
}

fn mint(scope: &str, aud: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    encode(
        &Header::default(),
        &json!({
            "iss": ISSUER,
            "sub": "user-123",
            "scope": scope,
            "aud": aud,
            "iat": now,
            "exp": now + 900,
        }),
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

macro_rules! rs_app {
    () => {{
        let state = web::Data::new(AppState::new(test_config()));
        test::init_service(App::new().app_data(state).configure(configure)).await
    }};
}

#[actix_web::test]
async fn unauthenticated_probe_gets_the_challenge() {
    let app = rs_app!();
    let response =
        test::call_service(&app, test::TestRequest::get().uri("/mcp/echo?msg=hi").to_request())
            .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let challenge = response
        .headers()
        .get("WWW-Authenticate")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(challenge.starts_with("Bearer "));
    assert!(challenge.contains(
        r#"resource_metadata="http://localhost:9091/.well-known/oauth-protected-resource""#
    ));
}

#[actix_web::test]
async fn metadata_document_names_the_as() {
    let app = rs_app!();
    let response = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/.well-known/oauth-protected-resource")
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(body["resource"], RESOURCE);
    assert_eq!(body["authorization_servers"][0], ISSUER);
    assert_eq!(body["introspection_endpoint"], format!("{ISSUER}/introspect"));
}

#[actix_web::test]
async fn echo_round_trips_with_a_valid_token() {
    let app = rs_app!();
    let token = mint("echo:read", RESOURCE);
    let response = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/mcp/echo?msg=hi")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["echo"], "hi");
    assert_eq!(body["user"], "user-123");
    assert_eq!(body["scope"], "echo:read");
}

#[actix_web::test]
async fn foreign_audience_is_refused() {
    let app = rs_app!();
    let token = mint("echo:read", "http://some-other-rs");
    let response = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/mcp/echo?msg=hi")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key("WWW-Authenticate"));
    let body: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(body["error"], "bad_audience");
}

#[actix_web::test]
async fn missing_scope_is_insufficient_scope() {
    let app = rs_app!();
    let token = mint("tickets:read", RESOURCE);
    let response = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/mcp/echo?msg=hi")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(body["error"], "insufficient_scope");
}

#[actix_web::test]
async fn garbage_token_is_invalid_token() {
    let app = rs_app!();
    let response = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/tickets")
            .insert_header(("Authorization", "Bearer not-a-jwt"))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(body["error"], "invalid_token");
}

#[actix_web::test]
async fn pay_requires_the_wallet_payment_method() {
    let app = rs_app!();
    let token = mint("payments:charge", RESOURCE);

    let response = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/orders/order-1001/pay")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .set_json(json!({ "amount_cents": 1200, "merchant_id": "mcp-tix" }))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/orders/order-1001/pay")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .set_json(json!({
                "amount_cents": 1200,
                "merchant_id": "mcp-tix",
                "payment_method": "pm-wallet-demo-0001",
            }))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(body["status"], "succeeded");
    assert_eq!(body["order_id"], "order-1001");
    assert_eq!(body["amount_cents"], 1200);
    assert_eq!(body["merchant_id"], "mcp-tix");
}

#[actix_web::test]
async fn tickets_lists_for_ticket_readers() {
    let app = rs_app!();
    let token = mint("tickets:read", RESOURCE);
    let response = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/tickets")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(body["ok"], true);
    assert!(body["tickets"].as_array().unwrap().len() >= 3);
}
