//! Gateway surface tests that need no upstream: health, status polling,
//! state rejection at the callback, scope gating on tool paths, session
//! reset.

use actix_web::http::StatusCode;
use actix_web::{test, web, App};

use iag_gateway::{configure, AppState, Config};

fn test_config() -> Config {
    Config {
        gw_base: "http://localhost:9100".into(),
        port: 0,
        upstream_rs: "http://localhost:9091".into(),
        rs_meta_fallback: None,
        adp_base: "http://localhost:9093".into(),
        state_secret: "test-state-secret".into(),
        wallet_pm_token: "pm-wallet-demo-0001".into(),
        client_id: "demo-client".into(),
        subject: "user-123".into(),
        agent_id: "agent-demo".into(),
        probe_path: "/mcp/echo".into(),
    }
}

macro_rules! gw_app {
    () => {{
        let state = web::Data::new(AppState::new(test_config()));
        test::init_service(App::new().app_data(state).configure(configure)).await
    }};
}

#[actix_web::test]
async fn healthz_answers() {
    let app = gw_app!();
    let response =
        test::call_service(&app, test::TestRequest::get().uri("/healthz").to_request()).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[actix_web::test]
async fn status_is_not_ready_without_sessions() {
    let app = gw_app!();
    let response = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/session/status?scope=echo%3Aread")
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(body["ready"], false);

    let response = test::call_service(
        &app,
        test::TestRequest::get().uri("/session/status").to_request(),
    )
    .await;
    let body: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(body["ready"], false);
}

#[actix_web::test]
async fn tool_calls_without_a_session_require_login() {
    let app = gw_app!();

    let response = test::call_service(
        &app,
        test::TestRequest::get().uri("/mcp/echo?msg=hi").to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(body["error"], "login_required");

    let response = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/mcp/pay")
            .set_json(serde_json::json!({
                "orderId": "order-1001",
                "amount_cents": 1200,
                "merchant_id": "mcp-tix",
            }))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(body["error"], "login_required");
}

#[actix_web::test]
async fn callback_rejects_forged_and_malformed_state() {
    let app = gw_app!();

    // malformed: not two base64url parts
    let response = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/oauth/callback?code=abc&state=garbage")
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(body["error"], "bad_state");
    assert_eq!(body["detail"], "malformed_state");

    // well-formed but signed with another key
    let foreign = iag_gateway::state_token::StateSigner::new("some-other-secret")
        .sign(&iag_gateway::state_token::StatePayload {
            sid: "deadbeef".into(),
            iat: 0,
            aud: "http://localhost:9091".into(),
            scope: "echo:read".into(),
            n: "n".into(),
            ctx_digest: String::new(),
        })
        .unwrap();
    let response = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/oauth/callback?code=abc&state={foreign}"))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(body["detail"], "bad_signature");
}

#[actix_web::test]
async fn callback_surfaces_as_errors_without_mutation() {
    let app = gw_app!();
    let response = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/oauth/callback?error=access_denied&error_description=nope")
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = test::read_body(response).await;
    let page = String::from_utf8_lossy(&body);
    assert!(page.contains("access_denied"));
}

#[actix_web::test]
async fn callback_with_missing_parameters_is_invalid_request() {
    let app = gw_app!();
    let response = test::call_service(
        &app,
        test::TestRequest::get().uri("/oauth/callback").to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(body["error"], "invalid_request");
}

#[actix_web::test]
async fn consent_page_requires_a_known_sid() {
    let app = gw_app!();
    let response = test::call_service(
        &app,
        test::TestRequest::get().uri("/consent?sid=unknown").to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn debug_reset_reports_cleared_count() {
    let app = gw_app!();
    let response = test::call_service(
        &app,
        test::TestRequest::post().uri("/debug/session/reset").to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(body["cleared"], 0);
}
