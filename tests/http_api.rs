use actix_web::http::StatusCode;
use actix_web::web::Data;
use actix_web::{App, test};
use lms::auth::jwt::generate_access_token;
use lms::config::Config;
use lms::engine::LeaveEngine;
use lms::model::leave_request::{LeaveRequest, LeaveStatus};
use lms::notify::TracingNotifier;
use lms::policy::AccessPolicy;
use lms::store::{LedgerSettings, MemoryStore};
use serde_json::{Value, json};
use std::sync::Arc;

const SECRET: &str = "test-secret";

// role ids as decoded by the extractor
const ADMIN: u8 = 1;
const MANAGER: u8 = 2;
const EMPLOYEE: u8 = 3;

fn test_config() -> Config {
    Config {
        database_url: None,
        jwt_secret: SECRET.into(),
        server_addr: "127.0.0.1:0".into(),
        initial_allotment_days: 20,
        annual_cap_days: None,
        rate_protected_per_min: 10_000,
        api_prefix: "/api".into(),
    }
}

async fn seeded_engine(config: &Config) -> Data<LeaveEngine> {
    let engine = Data::new(LeaveEngine::new(
        Arc::new(MemoryStore::new(LedgerSettings {
            initial_allotment: config.initial_allotment_days,
            annual_cap: config.annual_cap_days,
        })),
        AccessPolicy::open(),
        Arc::new(TracingNotifier),
    ));
    engine.catalog().seed_defaults().await.unwrap();
    engine
}

/// Builds the test App the way `main` wires the real one.
macro_rules! test_app {
    ($config:expr, $engine:expr) => {{
        let route_config = $config.clone();
        test::init_service(
            App::new()
                .app_data($engine.clone())
                .app_data(Data::new($config.clone()))
                .configure(move |cfg| lms::routes::configure(cfg, route_config.clone())),
        )
        .await
    }};
}

fn bearer(user_id: u64, role: u8) -> String {
    format!(
        "Bearer {}",
        generate_access_token(user_id, format!("user-{user_id}"), role, SECRET, 600)
    )
}

fn get(uri: &str, token: &str) -> actix_web::test::TestRequest {
    test::TestRequest::get()
        .uri(uri)
        .peer_addr("127.0.0.1:12345".parse().unwrap())
        .insert_header(("Authorization", token.to_owned()))
}

fn put(uri: &str, token: &str) -> actix_web::test::TestRequest {
    test::TestRequest::put()
        .uri(uri)
        .peer_addr("127.0.0.1:12345".parse().unwrap())
        .insert_header(("Authorization", token.to_owned()))
}

fn post_json(uri: &str, token: &str, body: Value) -> actix_web::test::TestRequest {
    test::TestRequest::post()
        .uri(uri)
        .peer_addr("127.0.0.1:12345".parse().unwrap())
        .insert_header(("Authorization", token.to_owned()))
        .set_json(body)
}

fn submit_body(leave_type_id: u64) -> Value {
    json!({
        "leave_type_id": leave_type_id,
        "start_date": "2026-03-02",
        "end_date": "2026-03-04",
        "reason": "family trip"
    })
}

#[actix_web::test]
async fn missing_token_is_unauthorized() {
    let config = test_config();
    let engine = seeded_engine(&config).await;
    let app = test_app!(config, engine);

    let req = test::TestRequest::get()
        .uri("/api/leave/mine")
        .peer_addr("127.0.0.1:12345".parse().unwrap())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn submit_approve_cancel_flow_over_http() {
    let config = test_config();
    let engine = seeded_engine(&config).await;
    let app = test_app!(config, engine);

    let owner = bearer(10, EMPLOYEE);
    let boss = bearer(2, MANAGER);

    // find the seeded annual type id
    let types: Vec<Value> =
        test::call_and_read_body_json(&app, get("/api/leave-type", &owner).to_request()).await;
    let annual_id = types
        .iter()
        .find(|t| t["name"] == "Annual Leave")
        .and_then(|t| t["id"].as_u64())
        .unwrap();

    // submit
    let created: LeaveRequest = test::call_and_read_body_json(
        &app,
        post_json("/api/leave", &owner, submit_body(annual_id)).to_request(),
    )
    .await;
    assert_eq!(created.status, LeaveStatus::Pending);
    assert_eq!(created.duration, 3);

    // approve as manager
    let approved: LeaveRequest = test::call_and_read_body_json(
        &app,
        put(&format!("/api/leave/{}/approve", created.id), &boss).to_request(),
    )
    .await;
    assert_eq!(approved.status, LeaveStatus::Approved);

    // balance dropped by the three-day duration
    let balance: Value = test::call_and_read_body_json(
        &app,
        get(&format!("/api/balance/{annual_id}"), &owner).to_request(),
    )
    .await;
    assert_eq!(balance["remaining"], 17);

    // cancel as the owner, balance restored
    let cancelled: LeaveRequest = test::call_and_read_body_json(
        &app,
        put(&format!("/api/leave/{}/cancel", created.id), &owner).to_request(),
    )
    .await;
    assert_eq!(cancelled.status, LeaveStatus::Cancelled);

    let balance: Value = test::call_and_read_body_json(
        &app,
        get(&format!("/api/balance/{annual_id}"), &owner).to_request(),
    )
    .await;
    assert_eq!(balance["remaining"], 20);
}

#[actix_web::test]
async fn domain_errors_map_to_transport_codes() {
    let mut config = test_config();
    config.initial_allotment_days = 2;
    let engine = seeded_engine(&config).await;
    let app = test_app!(config, engine);

    let owner = bearer(10, EMPLOYEE);
    let boss = bearer(2, MANAGER);

    let types = engine.catalog().list().await.unwrap();
    let annual_id = types.iter().find(|t| t.requires_approval).unwrap().id;

    // reversed range -> 400
    let resp = test::call_service(
        &app,
        post_json(
            "/api/leave",
            &owner,
            json!({
                "leave_type_id": annual_id,
                "start_date": "2026-03-04",
                "end_date": "2026-03-02",
                "reason": "oops"
            }),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let created: LeaveRequest = test::call_and_read_body_json(
        &app,
        post_json("/api/leave", &owner, submit_body(annual_id)).to_request(),
    )
    .await;

    // employee deciding -> 403
    let resp = test::call_service(
        &app,
        put(
            &format!("/api/leave/{}/approve", created.id),
            &bearer(11, EMPLOYEE),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // unknown id -> 404
    let resp = test::call_service(&app, put("/api/leave/99999/approve", &boss).to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // 3-day request against a 2-day allotment -> 409 with the
    // machine-readable kind, status stays pending
    let resp = test::call_service(
        &app,
        put(&format!("/api/leave/{}/approve", created.id), &boss).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "insufficient_balance");

    let unchanged: LeaveRequest = test::call_and_read_body_json(
        &app,
        get(&format!("/api/leave/{}", created.id), &owner).to_request(),
    )
    .await;
    assert_eq!(unchanged.status, LeaveStatus::Pending);
}

#[actix_web::test]
async fn leave_type_administration_is_admin_only() {
    let config = test_config();
    let engine = seeded_engine(&config).await;
    let app = test_app!(config, engine);

    let body = json!({
        "name": "Medical Leave",
        "category": "medical",
        "requires_approval": true,
        "deducts_balance": true
    });

    // manager is not enough
    let resp = test::call_service(
        &app,
        post_json("/api/leave-type", &bearer(2, MANAGER), body.clone()).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // admin creates
    let resp = test::call_service(
        &app,
        post_json("/api/leave-type", &bearer(1, ADMIN), body).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // an unrecognized category never deserializes
    let resp = test::call_service(
        &app,
        post_json(
            "/api/leave-type",
            &bearer(1, ADMIN),
            json!({
                "name": "Sabbatical",
                "category": "sabbatical",
                "requires_approval": true,
                "deducts_balance": false
            }),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
