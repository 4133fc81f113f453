use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Datelike, Duration, Utc, Weekday};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{body_partial_json, method, path, query_param};

use dentist_cell::router::dentist_routes;
use shared_utils::test_utils::{TestConfig, TestUser, JwtTestUtils, MockApiResponses};

fn create_test_app(config: &TestConfig) -> Router {
    dentist_routes(config.to_arc())
}

/// A Monday at least a week out, so it is never clipped as a past day.
fn upcoming_monday() -> String {
    let mut date = Utc::now().date_naive() + Duration::days(7);
    while date.weekday() != Weekday::Mon {
        date += Duration::days(1);
    }
    date.format("%Y-%m-%d").to_string()
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn mount_working_hours(server: &MockServer, dentist_id: &str, rows: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/dentist_working_hours"))
        .and(query_param("dentist_id", format!("eq.{}", dentist_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;
}

#[tokio::test]
async fn availability_marks_booked_slot_and_keeps_day_available() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_api_url(&mock_server.uri());
    let dentist_id = Uuid::new_v4().to_string();
    let monday = upcoming_monday();

    mount_working_hours(&mock_server, &dentist_id, MockApiResponses::default_week_rows(&dentist_id)).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "neq.cancelled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "dentist_id": dentist_id, "date": monday, "time": "09:00:00", "status": "confirmed" }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(&config);
    let (status, body) = get(
        app,
        &format!("/{}/availability?start_date={}&end_date={}", dentist_id, monday, monday),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let day = &body["days"][0];
    assert_eq!(day["status"], "available");
    assert_eq!(day["total_slots"], 16);
    assert_eq!(day["available_slots"], 15);
    assert_eq!(day["time_slots"][0]["time24"], "09:00");
    assert_eq!(day["time_slots"][0]["is_booked"], true);
    assert_eq!(day["time_slots"][1]["time24"], "09:30");
    assert_eq!(day["time_slots"][1]["is_available"], true);
}

#[tokio::test]
async fn availability_distinguishes_missing_configuration() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_api_url(&mock_server.uri());
    let dentist_id = Uuid::new_v4().to_string();
    let monday = upcoming_monday();

    mount_working_hours(&mock_server, &dentist_id, json!([])).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(&config);
    let (status, body) = get(
        app,
        &format!("/{}/availability?start_date={}&end_date={}", dentist_id, monday, monday),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["days"][0]["status"], "not-configured");
    assert_eq!(body["days"][0]["total_slots"], 0);
}

#[tokio::test]
async fn availability_surfaces_backend_outage_as_retryable() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_api_url(&mock_server.uri());
    let dentist_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/dentist_working_hours"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&mock_server)
        .await;

    let app = create_test_app(&config);
    let (status, body) = get(app, &format!("/{}/availability", dentist_id)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "transient");
    assert_eq!(body["retryable"], true);
}

#[tokio::test]
async fn availability_rejects_inverted_range() {
    let config = TestConfig::default();
    let app = create_test_app(&config);

    let (status, body) = get(
        app,
        &format!("/{}/availability?start_date=2030-01-10&end_date=2030-01-01", Uuid::new_v4()),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn working_hours_read_reports_summary() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_api_url(&mock_server.uri());
    let dentist_id = Uuid::new_v4().to_string();

    mount_working_hours(&mock_server, &dentist_id, MockApiResponses::default_week_rows(&dentist_id)).await;

    let app = create_test_app(&config);
    let (status, body) = get(app, &format!("/{}/working-hours", dentist_id)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["configured"], true);
    assert_eq!(body["working_hours"]["monday"]["start"], "09:00");
    assert_eq!(body["working_hours"]["saturday"]["is_working"], false);
    assert_eq!(body["summary"].as_array().map(Vec::len), Some(5));
}

#[tokio::test]
async fn dentist_can_replace_own_working_hours() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_api_url(&mock_server.uri());
    let dentist = TestUser::dentist("dr.smile@example.com");
    let token = JwtTestUtils::create_test_token(&dentist, &config.jwt_secret, Some(1));

    Mock::given(method("POST"))
        .and(path("/rest/v1/dentist_working_hours"))
        .and(query_param("on_conflict", "dentist_id,day_of_week"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockApiResponses::working_day_row(&dentist.id, "monday", "08:00:00", "12:00:00", true)
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(&config);
    let request = Request::builder()
        .method("PUT")
        .uri(format!("/{}/working-hours", dentist.id))
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(json!({
            "monday": { "start": "08:00", "end": "12:00", "is_working": true }
        }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["working_hours"]["monday"]["end"], "12:00");
}

#[tokio::test]
async fn another_dentist_cannot_change_working_hours() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_api_url(&mock_server.uri());
    let intruder = TestUser::dentist("other@example.com");
    let token = JwtTestUtils::create_test_token(&intruder, &config.jwt_secret, Some(1));

    Mock::given(method("POST"))
        .and(path("/rest/v1/dentist_working_hours"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let app = create_test_app(&config);
    let request = Request::builder()
        .method("PUT")
        .uri(format!("/{}/working-hours", Uuid::new_v4()))
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(json!({
            "monday": { "start": "08:00", "end": "12:00", "is_working": true }
        }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn inverted_working_day_is_rejected() {
    let config = TestConfig::default();
    let admin = TestUser::admin("admin@example.com");
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, Some(1));

    let app = create_test_app(&config);
    let request = Request::builder()
        .method("PUT")
        .uri(format!("/{}/working-hours", Uuid::new_v4()))
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(json!({
            "tuesday": { "start": "17:00", "end": "09:00", "is_working": true }
        }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn working_hours_update_requires_token() {
    let app = create_test_app(&TestConfig::default());
    let request = Request::builder()
        .method("PUT")
        .uri(format!("/{}/working-hours", Uuid::new_v4()))
        .header("content-type", "application/json")
        .body(Body::from("{}"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn services_list_only_offered_assignments() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_api_url(&mock_server.uri());
    let dentist_id = Uuid::new_v4().to_string();
    let offered = Uuid::new_v4().to_string();
    let withdrawn = Uuid::new_v4().to_string();

    let mut withdrawn_row = MockApiResponses::dentist_service_row(&dentist_id, &withdrawn, None);
    withdrawn_row["is_offered"] = json!(false);

    Mock::given(method("GET"))
        .and(path("/rest/v1/dentist_services"))
        .and(query_param("dentist_id", format!("eq.{}", dentist_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockApiResponses::dentist_service_row(&dentist_id, &offered, Some(45)),
            withdrawn_row
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(&config);
    let (status, body) = get(app, &format!("/{}/services", dentist_id)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["services"][0]["service_id"], offered);
    assert_eq!(body["services"][0]["duration_minutes"], 45);
}

async fn send_as(app: Router, method: &str, uri: &str, token: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token));
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn admin_token(config: &TestConfig) -> String {
    let admin = TestUser::admin("admin@example.com");
    JwtTestUtils::create_test_token(&admin, &config.jwt_secret, Some(1))
}

#[tokio::test]
async fn admin_assigns_service_with_custom_length() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_api_url(&mock_server.uri());
    let dentist_id = Uuid::new_v4().to_string();
    let service_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .and(query_param("id", format!("eq.{}", service_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockApiResponses::service_row(&service_id, "Root Canal", 90)
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut saved = MockApiResponses::dentist_service_row(&dentist_id, &service_id, Some(120));
    saved.as_object_mut().unwrap().remove("service");

    Mock::given(method("POST"))
        .and(path("/rest/v1/dentist_services"))
        .and(query_param("on_conflict", "dentist_id,service_id"))
        .and(body_partial_json(json!({
            "dentist_id": dentist_id,
            "service_id": service_id,
            "custom_duration": 120,
            "is_offered": true
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([saved])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (status, body) = send_as(
        create_test_app(&config),
        "POST",
        &format!("/{}/services", dentist_id),
        &admin_token(&config),
        Some(json!({ "service_id": service_id, "custom_duration": 120 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["assignment"]["custom_duration"], 120);
    assert_eq!(body["assignment"]["service"]["name"], "Root Canal");
    assert_eq!(body["bookable"], true);
}

#[tokio::test]
async fn assigning_unknown_service_is_not_found() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_api_url(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/dentist_services"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (status, body) = send_as(
        create_test_app(&config),
        "POST",
        &format!("/{}/services", Uuid::new_v4()),
        &admin_token(&config),
        Some(json!({ "service_id": Uuid::new_v4() })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn negative_custom_price_is_rejected() {
    let config = TestConfig::default();
    let (status, body) = send_as(
        create_test_app(&config),
        "POST",
        &format!("/{}/services", Uuid::new_v4()),
        &admin_token(&config),
        Some(json!({ "service_id": Uuid::new_v4(), "custom_price": -10.0 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn admin_removes_assignment_once() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_api_url(&mock_server.uri());
    let dentist_id = Uuid::new_v4().to_string();
    let service_id = Uuid::new_v4().to_string();

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/dentist_services"))
        .and(query_param("dentist_id", format!("eq.{}", dentist_id)))
        .and(query_param("service_id", format!("eq.{}", service_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockApiResponses::dentist_service_row(&dentist_id, &service_id, None)
        ])))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/dentist_services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let uri = format!("/{}/services/{}", dentist_id, service_id);
    let (status, _) = send_as(create_test_app(&config), "DELETE", &uri, &admin_token(&config), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send_as(create_test_app(&config), "DELETE", &uri, &admin_token(&config), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn dentists_cannot_manage_assignments() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_api_url(&mock_server.uri());
    let dentist = TestUser::dentist("dr.smile@example.com");
    let token = JwtTestUtils::create_test_token(&dentist, &config.jwt_secret, Some(1));

    Mock::given(method("POST"))
        .and(path("/rest/v1/dentist_services"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/dentist_services"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (status, _) = send_as(
        create_test_app(&config),
        "POST",
        &format!("/{}/services", dentist.id),
        &token,
        Some(json!({ "service_id": Uuid::new_v4() })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send_as(
        create_test_app(&config),
        "DELETE",
        &format!("/{}/services/{}", dentist.id, Uuid::new_v4()),
        &token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send_as(create_test_app(&config), "GET", "/catalog", &token, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn catalog_lists_active_services_in_category() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_api_url(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .and(query_param("is_active", "eq.true"))
        .and(query_param("category", "eq.General"))
        .and(query_param("order", "name.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockApiResponses::service_row(&Uuid::new_v4().to_string(), "Dental Cleaning", 30),
            MockApiResponses::service_row(&Uuid::new_v4().to_string(), "Filling", 60)
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (status, body) = send_as(
        create_test_app(&config),
        "GET",
        "/catalog?category=General",
        &admin_token(&config),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["services"][1]["name"], "Filling");
}
