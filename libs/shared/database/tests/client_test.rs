use assert_matches::assert_matches;
use reqwest::Method;
use serde_json::{json, Value};
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, header};

use shared_config::AppConfig;
use shared_database::{ClinicApiClient, DatabaseError};

fn client_for(server: &MockServer) -> ClinicApiClient {
    let config = AppConfig {
        api_url: server.uri(),
        api_key: "test-api-key".to_string(),
        jwt_secret: "secret".to_string(),
        ..AppConfig::default()
    };
    ClinicApiClient::new(&config)
}

#[tokio::test]
async fn test_request_sends_api_key_and_bearer_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .and(header("apikey", "test-api-key"))
        .and(header("Authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let rows: Vec<Value> = client
        .request(Method::GET, "/rest/v1/services", Some("user-token"), None)
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_unique_violation_maps_to_conflict() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint"
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result: Result<Vec<Value>, DatabaseError> = client
        .request(Method::POST, "/rest/v1/appointments", Some("token"), Some(json!({})))
        .await;

    assert_matches!(result, Err(DatabaseError::Conflict(_)));
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let err = client
        .request::<Vec<Value>>(Method::GET, "/rest/v1/appointments", None, None)
        .await
        .unwrap_err();

    assert!(err.is_transient());
}

#[tokio::test]
async fn test_empty_body_decodes_as_unit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result: Option<Value> = client
        .request(Method::PATCH, "/rest/v1/appointments", Some("token"), Some(json!({"status": "confirmed"})))
        .await
        .unwrap();

    assert!(result.is_none());
}
