//! Integration tests for the Config API client and CRUD handlers, using
//! wiremock to stand in for the Stratos backend.
//!
//! These verify request shapes (bearer auth, sparse updates, enum wire
//! forms, bookmark headers) and the error classification behavior the
//! handlers rely on: 404 reconciles local state, 5xx surfaces a retryable
//! service error.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stratoform::api::ConfigClient;
use stratoform::resources::application::ApplicationResource;
use stratoform::resources::application_space::ApplicationSpaceDataSource;
use stratoform::resources::trust_score_profile::TrustScoreProfileResource;
use stratoform::resources::{DataSource, ManagedResource};
use stratoform::state::ResourceData;

const CUSTOMER_GID: &str = "gid:AAAAAAAAAAAAAAAAAAAAAA";
const SPACE_GID: &str = "gid:BBBBBBBBBBBBBBBBBBBBBB";
const APP_GID: &str = "gid:CCCCCCCCCCCCCCCCCCCCCC";
const PROFILE_GID: &str = "gid:DDDDDDDDDDDDDDDDDDDDDD";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("stratoform=debug")
        .try_init();
}

fn obj(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

async fn test_client(server: &MockServer) -> Arc<ConfigClient> {
    Arc::new(ConfigClient::with_base_url(&server.uri(), "test-token").unwrap())
}

fn application_body() -> Value {
    json!({
        "id": APP_GID,
        "name": "acme",
        "displayName": "acme",
        "customerId": CUSTOMER_GID,
        "appSpaceId": SPACE_GID,
        "createTime": "2024-03-01T10:00:00Z",
        "updateTime": "2024-03-01T10:00:00Z",
        "etag": "W/\"1\"",
        "bookmark": "bm-create-1"
    })
}

#[tokio::test]
async fn test_create_application_round_trip() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/applications"))
        .and(header("Authorization", "Bearer test-token"))
        .and(body_partial_json(json!({
            "project_id": SPACE_GID,
            "name": "acme"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(application_body()))
        .expect(1)
        .mount(&server)
        .await;

    // The follow-up read must carry the bookmark returned by the create.
    Mock::given(method("GET"))
        .and(path(format!("/applications/{APP_GID}")))
        .and(header("X-Bookmark", "bm-create-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(application_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let resource = ApplicationResource;
    let config = obj(json!({
        "app_space_id": SPACE_GID,
        "name": "acme",
    }));
    let mut data = ResourceData::from_parts(resource.schema(), config, Map::new());

    let diags = resource.create(&client, &mut data).await;
    assert!(!diags.has_error(), "unexpected diagnostics: {diags:?}");
    assert_eq!(data.id(), APP_GID);
    assert_eq!(data.get_string("customer_id"), CUSTOMER_GID);
    assert_eq!(data.get_string("display_name"), "acme");
    assert_eq!(data.get_string("create_time"), "2024-03-01T10:00:00Z");
}

#[tokio::test]
async fn test_server_defaulted_display_name_is_not_a_pending_change() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/applications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(application_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/applications/{APP_GID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(application_body()))
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let resource = ApplicationResource;
    // Operator never set display_name; the server defaults it to the name.
    let config = obj(json!({
        "app_space_id": SPACE_GID,
        "name": "acme",
    }));
    let mut data = ResourceData::from_parts(resource.schema(), config.clone(), Map::new());
    let diags = resource.create(&client, &mut data).await;
    assert!(!diags.has_error());
    data.commit();

    let plan = resource.schema().plan(data.prior(), &config);
    assert!(
        plan.is_empty(),
        "server-side defaulting leaked into the plan: {:?}",
        plan.changes()
    );
}

#[tokio::test]
async fn test_update_sends_only_changed_fields() {
    init_tracing();
    let server = MockServer::start().await;

    let updated = {
        let mut body = application_body();
        body["displayName"] = json!("Acme Corp.");
        body
    };

    // Exact body match: description must be absent, not null or empty.
    Mock::given(method("PUT"))
        .and(path(format!("/applications/{APP_GID}")))
        .and(body_json(json!({"displayName": "Acme Corp."})))
        .respond_with(ResponseTemplate::new(200).set_body_json(updated.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/applications/{APP_GID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(updated))
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let resource = ApplicationResource;
    let prior = obj(json!({
        "app_space_id": SPACE_GID,
        "name": "acme",
        "display_name": "acme",
        "deletion_protection": true,
    }));
    let config = obj(json!({
        "app_space_id": SPACE_GID,
        "name": "acme",
        "display_name": "Acme Corp.",
        "deletion_protection": true,
    }));
    let mut data = ResourceData::from_parts(resource.schema(), config, prior).with_id(APP_GID);

    let diags = resource.update(&client, &mut data).await;
    assert!(!diags.has_error(), "unexpected diagnostics: {diags:?}");
    assert_eq!(data.get_string("display_name"), "Acme Corp.");
}

#[tokio::test]
async fn test_update_with_only_protection_change_skips_network() {
    init_tracing();
    let server = MockServer::start().await;

    let client = test_client(&server).await;
    let resource = ApplicationResource;
    let prior = obj(json!({
        "app_space_id": SPACE_GID,
        "name": "acme",
        "deletion_protection": true,
    }));
    let config = obj(json!({
        "app_space_id": SPACE_GID,
        "name": "acme",
        "deletion_protection": false,
    }));
    let mut data = ResourceData::from_parts(resource.schema(), config, prior).with_id(APP_GID);

    let diags = resource.update(&client, &mut data).await;
    assert!(!diags.has_error());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_read_404_removes_resource_from_state() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/applications/{APP_GID}")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "application does not exist"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let resource = ApplicationResource;
    let mut data = ResourceData::new(resource.schema()).with_id(APP_GID);

    let diags = resource.read(&client, &mut data).await;
    assert!(!diags.has_error(), "404 must not be an error: {diags:?}");
    assert!(data.is_gone());
}

#[tokio::test]
async fn test_5xx_surfaces_service_error() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/applications"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let resource = ApplicationResource;
    let config = obj(json!({"app_space_id": SPACE_GID, "name": "acme"}));
    let mut data = ResourceData::from_parts(resource.schema(), config, Map::new());

    let diags = resource.create(&client, &mut data).await;
    assert!(diags.has_error());
    let diag = diags.iter().next().unwrap();
    assert!(diag.summary.contains("try again later"), "{diag:?}");
    assert!(data.id().is_empty());
}

#[tokio::test]
async fn test_delete_refused_locally_under_protection() {
    init_tracing();
    let server = MockServer::start().await;

    let client = test_client(&server).await;
    let resource = ApplicationResource;
    // deletion_protection defaults to true when never configured.
    let config = obj(json!({"app_space_id": SPACE_GID, "name": "acme"}));
    let mut data = ResourceData::from_parts(resource.schema(), config, Map::new()).with_id(APP_GID);

    let diags = resource.delete(&client, &mut data).await;
    assert!(diags.has_error());
    assert!(
        server.received_requests().await.unwrap().is_empty(),
        "protected delete must not reach the API"
    );

    let diag = diags.iter().next().unwrap();
    assert_eq!(diag.summary, "Delete Protection is enabled");
}

#[tokio::test]
async fn test_delete_issued_once_protection_lifted() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(format!("/applications/{APP_GID}")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let resource = ApplicationResource;
    let config = obj(json!({
        "app_space_id": SPACE_GID,
        "name": "acme",
        "deletion_protection": false,
    }));
    let mut data = ResourceData::from_parts(resource.schema(), config, Map::new()).with_id(APP_GID);

    let diags = resource.delete(&client, &mut data).await;
    assert!(!diags.has_error(), "unexpected diagnostics: {diags:?}");
}

#[tokio::test]
async fn test_data_source_lookup_by_name_uses_parent_query() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects/my-space"))
        .and(query_param("organization_id", CUSTOMER_GID))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": SPACE_GID,
            "name": "my-space",
            "customerId": CUSTOMER_GID,
            "region": "europe-west1",
            "createTime": "2024-03-01T10:00:00Z",
            "updateTime": "2024-03-01T10:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let source = ApplicationSpaceDataSource;
    let config = obj(json!({
        "name": "my-space",
        "customer_id": CUSTOMER_GID,
    }));
    let mut data = ResourceData::from_parts(source.schema(), config, Map::new());

    let diags = source.read(&client, &mut data).await;
    assert!(!diags.has_error(), "unexpected diagnostics: {diags:?}");
    assert_eq!(data.get_string("app_space_id"), SPACE_GID);
    assert_eq!(data.get_string("region"), "europe-west1");
}

#[tokio::test]
async fn test_data_source_404_is_a_lookup_failure() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such project"))
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let source = ApplicationSpaceDataSource;
    let config = obj(json!({"name": "ghost", "customer_id": CUSTOMER_GID}));
    let mut data = ResourceData::from_parts(source.schema(), config, Map::new());

    let diags = source.read(&client, &mut data).await;
    assert!(diags.has_error());
    let diag = diags.iter().next().unwrap();
    assert!(diag.summary.contains("not found"), "{diag:?}");
}

#[tokio::test]
async fn test_trust_score_profile_sends_wire_enums() {
    init_tracing();
    let server = MockServer::start().await;

    let body = json!({
        "id": PROFILE_GID,
        "name": "person-trust",
        "appSpaceId": SPACE_GID,
        "customerId": CUSTOMER_GID,
        "nodeClassification": "Person",
        "schedule": "UPDATE_FREQUENCY_DAILY",
        "dimensions": [
            {"name": "TRUST_SCORE_DIMENSION_FRESHNESS", "weight": 0.8},
            {"name": "TRUST_SCORE_DIMENSION_VERIFICATION", "weight": 0.2}
        ],
        "createTime": "2024-03-01T10:00:00Z",
        "updateTime": "2024-03-01T10:00:00Z"
    });

    Mock::given(method("POST"))
        .and(path("/trust-score-profiles"))
        .and(body_partial_json(json!({
            "location": SPACE_GID,
            "schedule": "UPDATE_FREQUENCY_DAILY",
            "dimensions": [
                {"name": "TRUST_SCORE_DIMENSION_FRESHNESS", "weight": 0.8},
                {"name": "TRUST_SCORE_DIMENSION_VERIFICATION", "weight": 0.2}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/trust-score-profiles/{PROFILE_GID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let resource = TrustScoreProfileResource;
    let config = obj(json!({
        "location": SPACE_GID,
        "name": "person-trust",
        "node_classification": "Person",
        "schedule": "daily",
        "dimension": [
            {"name": "freshness", "weight": 0.8},
            {"name": "verification", "weight": 0.2}
        ],
    }));
    let mut data = ResourceData::from_parts(resource.schema(), config, Map::new());

    let diags = resource.create(&client, &mut data).await;
    assert!(!diags.has_error(), "unexpected diagnostics: {diags:?}");
    assert_eq!(data.id(), PROFILE_GID);
    // Wire enums flattened back to their configuration spelling.
    assert_eq!(data.get_string("schedule"), "daily");
    let dimensions = data.get_object_list("dimension");
    assert_eq!(dimensions[0]["name"], "freshness");
    // location mirrors the narrowest container reported by the server.
    assert_eq!(data.get_string("location"), SPACE_GID);
}
