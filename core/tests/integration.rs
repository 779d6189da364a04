//! Lifecycle tests against the live mock server.
//!
//! # Design
//! Each test starts its own mock server on a random port and drives the
//! client over real HTTP through `UreqTransport`, so request building, the
//! retry stage and classification are exercised end to end.

mod common;

use std::collections::BTreeMap;

use common::{client, create_input, no_retries, spawn_server, ProjectFixture};
use neon_api::{ClientOptions, Error, NeonApiClient, ProjectUpdate, UreqTransport};

#[test]
fn create_echoes_input_with_canonical_region() {
    let (_state, base_url) = spawn_server();
    let client = client(&base_url);

    let input = create_input("Test Project 1");
    let result = client.project_create(&input, &no_retries()).unwrap();

    assert!(!result.project.id.is_empty());
    assert_eq!(result.project.name, input.name);
    assert_eq!(result.project.platform_id, input.platform_id);
    assert_eq!(result.project.region_id, input.region_id);
    assert_eq!(result.response.region_name, "us-west-2");
    assert!(!result.project.is_branch());

    client.project_delete(&result.project.id, &no_retries()).unwrap();
}

#[test]
fn create_then_read_returns_same_project() {
    let (_state, base_url) = spawn_server();
    let client = client(&base_url);
    let fixture = ProjectFixture::new(&client, "Test Project 2");

    let project = client.project_read(fixture.id(), &no_retries()).unwrap();
    assert_eq!(project.id, fixture.id());
    assert_eq!(project, fixture.project);
}

#[test]
fn update_name_leaves_other_fields_unchanged() {
    let (_state, base_url) = spawn_server();
    let client = client(&base_url);
    let fixture = ProjectFixture::new(&client, "Test Project 3");

    let update = ProjectUpdate {
        name: Some("updated-project-name".to_string()),
        ..Default::default()
    };
    let result = client.project_update(fixture.id(), &update, &no_retries()).unwrap();
    assert_eq!(result.project.id, fixture.id());

    let project = client.project_read(fixture.id(), &no_retries()).unwrap();
    assert_eq!(project.name, "updated-project-name");
    assert_eq!(project.instance_handle, fixture.project.instance_handle);
    assert_eq!(project.platform_id, fixture.project.platform_id);
    assert_eq!(project.region_id, fixture.project.region_id);
    assert_eq!(project.settings, fixture.project.settings);
}

#[test]
fn update_replaces_settings_and_pooler() {
    let (_state, base_url) = spawn_server();
    let client = client(&base_url);
    let fixture = ProjectFixture::new(&client, "Test Project 4");

    let settings = BTreeMap::from([("max_connections".to_string(), "100".to_string())]);
    let update = ProjectUpdate {
        instance_type_id: Some("2".to_string()),
        pooler_enabled: Some(true),
        settings: Some(settings.clone()),
        ..Default::default()
    };
    let result = client.project_update(fixture.id(), &update, &no_retries()).unwrap();
    assert!(result.response.pooler_enabled);
    assert_eq!(result.project.instance_type_id, "2");
    assert_eq!(result.project.settings, settings);
    assert_eq!(result.project.name, "Test Project 4");
}

#[test]
fn read_after_delete_is_not_found() {
    let (state, base_url) = spawn_server();
    let client = client(&base_url);
    let fixture = ProjectFixture::new(&client, "Test Project 5");

    client.project_delete(fixture.id(), &no_retries()).unwrap();

    let err = client.project_read(fixture.id(), &no_retries()).unwrap_err();
    assert!(err.is_not_found(), "expected not found, got {err}");
    let api = err.api().unwrap();
    assert_eq!(api.code, "not_found");
    assert_eq!(api.url, format!("{base_url}/api/v1/projects/{}", fixture.id()));
    assert!(err.to_string().contains("status_code: 404"));

    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    assert_eq!(rt.block_on(state.project_count()), 0);
}

#[test]
fn delete_twice_surfaces_api_error() {
    let (_state, base_url) = spawn_server();
    let client = client(&base_url);
    let fixture = ProjectFixture::new(&client, "Test Project 6");

    client.project_delete(fixture.id(), &no_retries()).unwrap();
    let err = client.project_delete(fixture.id(), &no_retries()).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn branch_is_scoped_to_parent_and_read_as_project() {
    let (_state, base_url) = spawn_server();
    let client = client(&base_url);
    let parent = ProjectFixture::new(&client, "Test Project 7");

    let result = client.branch_create(parent.id(), &no_retries()).unwrap();
    assert_eq!(result.project.parent_id, parent.id());
    assert!(result.project.is_branch());
    assert_eq!(result.response.current_state, "provisioning");

    let branch = client.project_read(&result.project.id, &no_retries()).unwrap();
    assert_eq!(branch.parent_id, parent.id());

    client.project_delete(&result.project.id, &no_retries()).unwrap();
    let err = client.project_read(&result.project.id, &no_retries()).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn branch_of_missing_parent_is_api_error() {
    let (_state, base_url) = spawn_server();
    let client = client(&base_url);

    let err = client.branch_create("missing", &no_retries()).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn malformed_region_never_reaches_the_server() {
    let (state, base_url) = spawn_server();
    let client = client(&base_url);

    let mut input = create_input("Test Project 8");
    input.region_id = "uswest2".to_string();
    let err = client.project_create(&input, &no_retries()).unwrap_err();
    assert!(matches!(err, Error::Region(_)));

    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    assert_eq!(rt.block_on(state.project_count()), 0);
}

#[test]
fn wrong_api_key_is_structured_error() {
    let (_state, base_url) = spawn_server();
    let client = NeonApiClient::new(UreqTransport::new(), "wrong-key").with_base_url(&base_url);

    let err = client.project_read("anything", &no_retries()).unwrap_err();
    let api = err.api().expect("expected structured API error");
    assert_eq!(api.status, 401);
    assert_eq!(api.code, "unauthorized");
}

#[test]
fn unstructured_failure_carries_raw_dump() {
    let (state, base_url) = spawn_server();
    let client = client(&base_url);
    state.fail_next(1);

    let err = client.project_read("anything", &no_retries()).unwrap_err();
    match err {
        Error::UnexpectedResponse { status, url, dump } => {
            assert_eq!(status, 503);
            assert_eq!(url, format!("{base_url}/api/v1/projects/anything"));
            assert!(dump.contains("GET "), "captured dump should include the request: {dump}");
            assert!(dump.contains("upstream unavailable"));
            assert!(!dump.contains(mock_server::DEFAULT_API_KEY));
        }
        other => panic!("expected UnexpectedResponse, got {other:?}"),
    }
}

#[test]
fn retries_recover_from_unavailable_server() {
    let (state, base_url) = spawn_server();
    let client = client(&base_url);
    state.fail_next(2);

    let result = client
        .project_create(&create_input("Test Project 9"), &ClientOptions::with_retries(2))
        .unwrap();
    assert!(!result.project.id.is_empty());

    client.project_delete(&result.project.id, &no_retries()).unwrap();
}

#[test]
fn retries_exhausted_reports_last_response() {
    let (state, base_url) = spawn_server();
    let client = client(&base_url);
    state.fail_next(3);

    let err = client
        .project_read("anything", &ClientOptions::with_retries(1))
        .unwrap_err();
    assert!(matches!(err, Error::UnexpectedResponse { status: 503, .. }));

    // The third queued failure is still pending.
    let err = client.project_read("anything", &no_retries()).unwrap_err();
    assert!(matches!(err, Error::UnexpectedResponse { status: 503, .. }));
}

#[test]
fn connection_refused_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client(&format!("http://{addr}"));
    let err = client
        .project_read("anything", &ClientOptions::with_retries(1))
        .unwrap_err();
    assert!(matches!(err, Error::Transport { attempts: 2, .. }), "got {err:?}");
}

#[test]
fn debug_mode_does_not_change_results() {
    let (_state, base_url) = spawn_server();
    let mut client = client(&base_url);
    client.set_debug(true);

    let fixture = ProjectFixture::new(&client, "Test Project 10");
    let project = client.project_read(fixture.id(), &no_retries()).unwrap();
    assert_eq!(project.id, fixture.id());
}
