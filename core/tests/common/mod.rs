//! Shared fixtures for tests that talk to the mock server over real HTTP.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::time::Duration;

use mock_server::{MockState, DEFAULT_API_KEY};
use neon_api::{ClientConfig, ClientOptions, NeonApiClient, Project, ProjectCreate};

/// Start the mock server on a random port and return its state and base URL.
///
/// The server runs on a background thread with its own current-thread
/// runtime and lives until the test process exits.
pub fn spawn_server() -> (MockState, String) {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    let state = MockState::default();
    let server_state = state.clone();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, server_state).await
        })
        .unwrap();
    });

    (state, format!("http://{addr}"))
}

pub fn client(base_url: &str) -> NeonApiClient {
    let config = ClientConfig::new(DEFAULT_API_KEY)
        .unwrap()
        .with_base_url(base_url)
        .with_retry_backoff(Duration::ZERO);
    NeonApiClient::with_default_transport(&config)
}

pub fn no_retries() -> ClientOptions {
    ClientOptions::default()
}

pub fn create_input(name: &str) -> ProjectCreate {
    ProjectCreate {
        instance_handle: "scalable".to_string(),
        name: name.to_string(),
        platform_id: "aws".to_string(),
        region_id: "aws-us-west-2".to_string(),
        settings: BTreeMap::new(),
    }
}

/// A throwaway project that is deleted when the fixture is dropped.
pub struct ProjectFixture {
    client: NeonApiClient,
    pub project: Project,
}

impl ProjectFixture {
    pub fn new(client: &NeonApiClient, name: &str) -> Self {
        let result = client
            .project_create(&create_input(name), &no_retries())
            .expect("fixture project create failed");
        Self {
            client: client.clone(),
            project: result.project,
        }
    }

    pub fn id(&self) -> &str {
        &self.project.id
    }
}

impl Drop for ProjectFixture {
    fn drop(&mut self) {
        // Tests that delete the project themselves leave nothing to clean up.
        match self.client.project_delete(&self.project.id, &no_retries()) {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {}
            Err(err) if std::thread::panicking() => eprintln!("fixture cleanup failed: {err}"),
            Err(err) => panic!("fixture cleanup failed: {err}"),
        }
    }
}
