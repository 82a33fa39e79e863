//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p imgpress-api`. Every app gets its
//! own temporary results, staging and public directories.

#![allow(dead_code)]

pub mod fixtures;

use axum_test::TestServer;
use imgpress_api::setup::{self, routes};
use imgpress_api::AppState;
use imgpress_core::{BatchPolicy, Config};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Test application: server, state, and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn results_dir(&self) -> &Path {
        &self.state.config.results_dir
    }

    pub fn staging_dir(&self) -> &Path {
        &self.state.config.staging_dir
    }

    /// File names currently in a directory, sorted.
    pub fn list(&self, dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .expect("Failed to read directory")
            .map(|entry| {
                entry
                    .expect("Failed to read directory entry")
                    .file_name()
                    .into_string()
                    .expect("Non UTF-8 file name")
            })
            .collect();
        names.sort();
        names
    }
}

/// Setup test app with the default all-or-nothing policy.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {}).await
}

/// Setup test app, letting the caller adjust the configuration.
pub async fn setup_test_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let mut config = create_test_config(temp_dir.path());
    configure(&mut config);
    config.validate().expect("Invalid test configuration");

    let state = setup::build_state(config)
        .await
        .expect("Failed to build app state");
    let app = routes::setup_routes(state.clone());
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        state,
        _temp_dir: temp_dir,
    }
}

fn create_test_config(root: &Path) -> Config {
    let public_dir: PathBuf = root.join("public");
    std::fs::create_dir_all(&public_dir).expect("Failed to create public directory");
    std::fs::write(
        public_dir.join("index.html"),
        "<form action=\"/upload\"></form>",
    )
    .expect("Failed to write index page");

    Config {
        environment: "test".to_string(),
        results_dir: root.join("uploads"),
        staging_dir: root.join("staging"),
        public_dir,
        max_files_per_batch: 3,
        max_file_size_bytes: 1024 * 1024,
        batch_policy: BatchPolicy::AllOrNothing,
        ..Config::default()
    }
}
