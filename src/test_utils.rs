//! Shared helpers for handler and integration tests.

use std::sync::Arc;

use crate::auth::AuthGate;
use crate::config::{Config, EmailTransportConfig};
use crate::email::EmailService;
use crate::store::{MockCredentialStore, MockFileStore, MockPenaltyStore, MockTaskStore, Stores};
use crate::{AppState, build_router};

/// Config with a signing secret and a file email transport, suitable for tests.
pub fn create_test_config() -> Config {
    let mut config = Config {
        secret_key: Some("test-secret-key".to_string()),
        ..Default::default()
    };
    config.email.transport = EmailTransportConfig::File {
        path: std::env::temp_dir().join("taskloft-test-emails").to_string_lossy().into_owned(),
    };
    config
}

/// App state wired to in-memory mocks, with handles kept for assertions.
pub struct TestContext {
    pub state: AppState,
    pub credentials: Arc<MockCredentialStore>,
    pub tasks: Arc<MockTaskStore>,
    pub penalties: Arc<MockPenaltyStore>,
    pub files: Arc<MockFileStore>,
}

pub fn create_test_context() -> TestContext {
    let config = create_test_config();

    let credentials = Arc::new(MockCredentialStore::new());
    let tasks = Arc::new(MockTaskStore::new());
    let penalties = Arc::new(MockPenaltyStore::new());
    let files = Arc::new(MockFileStore::new());

    let stores = Stores {
        credentials: credentials.clone(),
        tasks: tasks.clone(),
        penalties: penalties.clone(),
        files: files.clone(),
    };

    let gate = AuthGate::new(&config, credentials.clone(), penalties.clone()).unwrap();
    let email = EmailService::new(&config).unwrap();

    let state = AppState::builder()
        .config(config)
        .stores(stores)
        .gate(Arc::new(gate))
        .email(Arc::new(email))
        .build();

    TestContext {
        state,
        credentials,
        tasks,
        penalties,
        files,
    }
}

pub fn test_server(state: AppState) -> axum_test::TestServer {
    let router = build_router(state).unwrap();
    axum_test::TestServer::new(router).unwrap()
}
