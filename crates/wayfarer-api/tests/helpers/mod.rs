//! Test helpers: the full router over the in-memory store, a stub identity
//! service and local storage in a temp dir.
//!
//! Run from workspace root: `cargo test -p wayfarer-api`.

#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;
use wayfarer_api::auth::{IdentityProvider, User};
use wayfarer_api::setup::routes::setup_routes;
use wayfarer_api::{AppState, HttpSettings, Stores};
use wayfarer_core::{AppError, Role};
use wayfarer_db::{AdminRoleStore, InMemoryStore};
use wayfarer_storage::LocalStorage;

pub const SESSION_COOKIE: &str = "wayfarer_session";

pub const FOUNDER: &str = "founder-token";
pub const ADMIN: &str = "admin-token";
pub const SUPPORT: &str = "support-token";
pub const MARKETING: &str = "marketing-token";
/// Signed in but holds no admin role.
pub const OUTSIDER: &str = "outsider-token";

/// Identity service double: fixed tokens map to fixed users.
pub struct StubIdentityProvider {
    users: HashMap<String, User>,
}

impl StubIdentityProvider {
    fn new() -> Self {
        let users = [FOUNDER, ADMIN, SUPPORT, MARKETING, OUTSIDER]
            .into_iter()
            .map(|token| (token.to_string(), user_for(token)))
            .collect();
        Self { users }
    }
}

pub fn user_for(token: &str) -> User {
    let id = token.trim_end_matches("-token");
    User {
        id: format!("{}-1", id),
        email: format!("{}@wayfarer.test", id),
        name: None,
        picture: None,
    }
}

#[async_trait]
impl IdentityProvider for StubIdentityProvider {
    async fn oauth_redirect_url(&self) -> Result<String, AppError> {
        Ok("https://accounts.example.com/o/oauth2/auth?client_id=test".to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<String, AppError> {
        match code {
            "good-code" => Ok(FOUNDER.to_string()),
            _ => Err(AppError::Unauthorized("Invalid authorization code".to_string())),
        }
    }

    async fn current_user(&self, session_token: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(session_token).cloned())
    }

    async fn revoke_session(&self, _session_token: &str) -> Result<(), AppError> {
        Ok(())
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub store: Arc<InMemoryStore>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

pub async fn setup_test_app() -> TestApp {
    let store = Arc::new(InMemoryStore::new());
    for (token, role) in [
        (FOUNDER, Role::Founder),
        (ADMIN, Role::Admin),
        (SUPPORT, Role::Support),
        (MARKETING, Role::Marketing),
    ] {
        store
            .create_role(&user_for(token).id, role)
            .await
            .expect("Failed to seed admin role");
    }

    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let storage = LocalStorage::new(temp_dir.path())
        .await
        .expect("Failed to create local storage");

    let settings = HttpSettings {
        session_cookie_name: SESSION_COOKIE.to_string(),
        max_upload_bytes: 1024 * 1024,
        production: false,
        default_currency: "INR".to_string(),
        http_concurrency_limit: 64,
    };
    let state = Arc::new(AppState::new(
        Stores::shared(store.clone()),
        Arc::new(StubIdentityProvider::new()),
        Arc::new(storage),
        settings,
    ));
    let router = setup_routes(&["*".to_string()], state).expect("Failed to build router");
    let server = TestServer::new(router).expect("Failed to start test server");

    TestApp {
        server,
        store,
        _temp_dir: temp_dir,
    }
}
