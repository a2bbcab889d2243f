//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use greenlight::config::AppConfig;
use greenlight::data::permissions::MOVIES_READ;
use greenlight::data::{Password, Scope, User};
use greenlight::http::{AppState, HttpServer};
use greenlight::lifecycle::{Phase, ShutdownError};
use greenlight::mailer::{Email, MailError, Mailer};
use greenlight::storage::Engine;

/// Mailer that keeps every message, optionally after a delay.
#[derive(Default)]
pub struct RecordingMailer {
    delay: Duration,
    sent: Mutex<Vec<Email>>,
}

impl RecordingMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }

    /// Activation token from the most recent welcome email to `to`.
    pub fn activation_token_for(&self, to: &str) -> Option<String> {
        let sent = self.sent();
        let email = sent.iter().rev().find(|e| e.to == to)?;
        let start = email.plain_body.find(r#"{"token": ""#)? + r#"{"token": ""#.len();
        Some(email.plain_body[start..start + 26].to_string())
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Configuration for tests: ephemeral port, limiter off.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.listener.environment = "testing".into();
    config.rate_limit.enabled = false;
    config
}

/// A server running on a real listener.
pub struct TestApp {
    pub addr: SocketAddr,
    pub state: AppState,
    pub token: CancellationToken,
    pub phases: watch::Receiver<Phase>,
    pub handle: JoinHandle<Result<(), ShutdownError>>,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn spawn_app(config: AppConfig, mailer: Arc<RecordingMailer>) -> TestApp {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config, Engine::new(), mailer);
    let state = server.state().clone();
    let token = server.coordinator().token();
    let phases = server.coordinator().subscribe();
    let handle = tokio::spawn(server.run(listener));

    TestApp {
        addr,
        state,
        token,
        phases,
        handle,
        client: reqwest::Client::new(),
    }
}

/// Insert an activated user holding `permissions` and return a bearer
/// token for them.
pub async fn seed_user(state: &AppState, email: &str, permissions: &[&str]) -> String {
    let mut user = User::new(
        "Seeded".into(),
        email.into(),
        Password::from_plaintext("pa55word123").await.unwrap(),
    );
    user.activated = true;
    let user = state.models.users.insert(user).await.unwrap();
    state
        .models
        .permissions
        .add_for_user(user.id, permissions)
        .await
        .unwrap();
    state
        .models
        .tokens
        .new_token(user.id, chrono::Duration::hours(1), Scope::Authentication)
        .await
        .unwrap()
        .plaintext
}

pub async fn seed_reader(state: &AppState, email: &str) -> String {
    seed_user(state, email, &[MOVIES_READ]).await
}
