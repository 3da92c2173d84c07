#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;

use property_api::auth::{generate_jwt, Claims};
use property_api::config::AppConfig;
use property_api::database::models::{User, UserId};
use property_api::database::MemoryStore;
use property_api::{app, AppState};

pub const SECRET: &str = "integration-test-secret";

/// An in-process server over a fresh in-memory store.
pub struct TestServer {
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    pub client: reqwest::Client,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = AppConfig::for_testing(SECRET);
        let store = Arc::new(MemoryStore::new());
        let state = AppState::in_memory(&config, store.clone())?;
        let router = app(state, &config.security);

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind port {}", port))?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let server = Self {
            base_url,
            store,
            client: reqwest::Client::new(),
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Seed a user and return its id with a valid bearer header value.
    pub async fn user(&self, username: &str) -> Result<(UserId, String)> {
        let user = User::new(username, format!("{}@example.com", username), "s3cret-password");
        let id = user.id;
        self.store.insert_user(user).await;
        Ok((id, bearer(id)?))
    }
}

pub fn bearer(id: UserId) -> Result<String> {
    let token = generate_jwt(SECRET, &Claims::new(id, 1)?)?;
    Ok(format!("Bearer {}", token))
}
