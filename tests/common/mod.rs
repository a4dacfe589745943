#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use alm_settings_api::auth::{generate_jwt, Claims, ROOT_ACCESS};
use alm_settings_api::config::AppConfig;
use alm_settings_api::database::{AlmSetting, MemorySettingsStore};
use alm_settings_api::services::AlmSettingService;
use alm_settings_api::{app, AppState};
use anyhow::{Context, Result};
use reqwest::StatusCode;
use uuid::Uuid;

pub const SECRET: &str = "integration-test-secret";

pub struct TestServer {
    pub base_url: String,
    pub store: MemorySettingsStore,
    pub client: reqwest::Client,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn update_github_url(&self) -> String {
        self.url("/api/alm_settings/update_github")
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
}

/// Serve the router in-process over a memory store seeded with `settings`
pub async fn spawn_server(settings: Vec<AlmSetting>) -> Result<TestServer> {
    let store = MemorySettingsStore::new();
    for setting in settings {
        store.insert(setting).await?;
    }

    let service = AlmSettingService::new(Arc::new(store.clone()));
    let router = app(AppState::new(service, SECRET), &AppConfig::development());

    // Pick an unused port for isolation
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    let server = TestServer {
        base_url: format!("http://127.0.0.1:{}", port),
        store,
        client: reqwest::Client::new(),
    };
    server.wait_ready(Duration::from_secs(5)).await?;
    Ok(server)
}

pub fn token(access: &str) -> String {
    let claims = Claims::new("admin".to_string(), access.to_string(), Uuid::new_v4());
    generate_jwt(&claims, SECRET).expect("token")
}

pub fn admin_token() -> String {
    token(ROOT_ACCESS)
}
