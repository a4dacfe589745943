use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::Span;

use crate::config::{AppConfig, SecurityConfig, StoreBackend};
use crate::database::{DatabaseManager, MemorySettingsStore, PgSettingsStore, SettingsStore};
use crate::handlers;
use crate::middleware::{jwt_auth_middleware, ApiResponse};
use crate::services::{alm_settings_actions, AlmSettingService};

/// Shared handler state: the settings service and the token secret
#[derive(Clone)]
pub struct AppState {
    alm_settings: AlmSettingService,
    jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(alm_settings: AlmSettingService, jwt_secret: impl Into<Arc<str>>) -> Self {
        Self {
            alm_settings,
            jwt_secret: jwt_secret.into(),
        }
    }

    /// Build the configured store backend and wire the service over it
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn SettingsStore> = match config.store.backend {
            StoreBackend::Memory => {
                let store = MemorySettingsStore::new();
                if let Some(path) = &config.store.seed_path {
                    store.load_seed_file(path).await?;
                }
                tracing::warn!("Using in-memory settings store; changes are lost on restart");
                Arc::new(store)
            }
            StoreBackend::Postgres => {
                let pool = DatabaseManager::connect(&config.database).await?;
                let store = PgSettingsStore::new(pool);
                store.ensure_schema().await?;
                Arc::new(store)
            }
        };

        let service = AlmSettingService::new(store).with_audit_logging(config.security.enable_audit_logging);
        Ok(Self::new(service, config.security.jwt_secret.as_str()))
    }

    pub fn alm_settings(&self) -> &AlmSettingService {
        &self.alm_settings
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }
}

pub fn app(state: AppState, config: &AppConfig) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        // Elevated API
        .merge(alm_settings_routes(state.clone()))
        // Global middleware
        .layer(cors_layer(&config.security))
        .layer(RequestBodyLimitLayer::new(config.api.max_request_size_bytes));

    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http().make_span_with(request_span));
    }

    router.with_state(state)
}

fn alm_settings_routes(state: AppState) -> Router<AppState> {
    use axum::routing::post;
    use handlers::elevated::alm_settings;

    Router::new()
        .route("/api/alm_settings/update_github", post(alm_settings::update_github))
        .route_layer(axum::middleware::from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new().allow_origin(AllowOrigin::list(origins))
}

/// Request span without the query string, which may carry a private key
fn request_span(request: &Request) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
    )
}

async fn root() -> impl IntoResponse {
    let version = env!("CARGO_PKG_VERSION");

    ApiResponse::success(json!({
        "name": "ALM Settings API",
        "version": version,
        "description": "Administration of ALM integration settings",
        "endpoints": {
            "home": "/ (public)",
            "health": "/health (public)",
            "alm_settings": "/api/alm_settings/* (restricted, requires root access)",
        },
        "actions": {
            "alm_settings": alm_settings_actions(),
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.alm_settings().store().ping().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
