use std::any::Any;
use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use thiserror::Error;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, Any as AnyOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{AuthError, CredentialVerifier, IdentityResolver, TokenCodec};
use crate::config::AppConfig;
use crate::database::{CredentialStore, RecordStore};
use crate::error::ApiError;
use crate::handlers::{protected, public};
use crate::middleware::authenticate;
use crate::policy::{AccessPolicy, PolicyError};
use crate::services::RecordService;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("access rules: {0}")]
    Policy(#[from] PolicyError),

    #[error("token setup: {0}")]
    Auth(#[from] AuthError),
}

/// Process-wide state, built once at startup and shared read-only.
pub struct AppState {
    pub config: AppConfig,
    pub resolver: IdentityResolver,
    pub policy: AccessPolicy,
    pub credentials: CredentialVerifier,
    pub records: RecordService,
}

impl AppState {
    pub fn build(
        config: AppConfig,
        credentials: Arc<dyn CredentialStore>,
        records: Arc<dyn RecordStore>,
    ) -> Result<Self, StartupError> {
        let codec = Arc::new(TokenCodec::new(config.security.jwt_secret.as_bytes())?);

        let policy = match &config.security.access_rules_file {
            Some(path) => AccessPolicy::from_file(path)?,
            None => AccessPolicy::clinic_default()?,
        };
        tracing::info!(
            rules = policy.rules().len(),
            source = ?config.security.access_rules_file,
            "Loaded access rules"
        );

        let credentials = CredentialVerifier::new(
            credentials,
            codec.clone(),
            config.security.token_ttl(),
            config.security.password_hash_cost,
        )?;

        Ok(Self {
            resolver: IdentityResolver::new(codec),
            policy,
            credentials,
            records: RecordService::new(records),
            config,
        })
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.security.cors_origins);

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .route("/docs", get(public::docs::docs_index))
        .route("/docs/:area", get(public::docs::docs_area))
        .route("/api/auth/login", post(public::auth::login_post))
        // Protected
        .merge(auth_routes())
        .merge(admin_routes())
        .merge(record_routes())
        .merge(audit_routes())
        // Global middleware; the last layer added runs first
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .with_state(state)
}

fn auth_routes() -> Router<Arc<AppState>> {
    use protected::auth;

    Router::new().route("/api/auth/whoami", get(auth::whoami_get))
}

fn admin_routes() -> Router<Arc<AppState>> {
    use protected::admin;

    Router::new().route("/api/admin/access-rules", get(admin::access_rules_get))
}

fn record_routes() -> Router<Arc<AppState>> {
    use protected::records;

    Router::new()
        .route(
            "/api/records/:kind",
            get(records::collection_get).post(records::collection_post),
        )
        .route(
            "/api/records/:kind/:id",
            get(records::record_get)
                .patch(records::record_patch)
                .delete(records::record_delete),
        )
        .route("/api/records/:kind/:id/activate", post(records::record_activate))
        .route("/api/records/:kind/:id/deactivate", post(records::record_deactivate))
}

fn audit_routes() -> Router<Arc<AppState>> {
    use protected::audit;

    Router::new().route("/api/audit/:kind/:id", get(audit::history_get))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(AnyOrigin);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

fn handle_panic(_: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("Request handler panicked");
    ApiError::internal_server_error("An error occurred while processing your request").into_response()
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Ward API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Hospital administration API with role-gated access and field-level audit history",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "docs": "/docs[/:area] (public)",
                "login": "/api/auth/login (public - token acquisition)",
                "auth": "/api/auth/whoami (any authenticated role)",
                "admin": "/api/admin/* (ADMIN)",
                "records": "/api/records/:kind[/:id] (role-gated per kind)",
                "audit": "/api/audit/:kind/:id (ADMIN, DOCTOR)"
            }
        }
    }))
}

async fn health(axum::extract::State(state): axum::extract::State<Arc<AppState>>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.records.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": now, "database": "ok" }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": { "status": "degraded", "timestamp": now }
                })),
            )
        }
    }
}
