#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use ward_api::app::{app, AppState};
use ward_api::auth::{hash_password, Role};
use ward_api::config::AppConfig;
use ward_api::database::{CredentialStore, MemoryStore, RecordStore, StaffCredential};

pub const SECRET: &str = "integration-test-signing-key-0123456789";
pub const PASSWORD: &str = "correct horse battery";
pub const TOKEN_TTL_SECS: u64 = 900;

// Lowest cost bcrypt accepts; keeps logins fast.
const HASH_COST: u32 = 4;

pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,
}

fn account(id: i64, username: &str, name: &str, role: Role, active: bool) -> Result<StaffCredential> {
    Ok(StaffCredential {
        id,
        username: username.to_string(),
        display_name: name.to_string(),
        role,
        password_hash: hash_password(PASSWORD, HASH_COST)?,
        password_change_required: false,
        active,
    })
}

/// Router over a memory store seeded with one account per role plus a
/// disabled one.
pub fn spawn_app() -> Result<TestApp> {
    let store = MemoryStore::with_accounts(vec![
        account(1, "ada.admin", "Ada Admin", Role::Admin, true)?,
        account(2, "dr.grey", "Meredith Grey", Role::Doctor, true)?,
        account(3, "nurse.joy", "Joy", Role::Nurse, true)?,
        account(4, "rita.desk", "Rita", Role::Receptionist, true)?,
        account(5, "former.nurse", "Former Nurse", Role::Nurse, false)?,
    ]);

    let mut config = AppConfig::development();
    config.security.jwt_secret = SECRET.to_string();
    config.security.token_ttl_secs = TOKEN_TTL_SECS;
    config.security.password_hash_cost = HASH_COST;

    let credentials: Arc<dyn CredentialStore> = Arc::new(store.clone());
    let records: Arc<dyn RecordStore> = Arc::new(store.clone());
    let state = AppState::build(config, credentials, records)?;

    Ok(TestApp {
        router: app(Arc::new(state)),
        store,
    })
}

pub async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))?,
        None => builder.body(Body::empty())?,
    };

    let response = app.router.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).with_context(|| format!("non-JSON body for {}", uri))?
    };
    Ok((status, json))
}

/// Log in and return the bearer token.
pub async fn login(app: &TestApp, username: &str) -> Result<String> {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(serde_json::json!({ "username": username, "password": PASSWORD })),
    )
    .await?;
    anyhow::ensure!(status == StatusCode::OK, "login for {} failed: {} {}", username, status, body);

    body["data"]["access_token"]
        .as_str()
        .map(str::to_string)
        .context("login response has no access_token")
}
