// handlers/public/auth/login.rs - POST /api/auth/login handler

use std::sync::Arc;

use axum::extract::{rejection::JsonRejection, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::auth::Role;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    pub user: UserSummary,
    pub password_change_required: bool,
}

/// POST /api/auth/login - Exchange staff credentials for a bearer token
///
/// Expected Input:
/// ```json
/// { "username": "nurse.joy", "password": "..." }
/// ```
///
/// Expected Output (Success):
/// ```json
/// {
///   "success": true,
///   "data": {
///     "access_token": "eyJhbGciOiJIUzI1NiI...",
///     "token_type": "Bearer",
///     "expires_in": 28800,
///     "user": { "id": 7, "name": "Joy", "role": "NURSE" },
///     "password_change_required": false
///   }
/// }
/// ```
///
/// Unknown usernames, wrong passwords and disabled accounts all get the same
/// 401 answer.
pub async fn login_post(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let Json(request) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let grant = state
        .credentials
        .verify(&request.username, &request.password)
        .await?;

    Ok(ApiResponse::success(LoginResponse {
        access_token: grant.token.token,
        token_type: "Bearer",
        expires_in: grant.token.expires_in,
        user: UserSummary {
            id: grant.principal.subject_id,
            name: grant.principal.display_name,
            role: grant.principal.role,
        },
        password_change_required: grant.password_change_required,
    }))
}
