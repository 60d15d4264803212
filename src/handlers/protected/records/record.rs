// handlers/protected/records/record.rs - GET, PATCH, DELETE /api/records/:kind/:id and status toggles

use std::sync::Arc;

use axum::extract::{rejection::JsonRejection, Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{parse_id, parse_kind, ReasonQuery};
use crate::app::AppState;
use crate::database::ClinicalRecord;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentPrincipal};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateRecord {
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// GET /api/records/:kind/:id - Fetch one live record
pub async fn record_get(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, String)>,
) -> ApiResult<ClinicalRecord> {
    let kind = parse_kind(&kind)?;
    let id = parse_id(&id)?;
    Ok(ApiResponse::success(state.records.get(kind, id).await?))
}

/// PATCH /api/records/:kind/:id - Change some fields
///
/// Expected Input:
/// ```json
/// { "fields": { "phone": "555-0199" }, "reason": "patient moved" }
/// ```
///
/// Fields left out keep their value; `null` clears a field. One UPDATE audit
/// row is written per changed field.
pub async fn record_patch(
    State(state): State<Arc<AppState>>,
    CurrentPrincipal(actor): CurrentPrincipal,
    Path((kind, id)): Path<(String, String)>,
    body: Result<Json<UpdateRecord>, JsonRejection>,
) -> ApiResult<ClinicalRecord> {
    let kind = parse_kind(&kind)?;
    let id = parse_id(&id)?;
    let Json(body) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let record = state
        .records
        .update(kind, id, body.fields, body.reason.as_deref(), &actor)
        .await?;
    Ok(ApiResponse::success(record))
}

/// POST /api/records/:kind/:id/activate[?reason=...]
pub async fn record_activate(
    State(state): State<Arc<AppState>>,
    CurrentPrincipal(actor): CurrentPrincipal,
    Path((kind, id)): Path<(String, String)>,
    Query(query): Query<ReasonQuery>,
) -> ApiResult<ClinicalRecord> {
    set_active(&state, &actor, &kind, &id, true, query.reason.as_deref()).await
}

/// POST /api/records/:kind/:id/deactivate[?reason=...]
pub async fn record_deactivate(
    State(state): State<Arc<AppState>>,
    CurrentPrincipal(actor): CurrentPrincipal,
    Path((kind, id)): Path<(String, String)>,
    Query(query): Query<ReasonQuery>,
) -> ApiResult<ClinicalRecord> {
    set_active(&state, &actor, &kind, &id, false, query.reason.as_deref()).await
}

/// DELETE /api/records/:kind/:id[?reason=...] - Soft delete
pub async fn record_delete(
    State(state): State<Arc<AppState>>,
    CurrentPrincipal(actor): CurrentPrincipal,
    Path((kind, id)): Path<(String, String)>,
    Query(query): Query<ReasonQuery>,
) -> ApiResult<ClinicalRecord> {
    let kind = parse_kind(&kind)?;
    let id = parse_id(&id)?;

    let record = state
        .records
        .delete(kind, id, query.reason.as_deref(), &actor)
        .await?;
    Ok(ApiResponse::success(record))
}

async fn set_active(
    state: &AppState,
    actor: &crate::auth::Principal,
    kind: &str,
    id: &str,
    active: bool,
    reason: Option<&str>,
) -> ApiResult<ClinicalRecord> {
    let kind = parse_kind(kind)?;
    let id = parse_id(id)?;

    let record = state.records.set_active(kind, id, active, reason, actor).await?;
    Ok(ApiResponse::success(record))
}
