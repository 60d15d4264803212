// handlers/protected/records/collection.rs - GET, POST /api/records/:kind

use std::sync::Arc;

use axum::extract::{rejection::JsonRejection, Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::parse_kind;
use crate::app::AppState;
use crate::database::ClinicalRecord;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentPrincipal};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateRecord {
    pub fields: Map<String, Value>,
}

/// GET /api/records/:kind - All live records of one kind, by id
pub async fn collection_get(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> ApiResult<Vec<ClinicalRecord>> {
    let kind = parse_kind(&kind)?;
    Ok(ApiResponse::success(state.records.list(kind).await?))
}

/// POST /api/records/:kind - Create a record
///
/// Expected Input:
/// ```json
/// { "fields": { "full_name": "Ada Lovelace", "date_of_birth": "1815-12-10" } }
/// ```
///
/// Responds 201 with the stored record. One CREATE audit row is written per
/// populated field.
pub async fn collection_post(
    State(state): State<Arc<AppState>>,
    CurrentPrincipal(actor): CurrentPrincipal,
    Path(kind): Path<String>,
    body: Result<Json<CreateRecord>, JsonRejection>,
) -> ApiResult<ClinicalRecord> {
    let kind = parse_kind(&kind)?;
    let Json(body) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let record = state.records.create(kind, body.fields, &actor).await?;
    Ok(ApiResponse::created(record))
}
