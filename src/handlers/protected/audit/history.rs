// handlers/protected/audit/history.rs - GET /api/audit/:kind/:id

use std::sync::Arc;

use axum::extract::{Path, State};

use crate::app::AppState;
use crate::audit::AuditEntry;
use crate::handlers::protected::records::{parse_id, parse_kind};
use crate::middleware::{ApiResponse, ApiResult};

/// GET /api/audit/:kind/:id - Change history of one record, most recent first
///
/// Deleted records still answer with their history.
pub async fn history_get(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, String)>,
) -> ApiResult<Vec<AuditEntry>> {
    let kind = parse_kind(&kind)?;
    let id = parse_id(&id)?;

    let history = state.records.history(kind, id).await?;
    Ok(ApiResponse::success(history))
}
