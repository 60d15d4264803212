// handlers/protected/admin/access_rules.rs - GET /api/admin/access-rules

use std::sync::Arc;

use axum::extract::State;

use crate::app::AppState;
use crate::middleware::ApiResponse;
use crate::policy::AccessRule;

/// GET /api/admin/access-rules - The access table in evaluation order
pub async fn access_rules_get(State(state): State<Arc<AppState>>) -> ApiResponse<Vec<AccessRule>> {
    ApiResponse::success(state.policy.rules().to_vec())
}
