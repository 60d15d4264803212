// handlers/protected/auth/whoami.rs - GET /api/auth/whoami handler

use crate::auth::Principal;
use crate::middleware::{ApiResponse, CurrentPrincipal};

/// GET /api/auth/whoami - The principal resolved from the bearer token
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": {
///     "subject_id": 7,
///     "display_name": "Joy",
///     "role": "NURSE",
///     "issued_at": "2025-01-01T08:00:00Z",
///     "expires_at": "2025-01-01T16:00:00Z"
///   }
/// }
/// ```
pub async fn whoami_get(CurrentPrincipal(principal): CurrentPrincipal) -> ApiResponse<Principal> {
    ApiResponse::success(principal)
}
