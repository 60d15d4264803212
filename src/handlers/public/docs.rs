// handlers/public/docs.rs - GET /docs and GET /docs/:area

use axum::extract::Path;
use serde::Serialize;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RouteDoc {
    pub method: &'static str,
    pub path: &'static str,
    pub roles: &'static str,
    pub summary: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AreaDoc {
    pub area: &'static str,
    pub description: &'static str,
    pub routes: &'static [RouteDoc],
}

const fn route(method: &'static str, path: &'static str, roles: &'static str, summary: &'static str) -> RouteDoc {
    RouteDoc {
        method,
        path,
        roles,
        summary,
    }
}

const AREAS: &[AreaDoc] = &[
    AreaDoc {
        area: "auth",
        description: "Token acquisition and identity introspection. Send tokens as `Authorization: Bearer <token>`.",
        routes: &[
            route("POST", "/api/auth/login", "public", "Exchange username and password for a bearer token"),
            route("GET", "/api/auth/whoami", "any authenticated", "Show the principal resolved from the token"),
        ],
    },
    AreaDoc {
        area: "records",
        description: "Clinical and administrative records. Kinds: patients, visits, encounters, observations, shifts.",
        routes: &[
            route("GET", "/api/records/:kind", "DOCTOR, NURSE, RECEPTIONIST", "List records of one kind"),
            route("POST", "/api/records/:kind", "per kind", "Create a record from {\"fields\": {...}}"),
            route("GET", "/api/records/:kind/:id", "DOCTOR, NURSE, RECEPTIONIST", "Fetch one record"),
            route(
                "PATCH",
                "/api/records/:kind/:id",
                "per kind",
                "Change fields with {\"fields\": {...}, \"reason\": \"...\"}",
            ),
            route("POST", "/api/records/:kind/:id/activate", "per kind", "Reactivate a record"),
            route("POST", "/api/records/:kind/:id/deactivate", "per kind", "Deactivate a record"),
            route("DELETE", "/api/records/:kind/:id", "per kind", "Soft-delete a record"),
        ],
    },
    AreaDoc {
        area: "audit",
        description: "Immutable field-level change history, most recent first.",
        routes: &[route(
            "GET",
            "/api/audit/:kind/:id",
            "ADMIN, DOCTOR",
            "History of one record",
        )],
    },
    AreaDoc {
        area: "admin",
        description: "Administration endpoints.",
        routes: &[route(
            "GET",
            "/api/admin/access-rules",
            "ADMIN",
            "The ordered access table in evaluation order",
        )],
    },
];

/// GET /docs - List documentation areas
pub async fn docs_index() -> ApiResponse<Vec<&'static str>> {
    ApiResponse::success(AREAS.iter().map(|area| area.area).collect())
}

/// GET /docs/:area - Routes and required roles for one area
pub async fn docs_area(Path(area): Path<String>) -> ApiResult<&'static AreaDoc> {
    AREAS
        .iter()
        .find(|doc| doc.area == area)
        .map(ApiResponse::success)
        .ok_or_else(|| ApiError::not_found(format!("No documentation for '{}'", area)))
}
