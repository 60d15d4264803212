use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::{bearer_token, fingerprint, AuthError, Principal};
use crate::error::ApiError;
use crate::policy::Decision;

/// Identity and role gate run in front of every route.
///
/// CORS preflights pass untouched. Every other request is resolved to an
/// optional [`Principal`] and checked against the access table. Allowed
/// requests carry the principal (when there is one) as a request extension.
pub async fn authenticate(State(state): State<Arc<AppState>>, mut request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .map(|value| value.to_str().unwrap_or_default());

    let identity = state.resolver.resolve(header);
    let token_fingerprint = bearer_token(header).ok().map(fingerprint);

    let evaluation = state.policy.evaluate(&method, &path, identity.as_ref().ok());
    let failure = match evaluation.decision {
        Decision::Allow => None,
        Decision::Unauthenticated => Some(identity.as_ref().err().cloned().unwrap_or(AuthError::TokenMissing)),
        Decision::Forbidden => Some(AuthError::InsufficientRole),
    };

    if let Some(error) = failure {
        let principal = identity.as_ref().ok();
        tracing::warn!(
            request_id = %Uuid::new_v4(),
            method = %method,
            path = %path,
            subject_id = principal.map(|p| p.subject_id),
            role = principal.map(|p| p.role.as_str()),
            rule = evaluation.rule.map(|r| r.to_string()),
            error_kind = error.kind(),
            detail = %error,
            token = token_fingerprint.as_deref(),
            "request denied"
        );
        return ApiError::from(error).into_response();
    }

    if let Ok(principal) = identity {
        tracing::debug!(
            subject_id = principal.subject_id,
            role = %principal.role,
            path = %path,
            "request authenticated"
        );
        request.extensions_mut().insert(principal);
    }

    next.run(request).await
}

/// The caller's principal, as attached by [`authenticate`].
///
/// Rejects with 401 when the route let the request through without one.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentPrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(CurrentPrincipal)
            .ok_or_else(|| ApiError::from(AuthError::TokenMissing))
    }
}
