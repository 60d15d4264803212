use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::claims::Principal;
use super::error::AuthError;
use super::token::TokenCodec;

const BEARER_PREFIX: &str = "Bearer ";

/// Turns a raw `Authorization` header into a [`Principal`].
///
/// Pure over (header, signing key): no I/O and no shared mutable state.
#[derive(Clone)]
pub struct IdentityResolver {
    codec: Arc<TokenCodec>,
}

impl IdentityResolver {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }

    pub fn resolve(&self, authorization: Option<&str>) -> Result<Principal, AuthError> {
        self.resolve_at(authorization, Utc::now())
    }

    pub fn resolve_at(
        &self,
        authorization: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Principal, AuthError> {
        let token = bearer_token(authorization)?;
        let claims = self.codec.decode_at(token, now)?;
        Principal::try_from(claims).map_err(AuthError::TokenMalformed)
    }
}

/// Extract the token from a `Bearer <token>` header value.
///
/// The scheme is matched case-sensitively. Missing headers, other schemes,
/// empty tokens and tokens containing whitespace all count as no credentials.
pub fn bearer_token(authorization: Option<&str>) -> Result<&str, AuthError> {
    let token = authorization
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .ok_or(AuthError::TokenMissing)?;

    if token.is_empty() || token.chars().any(char::is_whitespace) {
        return Err(AuthError::TokenMissing);
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::{Role, TokenSubject};
    use chrono::TimeZone;
    use std::time::Duration;

    fn resolver() -> (IdentityResolver, Arc<TokenCodec>) {
        let codec = Arc::new(TokenCodec::new(b"identity-resolver-test-signing-key!!").unwrap());
        (IdentityResolver::new(codec.clone()), codec)
    }

    fn nurse_token(codec: &TokenCodec, iat: i64) -> String {
        let subject = TokenSubject {
            subject_id: 3,
            display_name: "Nils Nurse".to_string(),
            role: Role::Nurse,
        };
        codec
            .issue_at(&subject, Duration::from_secs(300), Utc.timestamp_opt(iat, 0).unwrap())
            .unwrap()
            .token
    }

    #[test]
    fn resolves_valid_bearer_header() {
        let (resolver, codec) = resolver();
        let header = format!("Bearer {}", nurse_token(&codec, 1_000));
        let principal = resolver
            .resolve_at(Some(&header), Utc.timestamp_opt(1_100, 0).unwrap())
            .unwrap();

        assert_eq!(principal.subject_id, 3);
        assert_eq!(principal.display_name, "Nils Nurse");
        assert_eq!(principal.role, Role::Nurse);
        assert_eq!(principal.expires_at.timestamp(), 1_300);
    }

    #[test]
    fn header_shape_failures_are_missing_credentials() {
        let (resolver, codec) = resolver();
        let token = nurse_token(&codec, 1_000);
        let now = Utc.timestamp_opt(1_100, 0).unwrap();

        let bad_headers = [
            None,
            Some(String::new()),
            Some("Bearer".to_string()),
            Some("Bearer ".to_string()),
            Some(format!("bearer {}", token)),
            Some(format!("BEARER {}", token)),
            Some(format!("Basic {}", token)),
            Some(format!("Bearer  {}", token)),
            Some(format!("Bearer {} extra", token)),
            Some(token.clone()),
        ];

        for header in bad_headers {
            assert_eq!(
                resolver.resolve_at(header.as_deref(), now),
                Err(AuthError::TokenMissing),
                "header {:?}",
                header
            );
        }
    }

    #[test]
    fn expired_and_forged_tokens_keep_their_kind() {
        let (resolver, codec) = resolver();
        let header = format!("Bearer {}", nurse_token(&codec, 1_000));

        assert_eq!(
            resolver.resolve_at(Some(&header), Utc.timestamp_opt(9_999, 0).unwrap()),
            Err(AuthError::TokenExpired)
        );
        assert!(matches!(
            resolver.resolve_at(Some("Bearer not.a.token"), Utc.timestamp_opt(1_100, 0).unwrap()),
            Err(AuthError::TokenMalformed(_))
        ));
    }
}
