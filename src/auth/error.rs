use thiserror::Error;

/// Identity and authorization failures.
///
/// Variants stay distinct so server-side logs can tell them apart; the HTTP
/// layer collapses every unauthenticated kind into the same 401 answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("credentials did not match a known active account")]
    CredentialMismatch,

    #[error("no bearer credentials presented")]
    TokenMissing,

    #[error("token failed signature or structure validation: {0}")]
    TokenMalformed(String),

    #[error("token expired")]
    TokenExpired,

    #[error("principal role is not permitted for this route")]
    InsufficientRole,

    #[error("token codec failure: {0}")]
    Internal(String),
}

impl AuthError {
    /// True for every failure that is answered as "not authenticated".
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            AuthError::CredentialMismatch
                | AuthError::TokenMissing
                | AuthError::TokenMalformed(_)
                | AuthError::TokenExpired
        )
    }

    /// Stable label for structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::CredentialMismatch => "credential_mismatch",
            AuthError::TokenMissing => "token_missing",
            AuthError::TokenMalformed(_) => "token_malformed",
            AuthError::TokenExpired => "token_expired",
            AuthError::InsufficientRole => "insufficient_role",
            AuthError::Internal(_) => "internal",
        }
    }
}
