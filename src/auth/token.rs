use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sha2::{Digest, Sha256};

use super::claims::{Claims, TokenSubject};
use super::error::AuthError;

/// A freshly signed access token and the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
    pub expires_in: u64,
}

/// HS256 signer/verifier bound to the process-wide signing key.
///
/// Built once at startup and shared read-only; changing the key invalidates
/// every outstanding token.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::Internal("signing key is empty".to_string()));
        }

        // Expiry is checked against an explicit clock in `decode_at`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        })
    }

    pub fn issue(&self, subject: &TokenSubject, ttl: Duration) -> Result<IssuedToken, AuthError> {
        self.issue_at(subject, ttl, Utc::now())
    }

    pub fn issue_at(
        &self,
        subject: &TokenSubject,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let ttl_secs = i64::try_from(ttl.as_secs())
            .map_err(|_| AuthError::Internal("token ttl out of range".to_string()))?;
        let iat = now.timestamp();
        let exp = iat
            .checked_add(ttl_secs)
            .ok_or_else(|| AuthError::Internal("token expiry overflows".to_string()))?;

        let claims = Claims::new(subject, iat, exp);
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("token signing failed: {}", e)))?;

        Ok(IssuedToken {
            token,
            claims,
            expires_in: ttl.as_secs(),
        })
    }

    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        self.decode_at(token, Utc::now())
    }

    /// Verify signature and structure, then expiry against `now`.
    ///
    /// A token stays valid up to and including its `exp` second.
    pub fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AuthError::TokenMalformed(e.to_string()))?;
        let claims = data.claims;

        if claims.exp < claims.iat {
            return Err(AuthError::TokenMalformed("exp precedes iat".to_string()));
        }
        if now.timestamp() > claims.exp {
            return Err(AuthError::TokenExpired);
        }

        Ok(claims)
    }
}

/// Short SHA-256 fingerprint used to correlate a token in logs without
/// writing the token itself.
pub fn fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    hash[..12].to_string()
}
