use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::claims::{Principal, TokenSubject};
use super::error::AuthError;
use super::token::{IssuedToken, TokenCodec};
use crate::database::{CredentialStore, DatabaseError};

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] DatabaseError),
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginGrant {
    pub token: IssuedToken,
    pub principal: Principal,
    pub password_change_required: bool,
}

/// Checks username/password pairs and issues access tokens.
pub struct CredentialVerifier {
    store: Arc<dyn CredentialStore>,
    codec: Arc<TokenCodec>,
    ttl: Duration,
    // Verified for unknown users so both failure paths cost one bcrypt run.
    dummy_hash: String,
}

impl CredentialVerifier {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        codec: Arc<TokenCodec>,
        ttl: Duration,
        hash_cost: u32,
    ) -> Result<Self, AuthError> {
        let dummy_hash = bcrypt::hash("ward-api-unknown-account", hash_cost)
            .map_err(|e| AuthError::Internal(format!("cannot prepare password hasher: {}", e)))?;

        Ok(Self {
            store,
            codec,
            ttl,
            dummy_hash,
        })
    }

    pub fn token_ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn verify(&self, username: &str, password: &str) -> Result<LoginGrant, CredentialError> {
        let account = self.store.find_credential(username).await?;

        let (hash, usable) = match &account {
            Some(account) => (account.password_hash.clone(), account.active),
            None => (self.dummy_hash.clone(), false),
        };
        let matched = password_matches(password.to_owned(), hash).await;

        let account = match account {
            Some(account) if usable && matched => account,
            other => {
                tracing::warn!(
                    username = %username,
                    known_account = other.is_some(),
                    active = other.as_ref().map(|a| a.active),
                    "login rejected"
                );
                return Err(AuthError::CredentialMismatch.into());
            }
        };

        let subject = TokenSubject {
            subject_id: account.id,
            display_name: account.display_name.clone(),
            role: account.role,
        };
        let token = self.codec.issue(&subject, self.ttl)?;
        let principal = Principal::try_from(token.claims.clone()).map_err(AuthError::Internal)?;

        tracing::info!(
            subject_id = account.id,
            role = %account.role,
            expires_in = token.expires_in,
            "login succeeded"
        );

        Ok(LoginGrant {
            token,
            principal,
            password_change_required: account.password_change_required,
        })
    }
}

/// Hash a password at the given bcrypt cost.
pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    bcrypt::hash(password, cost).map_err(|e| AuthError::Internal(format!("password hashing failed: {}", e)))
}

async fn password_matches(password: String, hash: String) -> bool {
    let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await;
    match outcome {
        Ok(Ok(matched)) => matched,
        Ok(Err(e)) => {
            tracing::error!("stored password hash is unreadable: {}", e);
            false
        }
        Err(e) => {
            tracing::error!("password verification task failed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::Role;
    use crate::database::memory::MemoryStore;
    use crate::database::models::StaffCredential;

    const COST: u32 = 4;

    fn account(id: i64, username: &str, password: &str, active: bool) -> StaffCredential {
        StaffCredential {
            id,
            username: username.to_string(),
            display_name: format!("{} display", username),
            role: Role::Nurse,
            password_hash: hash_password(password, COST).unwrap(),
            password_change_required: id == 2,
            active,
        }
    }

    fn verifier() -> (CredentialVerifier, Arc<TokenCodec>) {
        let store = MemoryStore::with_accounts(vec![
            account(1, "nora", "correct horse", true),
            account(2, "newbie", "first-login", true),
            account(3, "gone", "retired", false),
        ]);
        let codec = Arc::new(TokenCodec::new(b"credential-verifier-test-signing-key").unwrap());
        let verifier =
            CredentialVerifier::new(Arc::new(store), codec.clone(), Duration::from_secs(900), COST)
                .unwrap();
        (verifier, codec)
    }

    #[tokio::test]
    async fn issues_token_for_valid_credentials() {
        let (verifier, codec) = verifier();
        let grant = verifier.verify("nora", "correct horse").await.unwrap();

        assert_eq!(grant.principal.subject_id, 1);
        assert_eq!(grant.principal.role, Role::Nurse);
        assert_eq!(grant.token.expires_in, 900);
        assert!(!grant.password_change_required);

        let claims = codec.decode(&grant.token.token).unwrap();
        assert_eq!(claims.sub, 1);
        assert_eq!(claims.name, "nora display");
    }

    #[tokio::test]
    async fn reports_pending_password_change() {
        let (verifier, _) = verifier();
        let grant = verifier.verify("newbie", "first-login").await.unwrap();
        assert!(grant.password_change_required);
    }

    #[tokio::test]
    async fn unknown_user_and_wrong_password_are_indistinguishable() {
        let (verifier, _) = verifier();

        let unknown = verifier.verify("nobody", "correct horse").await.unwrap_err();
        let wrong = verifier.verify("nora", "wrong horse").await.unwrap_err();
        let inactive = verifier.verify("gone", "retired").await.unwrap_err();

        for err in [unknown, wrong, inactive] {
            match err {
                CredentialError::Auth(auth) => assert_eq!(auth, AuthError::CredentialMismatch),
                other => panic!("unexpected error {:?}", other),
            }
        }
    }
}
