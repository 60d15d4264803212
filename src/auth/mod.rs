// Stateless identity: token codec, bearer resolution, credential checks.

pub mod claims;
pub mod credentials;
pub mod error;
pub mod identity;
pub mod token;

pub use claims::{Claims, Principal, Role, TokenSubject};
pub use credentials::{hash_password, CredentialError, CredentialVerifier, LoginGrant};
pub use error::AuthError;
pub use identity::{bearer_token, IdentityResolver};
pub use token::{fingerprint, IssuedToken, TokenCodec};
