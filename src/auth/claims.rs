use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Staff roles. Roles are flat: no role implies another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Doctor,
    Nurse,
    Receptionist,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Doctor, Role::Nurse, Role::Receptionist];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Doctor => "DOCTOR",
            Role::Nurse => "NURSE",
            Role::Receptionist => "RECEPTIONIST",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("unknown role '{}'", s))
    }
}

/// Identity fields a token is issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub subject_id: i64,
    pub display_name: String,
    pub role: Role,
}

/// JWT claims carried inside every access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Claims {
    /// Numeric staff account id
    pub sub: i64,
    /// Display name of the subject
    pub name: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(subject: &TokenSubject, iat: i64, exp: i64) -> Self {
        Self {
            sub: subject.subject_id,
            name: subject.display_name.clone(),
            role: subject.role,
            iat,
            exp,
        }
    }
}

/// Resolved caller identity for one request.
///
/// Built only from validated claims and dropped with the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub subject_id: i64,
    pub display_name: String,
    pub role: Role,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TryFrom<Claims> for Principal {
    type Error = String;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let issued_at = timestamp(claims.iat).ok_or("iat out of range")?;
        let expires_at = timestamp(claims.exp).ok_or("exp out of range")?;
        Ok(Self {
            subject_id: claims.sub,
            display_name: claims.name,
            role: claims.role,
            issued_at,
            expires_at,
        })
    }
}

fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_wire_name() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.as_str()));
        }
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn claims_reject_unknown_role() {
        let raw = r#"{"sub":1,"name":"x","role":"SUPERUSER","iat":1,"exp":2}"#;
        assert!(serde_json::from_str::<Claims>(raw).is_err());
    }

    #[test]
    fn principal_from_claims() {
        let subject = TokenSubject {
            subject_id: 42,
            display_name: "Nora Nurse".to_string(),
            role: Role::Nurse,
        };
        let principal = Principal::try_from(Claims::new(&subject, 1_700_000_000, 1_700_003_600)).unwrap();
        assert_eq!(principal.subject_id, 42);
        assert_eq!(principal.role, Role::Nurse);
        assert_eq!(principal.expires_at.timestamp() - principal.issued_at.timestamp(), 3600);
    }
}
