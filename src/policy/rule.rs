use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use axum::http::Method;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::auth::{Principal, Role};

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("rule {index}: invalid method pattern '{value}'")]
    InvalidMethod { index: usize, value: String },

    #[error("rule {index}: invalid path pattern '{value}': {reason}")]
    InvalidPath {
        index: usize,
        value: String,
        reason: &'static str,
    },

    #[error("rule {index}: a public rule cannot list required roles")]
    PublicWithRoles { index: usize },

    #[error("cannot parse access rules: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("cannot read access rules file: {0}")]
    Io(#[from] std::io::Error),
}

/// Which HTTP methods a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodPattern {
    Any,
    Exact(Method),
}

impl MethodPattern {
    pub fn matches(&self, method: &Method) -> bool {
        match self {
            MethodPattern::Any => true,
            MethodPattern::Exact(expected) => expected == method,
        }
    }
}

impl FromStr for MethodPattern {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "*" {
            return Ok(MethodPattern::Any);
        }
        // Methods are matched exactly, so only canonical upper-case names are accepted
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(());
        }
        Method::from_bytes(s.as_bytes()).map(MethodPattern::Exact).map_err(|_| ())
    }
}

impl fmt::Display for MethodPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodPattern::Any => f.write_str("*"),
            MethodPattern::Exact(method) => f.write_str(method.as_str()),
        }
    }
}

/// Literal path segments, optionally ending in a single `*` segment.
///
/// A trailing `*` matches the prefix itself and every path below it, so
/// `/docs/*` covers `/docs`, `/docs/auth` and `/docs/auth/login`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<String>,
    wildcard: bool,
}

impl PathPattern {
    pub fn parse(raw: &str) -> Result<Self, &'static str> {
        if !raw.starts_with('/') {
            return Err("must start with '/'");
        }

        let mut segments: Vec<String> = raw
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let wildcard = segments.last().map(|s| s == "*").unwrap_or(false);
        if wildcard {
            segments.pop();
        }

        for segment in &segments {
            if segment.contains('*') {
                return Err("'*' is only allowed as the final segment");
            }
            if segment == "." || segment == ".." {
                return Err("dot segments are not allowed");
            }
        }

        Ok(Self { segments, wildcard })
    }

    pub fn matches(&self, path: &[&str]) -> bool {
        if self.wildcard {
            path.len() >= self.segments.len()
                && self.segments.iter().zip(path).all(|(expected, actual)| expected == actual)
        } else {
            path.len() == self.segments.len()
                && self.segments.iter().zip(path).all(|(expected, actual)| expected == actual)
        }
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        match (self.wildcard, self.segments.is_empty()) {
            (true, _) => f.write_str("/*"),
            (false, true) => f.write_str("/"),
            (false, false) => Ok(()),
        }
    }
}

/// What a matching rule demands of the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "roles", rename_all = "snake_case")]
pub enum Requirement {
    /// No identity needed
    Public,
    /// Any valid principal, whatever its role
    Authenticated,
    /// Principal role must be one of these, exactly
    AnyOf(BTreeSet<Role>),
}

/// Outcome of evaluating one request against the rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Unauthenticated,
    Forbidden,
}

impl Requirement {
    pub fn decide(&self, principal: Option<&Principal>) -> Decision {
        match (self, principal) {
            (Requirement::Public, _) => Decision::Allow,
            (_, None) => Decision::Unauthenticated,
            (Requirement::Authenticated, Some(_)) => Decision::Allow,
            (Requirement::AnyOf(roles), Some(principal)) => {
                if roles.contains(&principal.role) {
                    Decision::Allow
                } else {
                    Decision::Forbidden
                }
            }
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self, Requirement::Public)
    }
}

/// One entry of the ordered access table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessRule {
    pub order: usize,
    #[serde(serialize_with = "display")]
    pub method: MethodPattern,
    #[serde(serialize_with = "display")]
    pub path: PathPattern,
    pub requirement: Requirement,
}

impl AccessRule {
    pub fn matches(&self, method: &Method, path: &[&str]) -> bool {
        self.method.matches(method) && self.path.matches(path)
    }
}

impl fmt::Display for AccessRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} {}", self.order, self.method, self.path)
    }
}

fn display<T: fmt::Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Declarative form of a rule, as written in the rules YAML.
///
/// `roles` empty with `public: false` means any authenticated caller.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    #[serde(default = "any_method")]
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub roles: Vec<Role>,
}

fn any_method() -> String {
    "*".to_string()
}

impl RuleSpec {
    pub fn compile(self, index: usize) -> Result<AccessRule, PolicyError> {
        let method = self.method.parse().map_err(|_| PolicyError::InvalidMethod {
            index,
            value: self.method.clone(),
        })?;
        let path = PathPattern::parse(&self.path).map_err(|reason| PolicyError::InvalidPath {
            index,
            value: self.path.clone(),
            reason,
        })?;

        let requirement = match (self.public, self.roles.is_empty()) {
            (true, false) => return Err(PolicyError::PublicWithRoles { index }),
            (true, true) => Requirement::Public,
            (false, true) => Requirement::Authenticated,
            (false, false) => Requirement::AnyOf(self.roles.into_iter().collect()),
        };

        Ok(AccessRule {
            order: index,
            method,
            path,
            requirement,
        })
    }
}
