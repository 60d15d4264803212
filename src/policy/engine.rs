use std::path::Path;

use axum::http::Method;

use super::rule::{AccessRule, Decision, PolicyError, Requirement, RuleSpec};
use crate::auth::Principal;

// Built-in clinic table; operators can replace it with their own file.
const CLINIC_RULES: &str = include_str!("clinic_rules.yaml");

/// Result of one evaluation, with the rule that decided it (if any).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation<'a> {
    pub decision: Decision,
    pub rule: Option<&'a AccessRule>,
}

impl Evaluation<'_> {
    /// True when the deciding rule lets anyone through.
    pub fn is_public(&self) -> bool {
        self.rule.map(|rule| rule.requirement.is_public()).unwrap_or(false)
    }
}

/// Ordered, immutable access table. The first matching rule decides.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    rules: Vec<AccessRule>,
}

impl AccessPolicy {
    pub fn new(mut rules: Vec<AccessRule>) -> Self {
        for (index, rule) in rules.iter_mut().enumerate() {
            rule.order = index;
        }
        Self { rules }
    }

    pub fn from_specs(specs: Vec<RuleSpec>) -> Result<Self, PolicyError> {
        let rules = specs
            .into_iter()
            .enumerate()
            .map(|(index, spec)| spec.compile(index))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rules))
    }

    pub fn from_yaml(source: &str) -> Result<Self, PolicyError> {
        let specs: Vec<RuleSpec> = serde_yaml::from_str(source)?;
        Self::from_specs(specs)
    }

    pub fn from_file(path: &Path) -> Result<Self, PolicyError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_yaml(&source)
    }

    pub fn clinic_default() -> Result<Self, PolicyError> {
        Self::from_yaml(CLINIC_RULES)
    }

    pub fn rules(&self) -> &[AccessRule] {
        &self.rules
    }

    pub fn evaluate(&self, method: &Method, path: &str, principal: Option<&Principal>) -> Evaluation<'_> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        // Dot and percent-encoded segments may resolve to another route once
        // the router normalises or decodes them; refuse rather than guess.
        if segments.iter().any(|s| is_ambiguous(s)) {
            let decision = match principal {
                Some(_) => Decision::Forbidden,
                None => Decision::Unauthenticated,
            };
            return Evaluation { decision, rule: None };
        }

        match self.rules.iter().find(|rule| rule.matches(method, &segments)) {
            Some(rule) => Evaluation {
                decision: rule.requirement.decide(principal),
                rule: Some(rule),
            },
            None => Evaluation {
                decision: Requirement::Authenticated.decide(principal),
                rule: None,
            },
        }
    }
}

fn is_ambiguous(segment: &str) -> bool {
    segment == "." || segment == ".." || segment.contains('%')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use chrono::Utc;

    fn principal(role: Role) -> Principal {
        Principal {
            subject_id: 1,
            display_name: "test".to_string(),
            role,
            issued_at: Utc::now(),
            expires_at: Utc::now(),
        }
    }

    fn decide(policy: &AccessPolicy, method: Method, path: &str, role: Option<Role>) -> Decision {
        let principal = role.map(principal);
        policy.evaluate(&method, path, principal.as_ref()).decision
    }

    #[test]
    fn declaration_order_beats_specificity() {
        // The broad rule is declared first, so the narrower one never fires.
        let policy = AccessPolicy::from_yaml(
            r#"
- path: /api/wards/*
  roles: [DOCTOR]
- path: /api/wards/icu/*
  roles: [NURSE]
"#,
        )
        .unwrap();

        assert_eq!(decide(&policy, Method::GET, "/api/wards/icu/beds", Some(Role::Doctor)), Decision::Allow);
        assert_eq!(decide(&policy, Method::GET, "/api/wards/icu/beds", Some(Role::Nurse)), Decision::Forbidden);

        let evaluation = policy.evaluate(&Method::GET, "/api/wards/icu/beds", None);
        assert_eq!(evaluation.rule.map(|r| r.order), Some(0));
        assert_eq!(evaluation.decision, Decision::Unauthenticated);
    }

    #[test]
    fn method_specific_override_declared_first() {
        let policy = AccessPolicy::from_yaml(
            r#"
- method: GET
  path: /api/shifts/*
- path: /api/shifts/*
  roles: [ADMIN]
"#,
        )
        .unwrap();

        assert_eq!(decide(&policy, Method::GET, "/api/shifts/4", Some(Role::Nurse)), Decision::Allow);
        assert_eq!(decide(&policy, Method::PUT, "/api/shifts/4", Some(Role::Nurse)), Decision::Forbidden);
        assert_eq!(decide(&policy, Method::PUT, "/api/shifts/4", Some(Role::Admin)), Decision::Allow);
    }

    #[test]
    fn no_implicit_role_hierarchy() {
        let policy = AccessPolicy::clinic_default().unwrap();
        assert_eq!(decide(&policy, Method::GET, "/api/records/patients", Some(Role::Admin)), Decision::Forbidden);
        assert_eq!(decide(&policy, Method::POST, "/api/records/observations", Some(Role::Doctor)), Decision::Forbidden);
        assert_eq!(decide(&policy, Method::POST, "/api/records/observations", Some(Role::Nurse)), Decision::Allow);
    }

    #[test]
    fn unmatched_routes_need_any_identity() {
        let policy = AccessPolicy::clinic_default().unwrap();
        assert_eq!(decide(&policy, Method::GET, "/api/auth/whoami", None), Decision::Unauthenticated);
        for role in Role::ALL {
            assert_eq!(decide(&policy, Method::GET, "/api/auth/whoami", Some(role)), Decision::Allow);
        }

        let empty = AccessPolicy::new(vec![]);
        assert_eq!(decide(&empty, Method::DELETE, "/anything", None), Decision::Unauthenticated);
    }

    #[test]
    fn public_routes_ignore_identity() {
        let policy = AccessPolicy::clinic_default().unwrap();
        for path in ["/api/auth/login"] {
            assert_eq!(decide(&policy, Method::POST, path, None), Decision::Allow);
        }
        for path in ["/", "/health", "/docs", "/docs/records"] {
            let evaluation = policy.evaluate(&Method::GET, path, None);
            assert_eq!(evaluation.decision, Decision::Allow, "{}", path);
            assert!(evaluation.is_public());
        }
        // Docs are GET-only
        assert_eq!(decide(&policy, Method::POST, "/docs", None), Decision::Unauthenticated);
    }

    #[test]
    fn admin_group_is_admin_only() {
        let policy = AccessPolicy::clinic_default().unwrap();
        assert_eq!(decide(&policy, Method::GET, "/api/admin/access-rules", Some(Role::Admin)), Decision::Allow);
        for role in [Role::Doctor, Role::Nurse, Role::Receptionist] {
            assert_eq!(decide(&policy, Method::GET, "/api/admin/access-rules", Some(role)), Decision::Forbidden);
        }
        assert_eq!(decide(&policy, Method::GET, "/api/admin/access-rules", None), Decision::Unauthenticated);
    }

    #[test]
    fn clinical_read_wider_than_write() {
        let policy = AccessPolicy::clinic_default().unwrap();
        assert_eq!(decide(&policy, Method::GET, "/api/records/patients/5", Some(Role::Receptionist)), Decision::Allow);
        assert_eq!(decide(&policy, Method::GET, "/api/records/encounters/5", Some(Role::Receptionist)), Decision::Forbidden);
        assert_eq!(decide(&policy, Method::PATCH, "/api/records/encounters/5", Some(Role::Nurse)), Decision::Forbidden);
        assert_eq!(decide(&policy, Method::PATCH, "/api/records/encounters/5", Some(Role::Doctor)), Decision::Allow);
        assert_eq!(decide(&policy, Method::POST, "/api/records/visits", Some(Role::Receptionist)), Decision::Allow);
    }

    #[test]
    fn dot_segments_are_denied() {
        let policy = AccessPolicy::clinic_default().unwrap();
        assert_eq!(decide(&policy, Method::GET, "/docs/../api/admin/access-rules", None), Decision::Unauthenticated);
        assert_eq!(decide(&policy, Method::GET, "/api/./admin", None), Decision::Unauthenticated);
        assert_eq!(decide(&policy, Method::GET, "/api/./admin", Some(Role::Admin)), Decision::Forbidden);
    }

    #[test]
    fn encoded_segments_never_reach_a_rule() {
        let policy = AccessPolicy::clinic_default().unwrap();
        for (method, path, role) in [
            (Method::GET, "/api/records/%65ncounters", Role::Receptionist),
            (Method::POST, "/api/records/%6fbservations", Role::Doctor),
            (Method::GET, "/api/records/patients/%31", Role::Nurse),
            (Method::GET, "/docs/%2e%2e/api/admin/access-rules", Role::Admin),
        ] {
            let evaluation = policy.evaluate(&method, path, Some(&principal(role)));
            assert_eq!(evaluation.decision, Decision::Forbidden, "{} {}", method, path);
            assert!(evaluation.rule.is_none());
            assert_eq!(decide(&policy, method, path, None), Decision::Unauthenticated);
        }
    }

    #[test]
    fn evaluation_is_deterministic() {
        let policy = AccessPolicy::clinic_default().unwrap();
        let nurse = principal(Role::Nurse);
        let first = policy.evaluate(&Method::GET, "/api/records/visits", Some(&nurse));
        for _ in 0..100 {
            assert_eq!(policy.evaluate(&Method::GET, "/api/records/visits", Some(&nurse)), first);
        }
    }

    #[test]
    fn clinic_table_orders_are_sequential() {
        let policy = AccessPolicy::clinic_default().unwrap();
        for (index, rule) in policy.rules().iter().enumerate() {
            assert_eq!(rule.order, index);
        }
    }

    #[test]
    fn rejects_invalid_yaml_rules() {
        assert!(AccessPolicy::from_yaml("- path: /x\n  roles: [WIZARD]\n").is_err());
        assert!(AccessPolicy::from_yaml("- path: /x/*/y\n").is_err());
        assert!(AccessPolicy::from_yaml("- path: /x\n  verb: GET\n").is_err());
    }
}
