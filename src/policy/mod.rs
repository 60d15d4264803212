// Route access policy: one ordered rule table, one evaluation function.

pub mod engine;
pub mod rule;

pub use engine::{AccessPolicy, Evaluation};
pub use rule::{AccessRule, Decision, MethodPattern, PathPattern, PolicyError, Requirement, RuleSpec};
