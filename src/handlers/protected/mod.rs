// handlers/protected/mod.rs - Protected handlers (bearer token required)
//
// Every route here sits behind the gate: by the time a handler runs, the
// caller's role has already been checked against the access table, and the
// principal is available through `CurrentPrincipal`.

pub mod admin; // Administration (ADMIN)
pub mod audit; // Change history
pub mod auth; // Identity introspection
pub mod records; // Record CRUD with audit trail
