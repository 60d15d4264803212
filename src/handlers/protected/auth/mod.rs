// handlers/protected/auth/mod.rs - Identity introspection for authenticated callers

pub mod whoami; // GET /api/auth/whoami - principal resolved from the token

pub use whoami::whoami_get;
