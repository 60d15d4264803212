// handlers/protected/admin/mod.rs - Administration endpoints (ADMIN only, per the access table)

pub mod access_rules; // GET /api/admin/access-rules - ordered rule table

pub use access_rules::access_rules_get;
