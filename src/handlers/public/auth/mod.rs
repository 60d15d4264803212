// handlers/public/auth/mod.rs - Token acquisition endpoints (no authentication)

pub mod login; // POST /api/auth/login - authenticate and get a bearer token

pub use login::login_post;
