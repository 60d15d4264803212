// handlers/public/mod.rs - Public handlers (no token required)
//
// The access table marks these routes public; the gate still attaches a
// principal when a valid token happens to be presented.

pub mod auth; // Token acquisition
pub mod docs; // API documentation
