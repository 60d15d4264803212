// handlers/mod.rs - Route handlers, split by security tier
//
// Public (no token) and protected (token + role, per the access table).
// The tiers only organise code; enforcement lives in the gate middleware.

pub mod protected;
pub mod public;
