// handlers/protected/audit/mod.rs - Audit history read surface

pub mod history; // GET /api/audit/:kind/:id - most recent first

pub use history::history_get;
