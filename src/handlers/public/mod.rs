// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition and service status. No /api prefix.
pub mod auth;
pub mod system;
