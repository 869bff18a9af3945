// handlers/mod.rs - Handler tiers
//
// Public (no auth) → Protected (JWT auth). Every handler receives the
// registry through an `Extension<Arc<Registry>>` layer.
pub mod public;    // No authentication required (/, /health, /auth/*)
pub mod protected; // JWT authentication required (/api/*)
