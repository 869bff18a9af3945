// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Route Prefix: /api/*
// Middleware: jwt_auth_middleware injects AuthUser
pub mod auth;     // Current account
pub mod data;     // Entity CRUD through registry collections
pub mod describe; // Compiled schema inspection
pub mod find;     // Filtered finds with a FilterData body
