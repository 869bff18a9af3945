//! HTTP router: public routes, then `/api/*` behind JWT authentication.

use axum::{
    middleware,
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config;
use crate::handlers::{protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::registry::Registry;

pub fn router(registry: Arc<Registry>) -> Router {
    let router = Router::new()
        // Public
        .route("/", get(public::system::root))
        .route("/health", get(public::system::health))
        .merge(auth_public_routes())
        // Protected
        .merge(protected_routes().route_layer(middleware::from_fn(jwt_auth_middleware)))
        // Global middleware
        .layer(Extension(registry))
        .layer(CorsLayer::permissive());

    if config::config().api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

fn auth_public_routes() -> Router {
    use public::auth;

    Router::new()
        .route("/auth/register", post(auth::register_post))
        .route("/auth/login", post(auth::login_post))
}

fn protected_routes() -> Router {
    use protected::{auth, data, describe, find};

    Router::new()
        .route("/api/auth/whoami", get(auth::whoami_get))
        // Compiled schemas
        .route("/api/schemas", get(describe::schema_list))
        .route("/api/schemas/:kind", get(describe::schema_get))
        // Collection-level operations
        .route("/api/entities/:kind", get(data::schema_get).post(data::schema_post))
        .route("/api/entities/:kind/find", post(find::find_post))
        // Record-level operations
        .route(
            "/api/entities/:kind/:id",
            get(data::record_get).put(data::record_put).delete(data::record_delete),
        )
}
