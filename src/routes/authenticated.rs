use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Routes for any logged-in user. `create_router` wraps this router in the
/// `require_login` layer, which redirects anonymous visitors to `/login`.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // GET /members
        .route("/members", get(handlers::members))
}
