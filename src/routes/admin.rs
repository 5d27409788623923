use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Admin Router Module
///
/// Routes restricted to users whose current role is admin. `create_router`
/// wraps this router in the `require_admin` layer; the handlers extract
/// `AdminUser` again for the resolved record.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin
        // Lists every user with promote/demote controls.
        .route("/admin", get(handlers::admin))
        // POST /promote, POST /demote
        // Single-row role update by user id; redirects back to /admin.
        .route("/promote", post(handlers::promote))
        .route("/demote", post(handlers::demote))
}
