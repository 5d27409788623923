use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints reachable without a logged-in session.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for monitoring and load balancers.
        .route("/health", get(|| async { "ok" }))
        .route("/", get(handlers::index))
        // GET/POST /login
        // The POST flashes a message and redirects back here on any failure.
        .route("/login", get(handlers::login_page).post(handlers::login))
        // GET/POST /signup
        .route("/signup", get(handlers::signup_page).post(handlers::signup))
        // GET /logout
        // Destroys the session whether or not it was authenticated.
        .route("/logout", get(handlers::logout))
}
