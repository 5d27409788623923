use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::{password::PasswordError, repository::RepositoryError, templates};

/// AppError
///
/// Handler-level failure. Every variant is an internal error from the
/// visitor's point of view: it is logged with its cause and rendered as a
/// generic 500 page.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("Request failed: {}", self);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(templates::error_page()),
        )
            .into_response()
    }
}
