use axum::{
    extract::{FromRef, FromRequestParts, Request},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
};
use uuid::Uuid;

use crate::{
    models::User,
    repository::{RepositoryError, RepositoryState},
    session::Session,
    templates,
};

pub const LOGIN_REQUIRED_MESSAGE: &str = "Please login";

/// AuthUser
///
/// The identity of an authenticated session. Resolved purely from the
/// session; no database round trip.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
}

/// AdminUser
///
/// An authenticated user whose *current* role, read from the user store on
/// this request, is admin.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

/// AuthRejection
///
/// Why an auth extractor refused the request, and how that is rendered.
#[derive(Debug)]
pub enum AuthRejection {
    /// Not logged in: back to the login form with a flash message.
    LoginRequired,
    /// Logged in but not an admin.
    Forbidden,
    /// The session layer is missing from the router.
    NoSession,
    Repository(RepositoryError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::LoginRequired => Redirect::to("/login").into_response(),
            AuthRejection::Forbidden => {
                (StatusCode::FORBIDDEN, Html(templates::forbidden_page())).into_response()
            }
            AuthRejection::NoSession => {
                tracing::error!("Auth extractor used on a route without the session layer");
                (StatusCode::INTERNAL_SERVER_ERROR, Html(templates::error_page())).into_response()
            }
            AuthRejection::Repository(e) => {
                tracing::error!("Failed to resolve admin user: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, Html(templates::error_page())).into_response()
            }
        }
    }
}

/// AuthUser Extractor Implementation
///
/// Succeeds when the session carries a user reference. Otherwise it leaves a
/// "Please login" flash on the session and rejects with a redirect to
/// `/login`.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| AuthRejection::NoSession)?;

        match session.user() {
            Some(user) => Ok(AuthUser {
                id: user.id,
                name: user.name,
            }),
            None => {
                session.set_flash(LOGIN_REQUIRED_MESSAGE);
                Err(AuthRejection::LoginRequired)
            }
        }
    }
}

/// AdminUser Extractor Implementation
///
/// 1. Authentication via `AuthUser`.
/// 2. DB lookup of the user's current record, so promotions and demotions
///    apply to sessions that are already open.
/// 3. Role check.
///
/// A user already resolved by `require_admin` is taken from the request
/// extensions instead.
///
/// A session that points at a user who no longer exists is logged out.
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Already resolved by `require_admin` for this request.
        if let Some(admin) = parts.extensions.get::<AdminUser>() {
            return Ok(admin.clone());
        }

        let auth = AuthUser::from_request_parts(parts, state).await?;
        let repo = RepositoryState::from_ref(state);

        match repo.get_user(auth.id).await {
            Ok(Some(user)) if user.is_admin() => Ok(AdminUser(user)),
            Ok(Some(user)) => {
                tracing::warn!("User {} denied admin access", user.id);
                Err(AuthRejection::Forbidden)
            }
            Ok(None) => {
                if let Some(session) = parts.extensions.get::<Session>() {
                    session.clear_user();
                    session.set_flash(LOGIN_REQUIRED_MESSAGE);
                }
                Err(AuthRejection::LoginRequired)
            }
            Err(e) => Err(AuthRejection::Repository(e)),
        }
    }
}

/// require_login
///
/// Route layer for the members routes. The `AuthUser` extractor rejects
/// before the handler runs when the session is not authenticated.
pub async fn require_login(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// require_admin
///
/// Route layer for the admin routes; same mechanism with `AdminUser`. The
/// resolved user is stored in the request extensions so the handler's own
/// `AdminUser` extractor does not query the user store a second time.
pub async fn require_admin(admin: AdminUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(admin);
    next.run(request).await
}
