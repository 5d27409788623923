use crate::{
    AppState,
    auth::{AdminUser, AuthUser},
    error::AppError,
    models::{LoginForm, NewUser, Role, RoleChangeForm, SignupForm},
    password,
    repository::RepositoryError,
    session::{Session, SessionUser},
    templates, validation,
};
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect},
};
use rand::seq::SliceRandom;
use uuid::Uuid;

pub const INVALID_INPUT_MESSAGE: &str = "Invalid input";
pub const USER_NOT_FOUND_MESSAGE: &str = "User not found";
pub const INCORRECT_PASSWORD_MESSAGE: &str = "Incorrect password";
pub const DUPLICATE_EMAIL_MESSAGE: &str = "Email already registered";

/// Names the members page picks from at random.
pub const FEATURED_NAMES: [&str; 3] = ["carl", "gary", "jebediah"];

// --- Page Handlers ---

/// index
///
/// [Public Route] Home page; greets the user by name when logged in.
pub async fn index(session: Session) -> Html<String> {
    let user = session.user();
    Html(templates::index_page(user.as_ref().map(|u| u.name.as_str())))
}

/// login_page
///
/// [Public Route] Login form. Shows, and thereby consumes, the pending flash.
pub async fn login_page(session: Session) -> Html<String> {
    Html(templates::login_page(session.take_flash().as_deref()))
}

/// signup_page
///
/// [Public Route] Signup form. Shows, and thereby consumes, the pending flash.
pub async fn signup_page(session: Session) -> Html<String> {
    Html(templates::signup_page(session.take_flash().as_deref()))
}

/// members
///
/// [Authenticated Route] Greeting page with a randomly featured name.
pub async fn members(AuthUser { name, .. }: AuthUser) -> Html<String> {
    let pick = FEATURED_NAMES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(FEATURED_NAMES[0]);
    Html(templates::members_page(&name, pick))
}

/// admin
///
/// [Admin Route] Lists every user with promote/demote controls.
pub async fn admin(
    AdminUser(current): AdminUser,
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>, AppError> {
    let users = state.repo.list_users().await?;
    Ok(Html(templates::admin_page(
        &current,
        &users,
        session.take_flash().as_deref(),
    )))
}

/// not_found
///
/// Catch-all fallback.
pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Html(templates::not_found_page()))
}

// --- Authentication Handlers ---

/// signup
///
/// [Public Route] `POST /signup`.
///
/// *Flow*: validate → reject duplicate email → hash → insert → authenticate
/// the session → `/members`. Every rejection flashes a message and redirects
/// back to the form without creating a record.
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignupForm>,
) -> Result<Redirect, AppError> {
    if let Err(e) = validation::validate_signup(&form) {
        tracing::warn!("Signup rejected: {}", e);
        session.set_flash(INVALID_INPUT_MESSAGE);
        return Ok(Redirect::to("/signup"));
    }

    let role = match &state.config.bootstrap_admin_email {
        Some(admin_email) if admin_email == &form.email => Role::Admin,
        _ => Role::User,
    };

    let password_hash = password::hash_password(form.password, state.config.bcrypt_cost).await?;

    let new_user = NewUser {
        name: form.name,
        email: form.email,
        password_hash,
        role,
    };

    let user = match state.repo.create_user(new_user).await {
        Ok(user) => user,
        Err(RepositoryError::DuplicateEmail) => {
            tracing::warn!("Signup rejected: email already registered");
            session.set_flash(DUPLICATE_EMAIL_MESSAGE);
            return Ok(Redirect::to("/signup"));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!("User created: {} ({})", user.id, user.role.as_str());
    session.authenticate(SessionUser::from(&user));
    Ok(Redirect::to("/members"))
}

/// login
///
/// [Public Route] `POST /login`.
///
/// *Flow*: validate email shape → look up by email → bcrypt compare →
/// authenticate the session → `/members`.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Redirect, AppError> {
    if let Err(e) = validation::validate_login(&form) {
        tracing::warn!("Login rejected: {}", e);
        session.set_flash(INVALID_INPUT_MESSAGE);
        return Ok(Redirect::to("/login"));
    }

    let Some(user) = state.repo.find_user_by_email(&form.email).await? else {
        tracing::warn!("Login rejected: unknown email");
        session.set_flash(USER_NOT_FOUND_MESSAGE);
        return Ok(Redirect::to("/login"));
    };

    if !password::verify_password(form.password, user.password_hash.clone()).await? {
        tracing::warn!("Login rejected: incorrect password for {}", user.id);
        session.set_flash(INCORRECT_PASSWORD_MESSAGE);
        return Ok(Redirect::to("/login"));
    }

    tracing::info!("User logged in: {}", user.id);
    session.authenticate(SessionUser::from(&user));
    Ok(Redirect::to("/members"))
}

/// logout
///
/// [Public Route] Destroys the session unconditionally.
pub async fn logout(session: Session) -> Redirect {
    session.destroy();
    Redirect::to("/")
}

// --- Admin Actions ---

/// promote
///
/// [Admin Route] Grants the admin role to the user with the given id.
pub async fn promote(
    admin: AdminUser,
    state: State<AppState>,
    session: Session,
    form: Form<RoleChangeForm>,
) -> Result<Redirect, AppError> {
    change_role(admin, state, session, form, Role::Admin).await
}

/// demote
///
/// [Admin Route] Returns the user with the given id to the ordinary role.
pub async fn demote(
    admin: AdminUser,
    state: State<AppState>,
    session: Session,
    form: Form<RoleChangeForm>,
) -> Result<Redirect, AppError> {
    change_role(admin, state, session, form, Role::User).await
}

async fn change_role(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RoleChangeForm>,
    role: Role,
) -> Result<Redirect, AppError> {
    let Ok(id) = Uuid::parse_str(form.id.trim()) else {
        tracing::warn!("Role change rejected: malformed id {:?}", form.id);
        session.set_flash(USER_NOT_FOUND_MESSAGE);
        return Ok(Redirect::to("/admin"));
    };

    if state.repo.set_role(id, role).await? {
        tracing::info!(
            "Admin {} set role of {} to {}",
            admin.id,
            id,
            role.as_str()
        );
    } else {
        session.set_flash(USER_NOT_FOUND_MESSAGE);
    }
    Ok(Redirect::to("/admin"))
}
