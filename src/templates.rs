//! HTML templates for the web interface
//!
//! Plain inline templates without a template engine. Every value that came
//! from a user goes through `html_escape`.

use crate::models::{Role, User};

/// Shared page chrome: head, stylesheet and navigation.
fn layout(title: &str, authenticated: bool, body: &str) -> String {
    let nav = if authenticated {
        r#"<a href="/">Home</a><a href="/members">Members</a><a href="/admin">Admin</a><a href="/logout">Log out</a>"#
    } else {
        r#"<a href="/">Home</a><a href="/login">Log in</a><a href="/signup">Sign up</a>"#
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{title}</title>
    <link rel="stylesheet" href="/static/style.css">
</head>
<body>
    <div class="container">
        <nav>{nav}</nav>
        {body}
    </div>
</body>
</html>"#
    )
}

fn message_html(message: Option<&str>) -> String {
    match message {
        Some(m) if !m.is_empty() => format!(r#"<div class="message">{}</div>"#, html_escape(m)),
        _ => String::new(),
    }
}

pub fn index_page(username: Option<&str>) -> String {
    let body = match username {
        Some(name) => format!(
            r#"<h1>Hello, {}!</h1>
        <p><a href="/members">Go to the members area</a></p>"#,
            html_escape(name)
        ),
        None => r#"<h1>Welcome</h1>
        <p><a href="/signup">Sign up</a> or <a href="/login">log in</a> to see the members area.</p>"#
            .to_string(),
    };

    layout("Home", username.is_some(), &body)
}

pub fn login_page(message: Option<&str>) -> String {
    let body = format!(
        r#"<h1>Log in</h1>
        {message}
        <form method="POST" action="/login">
            <div class="form-group">
                <label for="email">Email:</label>
                <input type="email" id="email" name="email" required autofocus>
            </div>
            <div class="form-group">
                <label for="password">Password:</label>
                <input type="password" id="password" name="password" required>
            </div>
            <button type="submit">Log in</button>
        </form>
        <p>No account yet? <a href="/signup">Sign up</a></p>"#,
        message = message_html(message)
    );

    layout("Log in", false, &body)
}

pub fn signup_page(message: Option<&str>) -> String {
    let body = format!(
        r#"<h1>Sign up</h1>
        {message}
        <form method="POST" action="/signup">
            <div class="form-group">
                <label for="name">Name:</label>
                <input type="text" id="name" name="name" maxlength="20" required autofocus>
            </div>
            <div class="form-group">
                <label for="email">Email:</label>
                <input type="email" id="email" name="email" required>
            </div>
            <div class="form-group">
                <label for="password">Password:</label>
                <input type="password" id="password" name="password" maxlength="20" required>
            </div>
            <button type="submit">Sign up</button>
        </form>
        <p>Already registered? <a href="/login">Log in</a></p>"#,
        message = message_html(message)
    );

    layout("Sign up", false, &body)
}

pub fn members_page(username: &str, pick: &str) -> String {
    let body = format!(
        r#"<h1>Hello, {}.</h1>
        <p>Today's featured member is <strong>{}</strong>.</p>"#,
        html_escape(username),
        html_escape(pick)
    );

    layout("Members", true, &body)
}

pub fn admin_page(current: &User, users: &[User], message: Option<&str>) -> String {
    let rows: String = users
        .iter()
        .map(|user| {
            let action = match user.role {
                Role::User => ("/promote", "Promote"),
                Role::Admin => ("/demote", "Demote"),
            };
            format!(
                r#"<tr>
                <td>{name}</td>
                <td>{email}</td>
                <td>{role}</td>
                <td>
                    <form method="POST" action="{path}">
                        <input type="hidden" name="id" value="{id}">
                        <button type="submit">{label}</button>
                    </form>
                </td>
            </tr>"#,
                name = html_escape(&user.name),
                email = html_escape(&user.email),
                role = user.role.as_str(),
                path = action.0,
                id = user.id,
                label = action.1,
            )
        })
        .collect();

    let body = format!(
        r#"<h1>Admin</h1>
        <p>Signed in as {name}.</p>
        {message}
        <table>
            <thead>
                <tr><th>Name</th><th>Email</th><th>Role</th><th></th></tr>
            </thead>
            <tbody>
            {rows}
            </tbody>
        </table>"#,
        name = html_escape(&current.name),
        message = message_html(message),
    );

    layout("Admin", true, &body)
}

pub fn forbidden_page() -> String {
    layout(
        "Forbidden",
        true,
        r#"<h1>403 - Forbidden</h1>
        <p>You need administrator rights to view this page.</p>"#,
    )
}

pub fn not_found_page() -> String {
    layout(
        "Not found",
        false,
        r#"<h1>404 - Page not found</h1>
        <p><a href="/">Back to the home page</a></p>"#,
    )
}

pub fn error_page() -> String {
    layout(
        "Error",
        false,
        r#"<h1>Something went wrong</h1>
        <p>Please try again later.</p>"#,
    )
}

/// Escape HTML special characters
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
