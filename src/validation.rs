//! Input validation for the signup and login forms.
//!
//! Field rules: names are ASCII alphanumeric and at most 20 characters,
//! passwords are non-empty and at most 20 characters, and emails must be a
//! plausible `local@domain.tld` address.

use thiserror::Error;

use crate::models::{LoginForm, SignupForm};

pub const MAX_NAME_LEN: usize = 20;
pub const MAX_PASSWORD_LEN: usize = 20;

const MAX_EMAIL_LEN: usize = 254;
const MAX_LOCAL_PART_LEN: usize = 64;
const MAX_LABEL_LEN: usize = 63;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("name must be 1-{MAX_NAME_LEN} alphanumeric characters")]
    InvalidName,
    #[error("email is not a valid address")]
    InvalidEmail,
    #[error("password must be 1-{MAX_PASSWORD_LEN} characters")]
    InvalidPassword,
}

pub fn validate_signup(form: &SignupForm) -> Result<(), ValidationError> {
    if !is_valid_name(&form.name) {
        return Err(ValidationError::InvalidName);
    }
    if !is_valid_email(&form.email) {
        return Err(ValidationError::InvalidEmail);
    }
    if !is_valid_password(&form.password) {
        return Err(ValidationError::InvalidPassword);
    }
    Ok(())
}

/// Login only checks the email shape; the password is checked against the
/// stored hash.
pub fn validate_login(form: &LoginForm) -> Result<(), ValidationError> {
    if !is_valid_email(&form.email) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().count() <= MAX_NAME_LEN
        && name.chars().all(|c| c.is_ascii_alphanumeric())
}

pub fn is_valid_password(password: &str) -> bool {
    !password.is_empty() && password.chars().count() <= MAX_PASSWORD_LEN
}

pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.len() > MAX_EMAIL_LEN {
        return false;
    }

    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };

    is_valid_local_part(local) && is_valid_domain(domain)
}

fn is_valid_local_part(local: &str) -> bool {
    if local.is_empty() || local.len() > MAX_LOCAL_PART_LEN {
        return false;
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }
    local.chars().all(|c| c == '.' || is_atext(c))
}

// RFC 5322 atext
fn is_atext(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-/=?^_`{|}~".contains(c)
}

fn is_valid_domain(domain: &str) -> bool {
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });

    // The TLD must be alphabetic, which also rules out bare IP addresses.
    let tld_ok = labels
        .last()
        .is_some_and(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()));

    labels_ok && tld_ok
}
