//! bcrypt password hashing, run on the blocking pool so a slow hash does not
//! stall the async runtime.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("bcrypt failure: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub async fn hash_password(password: String, cost: u32) -> Result<String, PasswordError> {
    let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hashed)
}

/// Returns `Ok(false)` on a mismatch; `Err` only when the stored hash is
/// unreadable or the task died.
pub async fn verify_password(password: String, password_hash: String) -> Result<bool, PasswordError> {
    let matches =
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &password_hash)).await??;
    Ok(matches)
}
