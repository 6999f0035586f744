//! Password hashing via bcrypt.
//!
//! bcrypt is deliberately slow, so both operations run on the blocking pool.

use anyhow::Context;

/// bcrypt cost factor.
const BCRYPT_COST: u32 = 10;

/// Hash a password with bcrypt.
pub async fn hash_password(password: &str) -> anyhow::Result<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .context("password hashing task failed")?
        .context("bcrypt hash")
}

/// Verify a password against a bcrypt hash. A malformed hash is a mismatch.
pub async fn verify_password(password: &str, hash: &str) -> anyhow::Result<bool> {
    let password = password.to_string();
    let hash = hash.to_string();
    let result = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .context("password verification task failed")?;
    Ok(result.unwrap_or(false))
}
