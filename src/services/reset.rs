//! One-time password-reset codes.
//!
//! Only the SHA-256 digest of a code is stored. Codes expire; expiry is
//! checked when the code is presented, nothing sweeps stale codes.

use crate::time_utils::{format_utc_rfc3339, parse_utc_rfc3339};
use chrono::{DateTime, Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const CODE_DIGITS: usize = 6;

/// Presentations allowed per issued code, successful ones included.
pub const MAX_ATTEMPTS: u32 = 5;

/// A freshly generated reset code and what gets stored for it.
#[derive(Debug, Clone)]
pub struct ResetCode {
    /// The code mailed to the user
    pub code: String,
    /// Hex SHA-256 of `code`
    pub digest: String,
    /// RFC 3339 expiry
    pub expires_at: String,
}

impl ResetCode {
    pub fn generate(now: DateTime<Utc>, ttl: Duration) -> anyhow::Result<Self> {
        let mut bytes = [0u8; 4];
        SystemRandom::new()
            .fill(&mut bytes)
            .map_err(|_| anyhow::anyhow!("system RNG unavailable"))?;
        let code = format!(
            "{:0width$}",
            u32::from_be_bytes(bytes) % 1_000_000,
            width = CODE_DIGITS
        );

        Ok(Self {
            digest: digest(&code),
            code,
            expires_at: format_utc_rfc3339(now + ttl),
        })
    }
}

/// Hex SHA-256 of a code.
pub fn digest(code: &str) -> String {
    hex::encode(Sha256::digest(code.trim().as_bytes()))
}

/// Outcome of checking a presented code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeCheck {
    Valid,
    Invalid,
    Expired,
}

/// Compare `presented` with the stored digest and expiry.
pub fn check(
    presented: &str,
    stored_digest: Option<&str>,
    stored_expiry: Option<&str>,
    now: DateTime<Utc>,
) -> CodeCheck {
    let Some(stored) = stored_digest else {
        return CodeCheck::Invalid;
    };
    let candidate = digest(presented);
    if !bool::from(candidate.as_bytes().ct_eq(stored.as_bytes())) {
        return CodeCheck::Invalid;
    }
    match stored_expiry.and_then(parse_utc_rfc3339) {
        Some(expiry) if now <= expiry => CodeCheck::Valid,
        _ => CodeCheck::Expired,
    }
}
