//! Record identifiers.

use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 24-character hex record id (12 bytes).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid record id: expected 24 hex characters")]
pub struct InvalidRecordId;

impl RecordId {
    pub const LEN: usize = 24;

    /// Parse an id. Hex digits are normalized to lowercase.
    pub fn parse(raw: &str) -> Result<Self, InvalidRecordId> {
        if raw.len() == Self::LEN && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Self(raw.to_ascii_lowercase()))
        } else {
            Err(InvalidRecordId)
        }
    }

    /// Generate a fresh id: 4 bytes of epoch seconds, then 8 random bytes.
    pub fn generate() -> anyhow::Result<Self> {
        let mut bytes = [0u8; 12];
        let secs = chrono::Utc::now().timestamp() as u32;
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        SystemRandom::new()
            .fill(&mut bytes[4..])
            .map_err(|_| anyhow::anyhow!("system RNG unavailable"))?;
        Ok(Self(hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RecordId {
    type Error = InvalidRecordId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}
