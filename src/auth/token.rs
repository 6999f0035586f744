// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session token issuance and verification.
//!
//! Tokens are compact JWTs signed with a symmetric key. Only the HMAC
//! family is accepted on the way in; the header algorithm is checked
//! before any key material is used.

use super::claims::{Claims, Role};
use crate::models::RecordId;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Deserialize;

/// Session lifetime.
pub const TOKEN_TTL_HOURS: i64 = 24;

const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Why a token was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token is not a compact JWT")]
    Malformed,

    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("signature does not match")]
    InvalidSignature,

    #[error("claims are missing or malformed")]
    MalformedClaims,

    #[error("token has expired")]
    Expired,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Only the `alg` field matters before the signature is checked.
#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// Issues and verifies session tokens with one process-wide secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        // Expiry is checked against our own clock so that `now == exp`
        // is already expired and tests can pin the time.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issue a 24-hour token for `user_id`.
    ///
    /// An empty `seller_id` is treated as absent.
    pub fn issue(
        &self,
        user_id: &str,
        role: Role,
        seller_id: Option<&str>,
    ) -> Result<String, TokenError> {
        self.issue_at(user_id, role, seller_id, Utc::now())
    }

    pub fn issue_at(
        &self,
        user_id: &str,
        role: Role,
        seller_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            user_id: user_id.to_string(),
            role,
            seller_id: seller_id.filter(|s| !s.is_empty()).map(str::to_string),
            expires_at: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify a token against the current time.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        check_algorithm(token)?;

        let mut claims = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidAlgorithm => TokenError::UnsupportedAlgorithm("unknown".into()),
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::Json(_)
                | ErrorKind::Base64(_)
                | ErrorKind::Utf8(_)
                | ErrorKind::MissingRequiredClaim(_) => TokenError::MalformedClaims,
                _ => TokenError::Malformed,
            })?;

        let user_id =
            RecordId::parse(&claims.user_id).map_err(|_| TokenError::MalformedClaims)?;
        if let Some(raw) = claims.seller_id.take() {
            let seller_id = RecordId::parse(&raw).map_err(|_| TokenError::MalformedClaims)?;
            if !claims.role.can_sell() || seller_id != user_id {
                return Err(TokenError::MalformedClaims);
            }
            claims.seller_id = Some(seller_id.into());
        }
        claims.user_id = user_id.into();

        if now.timestamp() >= claims.expires_at {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

/// Reject anything outside HS256/HS384/HS512 by reading the raw header.
///
/// `jsonwebtoken` cannot even parse `alg: none`, so this runs first to
/// report such tokens as an algorithm problem rather than a parse error.
fn check_algorithm(token: &str) -> Result<(), TokenError> {
    let mut parts = token.split('.');
    let (Some(header), Some(_), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::Malformed);
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|_| TokenError::Malformed)?;
    let raw: RawHeader = serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)?;

    match raw.alg.as_str() {
        "HS256" | "HS384" | "HS512" => Ok(()),
        other => Err(TokenError::UnsupportedAlgorithm(other.to_string())),
    }
}
