// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session token claims.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role carried in a session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "customer")]
    Customer,
    #[serde(rename = "seller")]
    Seller,
    #[serde(rename = "customer+seller")]
    CustomerSeller,
    #[serde(rename = "admin")]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Seller => "seller",
            Role::CustomerSeller => "customer+seller",
            Role::Admin => "admin",
        }
    }

    /// Whether this role may own and manage products.
    pub fn can_sell(&self) -> bool {
        matches!(self, Role::Seller | Role::CustomerSeller)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims embedded in a signed session token.
///
/// `seller_id` is only serialized when present, so customer tokens carry
/// exactly `user_id`, `role` and `exp`. When present it equals `user_id`
/// and the role can sell; verification rejects anything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_id: Option<String>,
    /// Expiry (seconds since epoch); the token is invalid at or after it.
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
