//! User model for storage and API.

use crate::auth::Role;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Stored account role. Admin is never stored; it comes from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Customer,
    Seller,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Customer => "customer",
            UserRole::Seller => "seller",
        }
    }
}

/// Seller store review state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum StoreStatus {
    Pending,
    Approved,
    Rejected,
    Suspended,
}

impl StoreStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreStatus::Pending => "pending",
            StoreStatus::Approved => "approved",
            StoreStatus::Rejected => "rejected",
            StoreStatus::Suspended => "suspended",
        }
    }
}

/// Seller store details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(deny_unknown_fields)]
pub struct StoreInfo {
    #[serde(default)]
    pub store_name: String,
    #[serde(default)]
    pub full_address: String,
    /// National identity number
    #[serde(default)]
    pub nik: String,
    #[serde(default)]
    pub photo_path: String,
}

/// User account stored in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Record id (also the document id)
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    /// bcrypt hash
    pub password: String,
    pub roles: Vec<UserRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_status: Option<StoreStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_info: Option<StoreInfo>,
    #[serde(default)]
    pub suspended: bool,
    /// SHA-256 (hex) of the outstanding password-reset OTP
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,
    /// RFC 3339 expiry of `reset_token`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_token_expiry: Option<String>,
    /// Codes presented against `reset_token` so far
    #[serde(default)]
    pub reset_attempts: u32,
    #[serde(default)]
    pub created_at: String,
}

impl User {
    pub fn has_role(&self, role: UserRole) -> bool {
        self.roles.contains(&role)
    }

    /// Token role for this account; `None` if it has no stored roles.
    pub fn session_role(&self) -> Option<Role> {
        match (
            self.has_role(UserRole::Customer),
            self.has_role(UserRole::Seller),
        ) {
            (true, true) => Some(Role::CustomerSeller),
            (false, true) => Some(Role::Seller),
            (true, false) => Some(Role::Customer),
            (false, false) => None,
        }
    }
}

/// Public view of a user. Never carries the password hash or reset token.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub roles: Vec<UserRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_status: Option<StoreStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_info: Option<StoreInfo>,
    pub suspended: bool,
}

impl UserResponse {
    /// Drop the national id; used when the viewer is neither admin nor owner.
    pub fn without_nik(mut self) -> Self {
        if let Some(info) = self.store_info.as_mut() {
            info.nik.clear();
        }
        self
    }
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            roles: user.roles,
            store_status: user.store_status,
            store_info: user.store_info,
            suspended: user.suspended,
        }
    }
}
