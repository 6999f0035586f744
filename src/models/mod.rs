// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod id;
pub mod product;
pub mod user;

pub use id::RecordId;
pub use product::{Product, ProductResponse};
pub use user::{StoreInfo, StoreStatus, User, UserResponse, UserRole};
