// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session tokens and access control.

pub mod claims;
pub mod guard;
pub mod token;

pub use claims::{Claims, Role};
pub use guard::{authorize, scoped_filter, Access, Audience, AuthError, Requirement, Target};
pub use token::{TokenCodec, TokenError};
