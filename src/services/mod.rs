// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - collaborators used by the handlers.

pub mod mailer;
pub mod password;
pub mod reset;

pub use mailer::{LogMailer, Mailer};
pub use reset::ResetCode;
