// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outbound email.

use async_trait::async_trait;

/// Delivers transactional email.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Mailer that records deliveries in the log instead of sending them.
///
/// The body is not logged; it carries one-time codes.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        tracing::info!(
            to = %to,
            subject = %subject,
            body_len = body.len(),
            "Email delivery (log only)"
        );
        Ok(())
    }
}
