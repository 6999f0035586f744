// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Marketplace API: accounts, stores and products for a multi-role
//! e-commerce platform.
//!
//! Every request that touches a user or product record is gated by a
//! signed session token and a role/ownership check before it reaches the
//! document store.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use auth::TokenCodec;
use config::Config;
use db::DocumentStore;
use services::Mailer;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    pub tokens: TokenCodec,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Build state; the token codec takes its secret from `config`.
    pub fn new(config: Config, store: Arc<dyn DocumentStore>, mailer: Arc<dyn Mailer>) -> Self {
        let tokens = TokenCodec::new(&config.jwt_secret);
        Self {
            config,
            store,
            tokens,
            mailer,
        }
    }
}
