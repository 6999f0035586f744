// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bearer-token authentication middleware.

use crate::auth::{self, Claims, Requirement, Target};
use crate::db::Filter;
use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Authenticated caller, inserted into request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub claims: Claims,
}

impl AuthUser {
    pub fn user_id(&self) -> &str {
        &self.claims.user_id
    }

    pub fn is_admin(&self) -> bool {
        self.claims.is_admin()
    }

    /// Fail with 403 unless the caller meets `requirement`.
    pub fn require(&self, requirement: Requirement) -> Result<(), AppError> {
        requirement.check(&self.claims).map_err(|err| {
            tracing::debug!(user_id = %self.claims.user_id, error = %err, "Access denied");
            AppError::from(err)
        })
    }

    /// Authorize an operation on `target` and return its store filter.
    pub fn scope(&self, target: Target<'_>) -> Result<Filter, AppError> {
        auth::scoped_filter(&self.claims, target).map_err(|err| {
            tracing::debug!(user_id = %self.claims.user_id, error = %err, "Access denied");
            AppError::from(err)
        })
    }
}

/// Middleware that requires a valid bearer token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = auth::authorize(request.headers(), &state.tokens, Requirement::Authenticated)
        .map_err(|err| {
            tracing::debug!(error = %err, path = %request.uri().path(), "Unauthenticated request");
            AppError::from(err)
        })?;

    request.extensions_mut().insert(AuthUser { claims });

    Ok(next.run(request).await)
}
