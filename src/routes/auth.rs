// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Login, registration and password-reset routes.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use super::MessageResponse;
use crate::auth::token::TOKEN_TTL_HOURS;
use crate::auth::Role;
use crate::db::{self, collections, collections::fields, Filter, Update};
use crate::error::{AppError, Result};
use crate::models::{RecordId, StoreStatus, User, UserRole};
use crate::services::password::{hash_password, verify_password};
use crate::services::reset::{self, CodeCheck};
use crate::services::ResetCode;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register/customer", post(register_customer))
        .route("/auth/register/seller", post(register_seller))
        .route(
            "/auth/register/customer-seller",
            post(register_customer_seller),
        )
        .route("/auth/password/forgot", post(forgot_password))
        .route("/auth/password/verify", post(verify_reset_code))
        .route("/auth/password/reset", post(reset_password))
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: String,
    pub role: String,
    /// Token lifetime in seconds
    pub expires_in: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub username: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: String,
    pub message: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyCodeRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub otp: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub otp: String,
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub new_password: String,
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

async fn find_user_by_email(state: &AppState, email: &str) -> Result<Option<User>> {
    Ok(db::find_record(
        state.store.as_ref(),
        collections::USERS,
        &Filter::new().eq(fields::EMAIL, email),
    )
    .await?)
}

/// Exchange email and password for a session token.
async fn login(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<Json<LoginResponse>> {
    req.validate()?;
    let email = normalize_email(&req.email);

    let Some(user) = find_user_by_email(&state, &email).await? else {
        tracing::debug!("Login for unknown email");
        return Err(AppError::Unauthorized);
    };

    if !verify_password(&req.password, &user.password).await? {
        tracing::debug!(user_id = %user.id, "Login with wrong password");
        return Err(AppError::Unauthorized);
    }

    if user.suspended {
        tracing::info!(user_id = %user.id, "Login refused for suspended account");
        return Err(AppError::Forbidden("Account is suspended".to_string()));
    }

    let role = if state.config.is_admin_email(&user.email) {
        Role::Admin
    } else {
        user.session_role()
            .ok_or_else(|| AppError::Forbidden("Account has no role".to_string()))?
    };
    let seller_id = role.can_sell().then_some(user.id.as_str());

    let token = state
        .tokens
        .issue(&user.id, role, seller_id)
        .map_err(anyhow::Error::from)?;

    tracing::info!(user_id = %user.id, role = %role, "User logged in");

    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        role: role.to_string(),
        expires_in: TOKEN_TTL_HOURS * 3600,
    }))
}

async fn register_customer(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, AppError>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    register(&state, req, &[UserRole::Customer]).await
}

async fn register_seller(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, AppError>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    register(&state, req, &[UserRole::Seller]).await
}

async fn register_customer_seller(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, AppError>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    register(&state, req, &[UserRole::Customer, UserRole::Seller]).await
}

/// Create an account with `roles`. Seller accounts start with a pending store.
async fn register(
    state: &AppState,
    req: RegisterRequest,
    roles: &[UserRole],
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    req.validate()?;
    let email = normalize_email(&req.email);
    let username = req.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::BadRequest("username must not be blank".to_string()));
    }

    if find_user_by_email(state, &email).await?.is_some() {
        return Err(AppError::Conflict("Email is already registered".to_string()));
    }

    let id = RecordId::generate()?;
    let sells = roles.contains(&UserRole::Seller);
    let user = User {
        id: id.to_string(),
        username,
        email,
        password: hash_password(&req.password).await?,
        roles: roles.to_vec(),
        store_status: sells.then_some(StoreStatus::Pending),
        store_info: None,
        suspended: false,
        reset_token: None,
        reset_token_expiry: None,
        reset_attempts: 0,
        created_at: format_utc_rfc3339(Utc::now()),
    };

    let user_id = state
        .store
        .insert_one(collections::USERS, db::to_document(&user)?)
        .await?;

    tracing::info!(user_id = %user_id, roles = ?roles, "Registered account");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id,
            message: "Registration successful".to_string(),
        }),
    ))
}

/// Mail a one-time reset code to a registered address.
async fn forgot_password(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(req), _): WithRejection<Json<ForgotPasswordRequest>, AppError>,
) -> Result<Json<MessageResponse>> {
    req.validate()?;
    let email = normalize_email(&req.email);

    let user = find_user_by_email(&state, &email)
        .await?
        .ok_or_else(|| AppError::NotFound("No account with that email".to_string()))?;

    let ttl = chrono::Duration::minutes(state.config.reset_token_ttl_minutes);
    let code = ResetCode::generate(Utc::now(), ttl)?;

    let update = Update::new()
        .set(fields::RESET_TOKEN, code.digest.as_str())
        .set(fields::RESET_TOKEN_EXPIRY, code.expires_at.as_str())
        .set(fields::RESET_ATTEMPTS, 0);
    let matched = state
        .store
        .update_one(
            collections::USERS,
            &Filter::new().eq(fields::ID, user.id.as_str()),
            &update,
        )
        .await?;
    if matched == 0 {
        return Err(AppError::NotFound("No account with that email".to_string()));
    }

    state
        .mailer
        .send(
            &user.email,
            "Password reset code",
            &format!(
                "Your OTP: {}\nIt expires in {} minutes.",
                code.code, state.config.reset_token_ttl_minutes
            ),
        )
        .await?;

    tracing::info!(user_id = %user.id, "Password reset code issued");

    Ok(MessageResponse::new("Reset code sent"))
}

/// Load the account for `email` and check the presented code against it.
///
/// Every presentation is counted on the account before the code is compared,
/// and the count only advances while it still holds the value just read. Once
/// [`reset::MAX_ATTEMPTS`] is reached the outstanding code is withdrawn.
async fn checked_reset_target(state: &AppState, email: &str, otp: &str) -> Result<User> {
    let user = find_user_by_email(state, &normalize_email(email))
        .await?
        .ok_or(AppError::InvalidToken)?;
    let Some(digest) = user.reset_token.clone() else {
        return Err(AppError::InvalidToken);
    };

    let outstanding = Filter::new()
        .eq(fields::ID, user.id.as_str())
        .eq(fields::RESET_TOKEN, digest.as_str());
    if user.reset_attempts >= reset::MAX_ATTEMPTS {
        withdraw_reset_code(state, &outstanding).await?;
        return Err(AppError::InvalidToken);
    }

    let attempts = user.reset_attempts + 1;
    let recorded = state
        .store
        .update_one(
            collections::USERS,
            &outstanding
                .clone()
                .eq(fields::RESET_ATTEMPTS, user.reset_attempts),
            &Update::new().set(fields::RESET_ATTEMPTS, attempts),
        )
        .await?;
    if recorded == 0 {
        tracing::debug!(user_id = %user.id, "Reset code changed while checking");
        return Err(AppError::InvalidToken);
    }

    match reset::check(
        otp,
        Some(digest.as_str()),
        user.reset_token_expiry.as_deref(),
        Utc::now(),
    ) {
        CodeCheck::Valid => Ok(user),
        outcome => {
            tracing::debug!(
                user_id = %user.id,
                outcome = ?outcome,
                attempts,
                "Rejected reset code"
            );
            if attempts >= reset::MAX_ATTEMPTS {
                tracing::warn!(user_id = %user.id, "Too many reset attempts; code withdrawn");
                withdraw_reset_code(state, &outstanding).await?;
            }
            Err(AppError::InvalidToken)
        }
    }
}

async fn withdraw_reset_code(state: &AppState, outstanding: &Filter) -> Result<()> {
    let update = Update::new()
        .unset(fields::RESET_TOKEN)
        .unset(fields::RESET_TOKEN_EXPIRY)
        .unset(fields::RESET_ATTEMPTS);
    state
        .store
        .update_one(collections::USERS, outstanding, &update)
        .await?;
    Ok(())
}

async fn verify_reset_code(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(req), _): WithRejection<Json<VerifyCodeRequest>, AppError>,
) -> Result<Json<MessageResponse>> {
    req.validate()?;
    checked_reset_target(&state, &req.email, &req.otp).await?;
    Ok(MessageResponse::new("Code is valid"))
}

/// Set a new password. The code is consumed: the update only matches while
/// the stored digest is still the one that was checked.
async fn reset_password(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(req), _): WithRejection<Json<ResetPasswordRequest>, AppError>,
) -> Result<Json<MessageResponse>> {
    req.validate()?;
    let user = checked_reset_target(&state, &req.email, &req.otp).await?;
    let digest = user.reset_token.unwrap_or_default();

    let filter = Filter::new()
        .eq(fields::ID, user.id.as_str())
        .eq(fields::RESET_TOKEN, digest);
    let update = Update::new()
        .set(fields::PASSWORD, hash_password(&req.new_password).await?)
        .unset(fields::RESET_TOKEN)
        .unset(fields::RESET_TOKEN_EXPIRY)
        .unset(fields::RESET_ATTEMPTS);

    let matched = state
        .store
        .update_one(collections::USERS, &filter, &update)
        .await?;
    if matched == 0 {
        return Err(AppError::InvalidToken);
    }

    tracing::info!(user_id = %user.id, "Password reset");

    Ok(MessageResponse::new("Password has been reset"))
}
