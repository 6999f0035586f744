//! The caller's own profile.

use axum::{extract::State, routing::get, Extension, Json, Router};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::db::{self, collections, collections::fields, Filter, Update};
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{User, UserResponse};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/profile", get(get_profile).put(update_profile))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ProfileUpdate {
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub username: String,
}

fn own_filter(user: &AuthUser) -> Filter {
    Filter::new().eq(fields::ID, user.user_id())
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let found: User = db::find_record(state.store.as_ref(), collections::USERS, &own_filter(&user))
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

    Ok(Json(UserResponse::from(found)))
}

/// Change the caller's display name.
async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(req), _): WithRejection<Json<ProfileUpdate>, AppError>,
) -> Result<Json<UserResponse>> {
    req.validate()?;
    let username = req.username.trim();
    if username.is_empty() {
        return Err(AppError::BadRequest("username must not be blank".to_string()));
    }

    let filter = own_filter(&user);
    let matched = state
        .store
        .update_one(
            collections::USERS,
            &filter,
            &Update::new().set(fields::USERNAME, username),
        )
        .await?;
    if matched == 0 {
        return Err(AppError::NotFound("Profile not found".to_string()));
    }

    let found: User = db::find_record(state.store.as_ref(), collections::USERS, &filter)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

    tracing::debug!(user_id = %user.user_id(), "Profile updated");
    Ok(Json(UserResponse::from(found)))
}
