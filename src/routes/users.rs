// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account administration: customers, sellers and dual-role accounts.
//!
//! All three account kinds live in the `users` collection and differ only
//! by their `roles`. Each handler narrows its store filter to the kind it
//! serves through [`AuthUser::scope`], so a seller endpoint can never read
//! or modify a customer-only record.

use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use validator::ValidateEmail;

use super::{parse_id, ListResponse, MessageResponse};
use crate::auth::{Access, Audience, Requirement, Target};
use crate::db::{self, collections, collections::fields, Filter, Predicate, Update};
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{RecordId, StoreInfo, StoreStatus, User, UserResponse, UserRole};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users/{id}", get(get_user))
        .route("/api/users/{id}/suspend", post(suspend_user))
        .route("/api/users/{id}/unsuspend", post(unsuspend_user))
        .route("/api/customers", get(list_customers).put(update_customer))
        .route("/api/customers/{id}", delete(delete_customer))
        .route("/api/sellers", get(list_sellers))
        .route(
            "/api/sellers/{id}",
            get(get_seller).put(update_seller).delete(delete_seller),
        )
        .route("/api/sellers/{id}/suspend", post(suspend_seller))
        .route("/api/sellers/{id}/unsuspend", post(unsuspend_seller))
        .route("/api/customer-sellers", get(list_customer_sellers))
        .route(
            "/api/customer-sellers/{id}",
            put(update_customer_seller).delete(delete_customer_seller),
        )
}

/// Fields no generic update may touch.
const PROTECTED_FIELDS: &[&str] = &[
    fields::ID,
    "id",
    fields::PASSWORD,
    fields::ROLES,
    fields::RESET_TOKEN,
    fields::RESET_TOKEN_EXPIRY,
    fields::RESET_ATTEMPTS,
];

/// Fields only an admin may change.
const ADMIN_FIELDS: &[&str] = &[fields::STORE_STATUS, fields::SUSPENDED];

/// Validate a generic account patch and turn it into a store update.
///
/// Protected fields, unknown fields and an empty patch are rejected as bad
/// requests; admin-only fields from a non-admin caller are forbidden.
pub(crate) fn build_user_patch(raw: Map<String, Value>, caller_is_admin: bool) -> Result<Update> {
    if let Some(field) = raw.keys().find(|k| PROTECTED_FIELDS.contains(&k.as_str())) {
        return Err(AppError::BadRequest(format!(
            "Field '{}' cannot be updated here",
            field
        )));
    }
    if raw.is_empty() {
        return Err(AppError::BadRequest("No fields to update".to_string()));
    }
    if !caller_is_admin {
        if let Some(field) = raw.keys().find(|k| ADMIN_FIELDS.contains(&k.as_str())) {
            return Err(AppError::Forbidden(format!(
                "Only an admin may change '{}'",
                field
            )));
        }
    }

    let mut update = Update::new();
    for (field, value) in raw {
        let value = match field.as_str() {
            fields::USERNAME => {
                let name = value
                    .as_str()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| bad_field(&field, "must be a non-empty string"))?;
                Value::from(name)
            }
            fields::EMAIL => {
                let email = value
                    .as_str()
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| s.validate_email())
                    .ok_or_else(|| bad_field(&field, "must be a valid email address"))?;
                Value::from(email)
            }
            "store_info" => {
                let info: StoreInfo = serde_json::from_value(value)
                    .map_err(|e| bad_field(&field, &e.to_string()))?;
                serde_json::to_value(info).map_err(anyhow::Error::from)?
            }
            fields::STORE_STATUS => {
                let status: StoreStatus = serde_json::from_value(value)
                    .map_err(|e| bad_field(&field, &e.to_string()))?;
                Value::from(status.as_str())
            }
            fields::SUSPENDED => {
                Value::from(value.as_bool().ok_or_else(|| bad_field(&field, "must be a boolean"))?)
            }
            _ => {
                return Err(AppError::BadRequest(format!("Unknown field '{}'", field)));
            }
        };
        update = update.set(&field, value);
    }
    Ok(update)
}

fn bad_field(field: &str, reason: &str) -> AppError {
    AppError::BadRequest(format!("Field '{}' {}", field, reason))
}

/// Reject an email change that would collide with another account.
async fn ensure_email_free(state: &AppState, update: &Update, id: &RecordId) -> Result<()> {
    let Some(email) = update.sets().get(fields::EMAIL).and_then(Value::as_str) else {
        return Ok(());
    };
    let existing: Option<User> = db::find_record(
        state.store.as_ref(),
        collections::USERS,
        &Filter::new().eq(fields::EMAIL, email),
    )
    .await?;
    match existing {
        Some(other) if other.id != id.as_str() => {
            Err(AppError::Conflict("Email is already registered".to_string()))
        }
        _ => Ok(()),
    }
}

/// Apply a validated patch to an account of `audience`.
async fn patch_account(
    state: &AppState,
    user: &AuthUser,
    raw_id: &str,
    patch: Map<String, Value>,
    audience: Audience,
) -> Result<Json<MessageResponse>> {
    let id = parse_id(raw_id, "user")?;
    let update = build_user_patch(patch, user.is_admin())?;
    let filter = user.scope(Target::User {
        id: &id,
        audience,
        access: Access::AdminOrSelf,
    })?;

    ensure_email_free(state, &update, &id).await?;

    let matched = state
        .store
        .update_one(collections::USERS, &filter, &update)
        .await?;
    if matched == 0 {
        return Err(AppError::NotFound("Account not found".to_string()));
    }

    tracing::info!(
        user_id = %user.user_id(),
        target = %id,
        fields = ?update.sets().keys().collect::<Vec<_>>(),
        "Account updated"
    );
    Ok(MessageResponse::new("Account updated"))
}

async fn delete_account(
    state: &AppState,
    user: &AuthUser,
    raw_id: &str,
    audience: Audience,
) -> Result<Json<MessageResponse>> {
    let id = parse_id(raw_id, "user")?;
    let filter = user.scope(Target::User {
        id: &id,
        audience,
        access: Access::AdminOrSelf,
    })?;

    let deleted = state
        .store
        .delete_one(collections::USERS, &filter)
        .await?;
    if deleted == 0 {
        return Err(AppError::NotFound("Account not found".to_string()));
    }

    tracing::info!(user_id = %user.user_id(), target = %id, "Account deleted");
    Ok(MessageResponse::new("Account deleted"))
}

async fn set_suspended(
    state: &AppState,
    user: &AuthUser,
    raw_id: &str,
    audience: Audience,
    suspended: bool,
) -> Result<Json<MessageResponse>> {
    let id = parse_id(raw_id, "user")?;
    let filter = user.scope(Target::User {
        id: &id,
        audience,
        access: Access::Admin,
    })?;

    let matched = state
        .store
        .update_one(
            collections::USERS,
            &filter,
            &Update::new().set(fields::SUSPENDED, suspended),
        )
        .await?;
    if matched == 0 {
        return Err(AppError::NotFound("Account not found".to_string()));
    }

    tracing::info!(
        admin_id = %user.user_id(),
        target = %id,
        suspended,
        "Account suspension changed"
    );
    Ok(MessageResponse::new(if suspended {
        "Account suspended"
    } else {
        "Account unsuspended"
    }))
}

async fn list_accounts(
    state: &AppState,
    user: &AuthUser,
    filter: Filter,
) -> Result<Json<ListResponse<UserResponse>>> {
    user.require(Requirement::Admin)?;
    let users: Vec<User> =
        db::find_records(state.store.as_ref(), collections::USERS, &filter).await?;
    Ok(Json(ListResponse {
        data: users.into_iter().map(UserResponse::from).collect(),
    }))
}

/// Public view of `found`; the national id is only shown to admins and the
/// account owner.
fn visible_to(user: &AuthUser, found: User) -> UserResponse {
    let own = found.id == user.user_id();
    let response = UserResponse::from(found);
    if user.is_admin() || own {
        response
    } else {
        response.without_nik()
    }
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>> {
    let id = parse_id(&id, "user")?;
    let found: User = db::find_record(
        state.store.as_ref(),
        collections::USERS,
        &Filter::new().eq(fields::ID, id.as_str()),
    )
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(visible_to(&user, found)))
}

async fn suspend_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    set_suspended(&state, &user, &id, Audience::AnyUser, true).await
}

async fn unsuspend_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    set_suspended(&state, &user, &id, Audience::AnyUser, false).await
}

async fn list_customers(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ListResponse<UserResponse>>> {
    list_accounts(&state, &user, Audience::Customers.filter()).await
}

#[derive(Debug, Deserialize)]
pub struct CustomerUpdateRequest {
    pub user_id: String,
    pub updates: Map<String, Value>,
}

async fn update_customer(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(req), _): WithRejection<Json<CustomerUpdateRequest>, AppError>,
) -> Result<Json<MessageResponse>> {
    patch_account(&state, &user, &req.user_id, req.updates, Audience::Customers).await
}

async fn delete_customer(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    delete_account(&state, &user, &id, Audience::Customers).await
}

/// Sellers, plus applicants whose store was rejected.
async fn list_sellers(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ListResponse<UserResponse>>> {
    let filter = Filter::new().any_of(vec![
        Predicate::Contains(fields::ROLES.to_string(), UserRole::Seller.as_str().into()),
        Predicate::Eq(
            fields::STORE_STATUS.to_string(),
            StoreStatus::Rejected.as_str().into(),
        ),
    ]);
    list_accounts(&state, &user, filter).await
}

async fn get_seller(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>> {
    let id = parse_id(&id, "seller")?;
    let found: User = db::find_record(
        state.store.as_ref(),
        collections::USERS,
        &Audience::Sellers.filter().eq(fields::ID, id.as_str()),
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Seller not found".to_string()))?;

    Ok(Json(visible_to(&user, found)))
}

async fn update_seller(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    WithRejection(Json(patch), _): WithRejection<Json<Map<String, Value>>, AppError>,
) -> Result<Json<MessageResponse>> {
    patch_account(&state, &user, &id, patch, Audience::Sellers).await
}

async fn delete_seller(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    delete_account(&state, &user, &id, Audience::Sellers).await
}

async fn suspend_seller(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    set_suspended(&state, &user, &id, Audience::Sellers, true).await
}

async fn unsuspend_seller(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    set_suspended(&state, &user, &id, Audience::Sellers, false).await
}

async fn list_customer_sellers(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ListResponse<UserResponse>>> {
    list_accounts(&state, &user, Audience::CustomerSellers.filter()).await
}

async fn update_customer_seller(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    WithRejection(Json(patch), _): WithRejection<Json<Map<String, Value>>, AppError>,
) -> Result<Json<MessageResponse>> {
    patch_account(&state, &user, &id, patch, Audience::CustomerSellers).await
}

async fn delete_customer_seller(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    delete_account(&state, &user, &id, Audience::CustomerSellers).await
}
