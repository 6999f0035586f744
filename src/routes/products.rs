// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Seller product catalogue.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use super::{parse_id, ListResponse, MessageResponse};
use crate::auth::{Requirement, Target};
use crate::db::{self, collections, collections::fields, Filter, Update};
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Product, ProductResponse, RecordId};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/products", post(create_product))
        .route("/api/products/mine", get(list_my_products))
        .route(
            "/api/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    pub name: String,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub price: i64,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub stock: i64,
    #[serde(default)]
    #[validate(range(min = 0, max = 100, message = "must be 0-100"))]
    pub discount: i64,
    #[serde(default)]
    pub description: String,
    pub category_id: Option<String>,
    pub sub_category_id: Option<String>,
    pub image: Option<String>,
}

/// Partial product update; absent fields are left alone.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    pub name: Option<String>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub price: Option<i64>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub stock: Option<i64>,
    #[validate(range(min = 0, max = 100, message = "must be 0-100"))]
    pub discount: Option<i64>,
    pub description: Option<String>,
    pub category_id: Option<String>,
    pub sub_category_id: Option<String>,
    pub image: Option<String>,
}

impl UpdateProductRequest {
    fn into_update(self) -> Result<Update> {
        let mut update = Update::new();
        if let Some(name) = self.name {
            update = update.set("name", name);
        }
        if let Some(price) = self.price {
            update = update.set("price", price);
        }
        if let Some(stock) = self.stock {
            update = update.set("stock", stock);
        }
        if let Some(discount) = self.discount {
            update = update.set("discount", discount);
        }
        if let Some(description) = self.description {
            update = update.set("description", description);
        }
        if let Some(raw) = self.category_id {
            update = update.set("category_id", parse_id(&raw, "category")?.to_string());
        }
        if let Some(raw) = self.sub_category_id {
            update = update.set("sub_category_id", parse_id(&raw, "sub-category")?.to_string());
        }
        if let Some(image) = self.image {
            update = update.set("image", image);
        }
        if update.is_empty() {
            return Err(AppError::BadRequest("No fields to update".to_string()));
        }
        Ok(update)
    }
}

fn optional_id(raw: Option<String>, what: &str) -> Result<Option<String>> {
    raw.map(|r| parse_id(&r, what).map(String::from)).transpose()
}

/// Create a product owned by the calling seller.
async fn create_product(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(req), _): WithRejection<Json<CreateProductRequest>, AppError>,
) -> Result<(StatusCode, Json<ProductResponse>)> {
    user.require(Requirement::Seller)?;
    req.validate()?;

    let product = Product {
        id: RecordId::generate()?.to_string(),
        seller_id: user.claims.user_id.clone(),
        name: req.name.trim().to_string(),
        price: req.price,
        stock: req.stock,
        discount: req.discount,
        description: req.description,
        category_id: optional_id(req.category_id, "category")?,
        sub_category_id: optional_id(req.sub_category_id, "sub-category")?,
        image: req.image,
        created_at: format_utc_rfc3339(Utc::now()),
    };

    state
        .store
        .insert_one(collections::PRODUCTS, db::to_document(&product)?)
        .await?;

    tracing::info!(
        product_id = %product.id,
        seller_id = %product.seller_id,
        "Product created"
    );
    Ok((StatusCode::CREATED, Json(ProductResponse::from(product))))
}

async fn list_my_products(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ListResponse<ProductResponse>>> {
    user.require(Requirement::Seller)?;
    let products: Vec<Product> = db::find_records(
        state.store.as_ref(),
        collections::PRODUCTS,
        &Filter::new().eq(fields::SELLER_ID, user.claims.user_id.as_str()),
    )
    .await?;

    Ok(Json(ListResponse {
        data: products.into_iter().map(ProductResponse::from).collect(),
    }))
}

async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>> {
    let id = parse_id(&id, "product")?;
    let product: Product = db::find_record(
        state.store.as_ref(),
        collections::PRODUCTS,
        &Filter::new().eq(fields::ID, id.as_str()),
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    Ok(Json(ProductResponse::from(product)))
}

/// Explain a scoped product operation that matched nothing: the product is
/// either someone else's or gone.
async fn unmatched_product(state: &AppState, id: &RecordId, action: &str) -> AppError {
    let exists = state
        .store
        .find_one(
            collections::PRODUCTS,
            &Filter::new().eq(fields::ID, id.as_str()),
        )
        .await;
    match exists {
        Ok(Some(_)) => AppError::Forbidden(format!(
            "You do not have permission to {} this product",
            action
        )),
        Ok(None) => AppError::NotFound("Product not found".to_string()),
        Err(e) => e.into(),
    }
}

async fn update_product(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateProductRequest>, AppError>,
) -> Result<Json<MessageResponse>> {
    let id = parse_id(&id, "product")?;
    let filter = user.scope(Target::OwnedProduct { id: &id })?;
    req.validate()?;
    let update = req.into_update()?;

    let matched = state
        .store
        .update_one(collections::PRODUCTS, &filter, &update)
        .await?;
    if matched == 0 {
        return Err(unmatched_product(&state, &id, "update").await);
    }

    tracing::info!(product_id = %id, seller_id = %user.claims.user_id, "Product updated");
    Ok(MessageResponse::new("Product updated"))
}

async fn delete_product(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let id = parse_id(&id, "product")?;
    let filter = user.scope(Target::OwnedProduct { id: &id })?;

    let deleted = state
        .store
        .delete_one(collections::PRODUCTS, &filter)
        .await?;
    if deleted == 0 {
        return Err(unmatched_product(&state, &id, "delete").await);
    }

    tracing::info!(product_id = %id, seller_id = %user.claims.user_id, "Product deleted");
    Ok(MessageResponse::new("Product deleted"))
}
