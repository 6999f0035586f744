//! Product model.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Product stored in the `products` collection.
///
/// `seller_id` is the owning identity; only that seller may change or
/// delete the product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    pub seller_id: String,
    pub name: String,
    pub price: i64,
    pub stock: i64,
    #[serde(default)]
    pub discount: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_category_id: Option<String>,
    /// Stored image path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

/// API view of a product.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProductResponse {
    pub id: String,
    pub seller_id: String,
    pub name: String,
    pub price: i64,
    pub stock: i64,
    pub discount: i64,
    pub description: String,
    pub category_id: Option<String>,
    pub sub_category_id: Option<String>,
    pub image: Option<String>,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            seller_id: p.seller_id,
            name: p.name,
            price: p.price,
            stock: p.stock,
            discount: p.discount,
            description: p.description,
            category_id: p.category_id,
            sub_category_id: p.sub_category_id,
            image: p.image,
        }
    }
}
