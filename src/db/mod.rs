//! Database layer.
//!
//! Handlers talk to a [`DocumentStore`]: a collection of JSON documents
//! queried with conjunctive [`Filter`]s. Two backends exist, an in-process
//! store and Firestore.

pub mod filter;
pub mod firestore;
pub mod memory;

pub use filter::{Filter, Predicate, Update};
pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

/// A stored document. Every document carries its id under `_id`.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const PRODUCTS: &str = "products";

    /// Field names used in filters.
    pub mod fields {
        pub const ID: &str = "_id";
        pub const EMAIL: &str = "email";
        pub const ROLES: &str = "roles";
        pub const SELLER_ID: &str = "seller_id";
        pub const STORE_STATUS: &str = "store_status";
        pub const SUSPENDED: &str = "suspended";
        pub const USERNAME: &str = "username";
        pub const PASSWORD: &str = "password";
        pub const RESET_TOKEN: &str = "reset_token";
        pub const RESET_TOKEN_EXPIRY: &str = "reset_token_expiry";
        pub const RESET_ATTEMPTS: &str = "reset_attempts";
    }
}

/// Store failures. "No document matched" is not an error; operations
/// report it as `None` or a zero count.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document {0} already exists")]
    Duplicate(String),

    #[error("document has no string `_id`")]
    MissingId,

    #[error("failed to encode document: {0}")]
    Encode(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Single-document operations over filtered collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError>;

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError>;

    /// Apply `update` to the first matching document; returns the matched count.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<u64, StoreError>;

    /// Delete the first matching document; returns the deleted count.
    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

    /// Insert a document and return its `_id`.
    async fn insert_one(&self, collection: &str, document: Document)
        -> Result<String, StoreError>;
}

/// Serialize a record into a document.
pub fn to_document<T: Serialize>(record: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(record).map_err(|e| StoreError::Encode(e.to_string()))? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(StoreError::Encode("record is not an object".to_string())),
    }
}

/// Deserialize a document into a record.
pub fn from_document<T: DeserializeOwned>(document: Document) -> Result<T, StoreError> {
    serde_json::from_value(serde_json::Value::Object(document))
        .map_err(|e| StoreError::Encode(e.to_string()))
}

pub(crate) fn document_id(document: &Document) -> Result<&str, StoreError> {
    document
        .get(collections::fields::ID)
        .and_then(|v| v.as_str())
        .ok_or(StoreError::MissingId)
}

/// Find one document and decode it as `T`.
pub async fn find_record<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    filter: &Filter,
) -> Result<Option<T>, StoreError> {
    store
        .find_one(collection, filter)
        .await?
        .map(from_document)
        .transpose()
}

/// Find every matching document and decode them as `T`.
pub async fn find_records<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    filter: &Filter,
) -> Result<Vec<T>, StoreError> {
    store
        .find(collection, filter)
        .await?
        .into_iter()
        .map(from_document)
        .collect()
}
