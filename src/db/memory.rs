// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store.
//!
//! Each collection lives under one `DashMap` entry, so a filter and the
//! mutation it selects happen under the same shard lock.

use super::{document_id, Document, DocumentStore, Filter, StoreError, Update};
use async_trait::async_trait;
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: DashMap<String, Vec<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| filter.matches(d)).cloned()))
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<u64, StoreError> {
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(0);
        };
        match docs.iter_mut().find(|d| filter.matches(d)) {
            Some(doc) => {
                let id = doc.get(super::collections::fields::ID).cloned();
                update.apply(doc);
                // The id is immutable regardless of what the update says.
                if let Some(id) = id {
                    doc.insert(super::collections::fields::ID.to_string(), id);
                }
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(0);
        };
        match docs.iter().position(|d| filter.matches(d)) {
            Some(index) => {
                docs.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<String, StoreError> {
        let id = document_id(&document)?.to_string();
        let mut docs = self.collections.entry(collection.to_string()).or_default();
        if docs
            .iter()
            .any(|d| document_id(d).map(|existing| existing == id).unwrap_or(false))
        {
            return Err(StoreError::Duplicate(id));
        }
        docs.push(document);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_insert_find_update_delete() {
        let store = MemoryStore::new();
        store
            .insert_one("users", doc(json!({"_id": "u1", "roles": ["customer"], "username": "a"})))
            .await
            .unwrap();
        store
            .insert_one("users", doc(json!({"_id": "u2", "roles": ["seller"], "username": "b"})))
            .await
            .unwrap();

        let customers = store
            .find("users", &Filter::new().contains("roles", "customer"))
            .await
            .unwrap();
        assert_eq!(customers.len(), 1);

        // Role predicate keeps a seller-targeted update off a customer.
        let matched = store
            .update_one(
                "users",
                &Filter::new().eq("_id", "u1").contains("roles", "seller"),
                &Update::new().set("username", "z"),
            )
            .await
            .unwrap();
        assert_eq!(matched, 0);

        let matched = store
            .update_one(
                "users",
                &Filter::new().eq("_id", "u1"),
                &Update::new().set("username", "z").set("_id", "hijack"),
            )
            .await
            .unwrap();
        assert_eq!(matched, 1);
        let u1 = store
            .find_one("users", &Filter::new().eq("_id", "u1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(u1["username"], "z");

        assert_eq!(
            store
                .delete_one("users", &Filter::new().eq("_id", "missing"))
                .await
                .unwrap(),
            0
        );
        assert_eq!(
            store
                .delete_one("users", &Filter::new().eq("_id", "u2"))
                .await
                .unwrap(),
            1
        );
        assert_eq!(store.len("users"), 1);
    }

    #[tokio::test]
    async fn test_duplicate_and_missing_id() {
        let store = MemoryStore::new();
        store
            .insert_one("products", doc(json!({"_id": "p1"})))
            .await
            .unwrap();
        assert!(matches!(
            store.insert_one("products", doc(json!({"_id": "p1"}))).await,
            Err(StoreError::Duplicate(_))
        ));
        assert!(matches!(
            store.insert_one("products", doc(json!({"name": "x"}))).await,
            Err(StoreError::MissingId)
        ));
    }

    #[tokio::test]
    async fn test_unknown_collection_is_empty() {
        let store = MemoryStore::new();
        assert!(store.find("nope", &Filter::new()).await.unwrap().is_empty());
        assert_eq!(
            store
                .update_one("nope", &Filter::new(), &Update::new().set("a", 1))
                .await
                .unwrap(),
            0
        );
    }
}
