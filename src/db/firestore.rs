// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed document store.
//!
//! Equality predicates are pushed down to Firestore; array predicates
//! and `AnyOf` are evaluated on the returned documents. Documents are
//! keyed by their `_id` field, which is also stored in the body.

use super::{document_id, Document, DocumentStore, Filter, Predicate, StoreError, Update};
use async_trait::async_trait;
use serde_json::Value;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

fn backend(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, StoreError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| backend(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, StoreError> {
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| backend(format!("Failed to connect to Firestore Emulator: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore emulator");

        Ok(Self { client })
    }

    /// Run a query with the pushable part of `filter`, then apply the rest locally.
    async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let pushed: Vec<(String, Value)> = filter
            .predicates()
            .iter()
            .filter_map(|p| match p {
                Predicate::Eq(field, value) if is_scalar(value) => {
                    Some((field.clone(), value.clone()))
                }
                _ => None,
            })
            .collect();

        let docs: Vec<Document> = self
            .client
            .fluent()
            .select()
            .from(collection)
            .filter(move |q| {
                q.for_all(pushed.iter().map(|(field, value)| match value {
                    Value::String(s) => q.field(field.as_str()).eq(s.clone()),
                    Value::Bool(b) => q.field(field.as_str()).eq(*b),
                    Value::Number(n) => match n.as_i64() {
                        Some(i) => q.field(field.as_str()).eq(i),
                        None => q.field(field.as_str()).eq(n.as_f64().unwrap_or_default()),
                    },
                    _ => None,
                }))
            })
            .obj()
            .query()
            .await
            .map_err(backend)?;

        Ok(docs.into_iter().filter(|d| filter.matches(d)).collect())
    }

    async fn write(&self, collection: &str, id: &str, document: &Document) -> Result<(), StoreError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(document)
            .execute()
            .await
            .map_err(backend)?;
        Ok(())
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Bool(_) | Value::Number(_))
}

#[async_trait]
impl DocumentStore for FirestoreDb {
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        self.query(collection, filter).await
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self.query(collection, filter).await?.into_iter().next())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<u64, StoreError> {
        let Some(mut doc) = self.find_one(collection, filter).await? else {
            return Ok(0);
        };
        let id = document_id(&doc)?.to_string();
        update.apply(&mut doc);
        doc.insert(super::collections::fields::ID.to_string(), Value::String(id.clone()));

        self.write(collection, &id, &doc).await?;
        Ok(1)
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let Some(doc) = self.find_one(collection, filter).await? else {
            return Ok(0);
        };
        let id = document_id(&doc)?;

        self.client
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .execute()
            .await
            .map_err(backend)?;
        Ok(1)
    }

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<String, StoreError> {
        let id = document_id(&document)?.to_string();

        let existing: Option<Document> = self
            .client
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(&id)
            .await
            .map_err(backend)?;
        if existing.is_some() {
            return Err(StoreError::Duplicate(id));
        }

        self.write(collection, &id, &document).await?;
        Ok(id)
    }
}
