// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use marketplace_api::auth::Role;
use marketplace_api::config::Config;
use marketplace_api::db::{
    self, collections, Document, DocumentStore, Filter, MemoryStore, StoreError, Update,
};
use marketplace_api::models::{RecordId, StoreInfo, StoreStatus, User, UserRole};
use marketplace_api::routes::create_router;
use marketplace_api::services::password::hash_password;
use marketplace_api::services::Mailer;
use marketplace_api::AppState;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Password every seeded account is created with.
#[allow(dead_code)]
pub const PASSWORD: &str = "correct-horse-battery";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// In-memory store that counts every operation routed through it.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    calls: AtomicUsize,
}

impl CountingStore {
    #[allow(dead_code)]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        self.tick();
        self.inner.find(collection, filter).await
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        self.tick();
        self.inner.find_one(collection, filter).await
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<u64, StoreError> {
        self.tick();
        self.inner.update_one(collection, filter, update).await
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        self.tick();
        self.inner.delete_one(collection, filter).await
    }

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<String, StoreError> {
        self.tick();
        self.inner.insert_one(collection, document).await
    }
}

/// One captured outbound email.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mailer that keeps every message for inspection.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingMailer {
    #[allow(dead_code)]
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// Router plus handles on its store and mailer.
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub store: Arc<CountingStore>,
    pub mailer: Arc<RecordingMailer>,
}

/// Create a test app backed by the in-memory store.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    let store = Arc::new(CountingStore::default());
    let mailer = Arc::new(RecordingMailer::default());
    let state = Arc::new(AppState::new(
        Config::test_default(),
        store.clone(),
        mailer.clone(),
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        mailer,
    }
}

#[allow(dead_code)]
impl TestApp {
    /// Insert an account directly, bypassing the API and the call counter.
    pub async fn seed_user(&self, username: &str, email: &str, roles: &[UserRole]) -> String {
        let id = RecordId::generate().unwrap().to_string();
        let sells = roles.contains(&UserRole::Seller);
        let user = User {
            id: id.clone(),
            username: username.to_string(),
            email: email.to_string(),
            password: hash_password(PASSWORD).await.unwrap(),
            roles: roles.to_vec(),
            store_status: sells.then_some(StoreStatus::Approved),
            store_info: sells.then(|| StoreInfo {
                store_name: format!("Toko {}", username),
                nik: "3174000000000001".to_string(),
                ..Default::default()
            }),
            suspended: false,
            reset_token: None,
            reset_token_expiry: None,
            reset_attempts: 0,
            created_at: String::new(),
        };
        self.store
            .inner
            .insert_one(collections::USERS, db::to_document(&user).unwrap())
            .await
            .unwrap();
        id
    }

    /// Insert a product owned by `seller_id`.
    pub async fn seed_product(&self, seller_id: &str, name: &str) -> String {
        let id = RecordId::generate().unwrap().to_string();
        let product = serde_json::json!({
            "_id": id,
            "seller_id": seller_id,
            "name": name,
            "price": 25000,
            "stock": 10,
        });
        let Value::Object(document) = product else {
            unreachable!()
        };
        self.store
            .inner
            .insert_one(collections::PRODUCTS, document)
            .await
            .unwrap();
        id
    }

    /// Raw stored document, bypassing the call counter.
    pub async fn stored(&self, collection: &str, id: &str) -> Option<Document> {
        self.store
            .inner
            .find_one(collection, &Filter::new().eq("_id", id))
            .await
            .unwrap()
    }

    /// Session token for `user_id`; sellers carry their own id as seller id.
    pub fn token(&self, user_id: &str, role: Role) -> String {
        let seller_id = role.can_sell().then_some(user_id);
        self.state.tokens.issue(user_id, role, seller_id).unwrap()
    }

    /// Send a request and decode the JSON response body (`Null` if empty).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}
