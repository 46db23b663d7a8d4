#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use kanzleihub_api::config::{Config, RESERVED_SLUGS};
use kanzleihub_api::context::{self, AuthorizationContext};
use kanzleihub_api::directory::Directory;
use kanzleihub_api::identity::store::StoreIdentityProvider;
use kanzleihub_api::identity::IdentityProvider;
use kanzleihub_api::middleware::host::HostRoute;
use kanzleihub_api::models::tenant::SignupRequest;
use kanzleihub_api::services::registration::{RegistrationOutcome, RegistrationService};
use kanzleihub_api::store::memory::MemStore;
use kanzleihub_api::store::{DocumentStore, Filter, Ordering, Page, StoreError, StoredDocument};

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".into(),
        host: "127.0.0.1".into(),
        port: 0,
        root_domain: "kanzleihub.de".into(),
        dev_root_token: "localhost".into(),
        reserved_slugs: RESERVED_SLUGS.iter().map(|s| s.to_string()).collect(),
        session_max_age_days: 30,
        production: false,
    }
}

/// In-memory store wrapper that can be told to fail creates for one
/// collection, for exercising the compensation paths.
#[derive(Clone)]
pub struct FailingStore {
    inner: MemStore,
    fail_create_on: Arc<Mutex<Option<String>>>,
}

impl FailingStore {
    pub fn new() -> Self {
        Self {
            inner: MemStore::new(),
            fail_create_on: Arc::new(Mutex::new(None)),
        }
    }

    pub fn fail_create_on(&self, collection: Option<&str>) {
        *self.fail_create_on.lock().unwrap() = collection.map(|s| s.to_string());
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn create(
        &self,
        collection: &str,
        id: Uuid,
        fields: Value,
        permissions: Vec<String>,
    ) -> Result<StoredDocument, StoreError> {
        if self.fail_create_on.lock().unwrap().as_deref() == Some(collection) {
            return Err(StoreError::Unavailable("injected failure".into()));
        }
        self.inner.create(collection, id, fields, permissions).await
    }

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<StoredDocument>, StoreError> {
        self.inner.get(collection, id).await
    }

    async fn list(
        &self,
        collection: &str,
        filters: &[Filter],
        order: Option<&Ordering>,
        page: Page,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        self.inner.list(collection, filters, order, page).await
    }

    async fn update(
        &self,
        collection: &str,
        id: Uuid,
        fields: Value,
    ) -> Result<StoredDocument, StoreError> {
        self.inner.update(collection, id, fields).await
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<(), StoreError> {
        self.inner.delete(collection, id).await
    }
}

pub struct TestEnv {
    pub store: Arc<dyn DocumentStore>,
    pub failing: FailingStore,
    pub identity: Arc<StoreIdentityProvider>,
    pub directory: Directory,
    pub config: Config,
}

pub fn env() -> TestEnv {
    let failing = FailingStore::new();
    let store: Arc<dyn DocumentStore> = Arc::new(failing.clone());
    let identity = Arc::new(StoreIdentityProvider::new(store.clone(), 30));
    let directory = Directory::new(store.clone());
    TestEnv {
        store,
        failing,
        identity,
        directory,
        config: test_config(),
    }
}

pub fn signup_request(slug: &str, email: &str) -> SignupRequest {
    SignupRequest {
        slug: slug.into(),
        name: format!("Steuerkanzlei {slug}"),
        email: email.into(),
        password: "streng-geheim-1".into(),
        first_name: "Anna".into(),
        last_name: "Beispiel".into(),
        tax_id: None,
        phone: None,
    }
}

pub async fn register_firm(env: &TestEnv, slug: &str, email: &str) -> RegistrationOutcome {
    RegistrationService::register(
        &env.store,
        env.identity.as_ref(),
        &env.config,
        signup_request(slug, email),
    )
    .await
    .expect("registration should succeed")
}

/// Log in as `email` and assemble a context for `slug`'s subdomain.
pub async fn login_ctx(
    env: &TestEnv,
    slug: &str,
    email: &str,
    password: &str,
) -> AuthorizationContext {
    let credential = env
        .identity
        .create_session(email, password)
        .await
        .expect("login should succeed");
    context::assemble(
        &env.directory,
        env.identity.as_ref(),
        &HostRoute::Tenant(slug.into()),
        Some(&credential.0),
    )
    .await
    .expect("context assembly should succeed")
}
