//! Document-store collaborator interface.
//!
//! The persistence engine is opaque to the rest of the crate: collections of
//! JSON documents addressed by name + id, with equality filters, a single
//! ordering predicate and offset/limit pagination. Scoping rules live in
//! [`crate::scoped`], never here.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: Uuid },

    #[error("duplicate document: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Equality predicate on a named top-level field.
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Ordering {
    pub field: String,
    pub descending: bool,
}

impl Ordering {
    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: true,
        }
    }

    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

impl Page {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: limit.clamp(1, 200),
            offset: offset.max(0),
        }
    }
}

/// A persisted document. `fields` always contains the record's own `id`;
/// the envelope id is kept equal to it by every [`DocumentStore`]
/// implementation.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub collection: String,
    pub id: Uuid,
    pub fields: Value,
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredDocument {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        Ok(serde_json::from_value(self.fields.clone())?)
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document. Fails with [`StoreError::Conflict`] if the id
    /// already exists in the collection.
    async fn create(
        &self,
        collection: &str,
        id: Uuid,
        fields: Value,
        permissions: Vec<String>,
    ) -> Result<StoredDocument, StoreError>;

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<StoredDocument>, StoreError>;

    async fn list(
        &self,
        collection: &str,
        filters: &[Filter],
        order: Option<&Ordering>,
        page: Page,
    ) -> Result<Vec<StoredDocument>, StoreError>;

    /// Merge `fields` into the document's existing top-level fields.
    async fn update(
        &self,
        collection: &str,
        id: Uuid,
        fields: Value,
    ) -> Result<StoredDocument, StoreError>;

    async fn delete(&self, collection: &str, id: Uuid) -> Result<(), StoreError>;
}

/// Filter field names are developer-supplied constants, but they are spliced
/// into SQL by the Postgres backend, so reject anything that is not a plain
/// identifier.
pub(crate) fn is_safe_field(field: &str) -> bool {
    !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
