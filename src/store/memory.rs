//! In-memory document store used by the test suite.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use super::{DocumentStore, Filter, Ordering, Page, StoreError, StoredDocument};

#[derive(Clone, Default)]
pub struct MemStore {
    inner: Arc<RwLock<HashMap<(String, Uuid), StoredDocument>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(doc: &StoredDocument, filters: &[Filter]) -> bool {
    filters.iter().all(|f| {
        let field = doc.fields.get(&f.field).unwrap_or(&Value::Null);
        if f.value.is_null() {
            field.is_null()
        } else {
            field == &f.value
        }
    })
}

fn sort_key(doc: &StoredDocument, field: &str) -> String {
    match field {
        "created_at" => doc.created_at.to_rfc3339(),
        "updated_at" => doc.updated_at.to_rfc3339(),
        _ => match doc.fields.get(field) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        },
    }
}

#[async_trait]
impl DocumentStore for MemStore {
    async fn create(
        &self,
        collection: &str,
        id: Uuid,
        fields: Value,
        permissions: Vec<String>,
    ) -> Result<StoredDocument, StoreError> {
        let mut map = self.inner.write().unwrap();
        let key = (collection.to_string(), id);
        if map.contains_key(&key) {
            return Err(StoreError::Conflict(format!("{collection}/{id}")));
        }
        let now = Utc::now();
        let doc = StoredDocument {
            collection: collection.to_string(),
            id,
            fields,
            permissions,
            created_at: now,
            updated_at: now,
        };
        map.insert(key, doc.clone());
        Ok(doc)
    }

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<StoredDocument>, StoreError> {
        let map = self.inner.read().unwrap();
        Ok(map.get(&(collection.to_string(), id)).cloned())
    }

    async fn list(
        &self,
        collection: &str,
        filters: &[Filter],
        order: Option<&Ordering>,
        page: Page,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let map = self.inner.read().unwrap();
        let mut docs: Vec<StoredDocument> = map
            .values()
            .filter(|d| d.collection == collection && matches(d, filters))
            .cloned()
            .collect();

        match order {
            Some(o) => {
                docs.sort_by_key(|d| sort_key(d, &o.field));
                if o.descending {
                    docs.reverse();
                }
            }
            None => {
                docs.sort_by_key(|d| d.created_at);
                docs.reverse();
            }
        }

        let start = (page.offset.max(0) as usize).min(docs.len());
        let end = (start + page.limit.max(0) as usize).min(docs.len());
        Ok(docs[start..end].to_vec())
    }

    async fn update(
        &self,
        collection: &str,
        id: Uuid,
        fields: Value,
    ) -> Result<StoredDocument, StoreError> {
        let mut map = self.inner.write().unwrap();
        let doc = map
            .get_mut(&(collection.to_string(), id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id,
            })?;

        if let (Value::Object(target), Value::Object(patch)) = (&mut doc.fields, fields) {
            for (k, v) in patch {
                target.insert(k, v);
            }
        }
        doc.updated_at = Utc::now();
        Ok(doc.clone())
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<(), StoreError> {
        let mut map = self.inner.write().unwrap();
        map.remove(&(collection.to_string(), id))
            .map(|_| ())
            .ok_or(StoreError::NotFound {
                collection: collection.to_string(),
                id,
            })
    }
}
