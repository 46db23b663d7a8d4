//! Postgres-backed document store. All collections share a single JSONB
//! table; equality filters become `data->>'field'` comparisons.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use super::{is_safe_field, DocumentStore, Filter, Ordering, Page, StoreError, StoredDocument};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn row_to_document(row: PgRow) -> Result<StoredDocument, StoreError> {
    Ok(StoredDocument {
        collection: row.try_get("collection").map_err(map_sqlx)?,
        id: row.try_get("id").map_err(map_sqlx)?,
        fields: row.try_get("data").map_err(map_sqlx)?,
        permissions: row.try_get("permissions").map_err(map_sqlx)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(map_sqlx)?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at").map_err(map_sqlx)?,
    })
}

fn map_sqlx(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Tls(_) => StoreError::Unavailable(e.to_string()),
        _ => StoreError::Other(e.to_string()),
    }
}

/// Render a filter value the way `data->>'field'` renders it: JSON strings
/// compare by their content, everything else by its JSON text.
fn filter_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

const DOC_COLS: &str = "collection, id, data, permissions, created_at, updated_at";

#[async_trait]
impl DocumentStore for PgStore {
    async fn create(
        &self,
        collection: &str,
        id: Uuid,
        fields: Value,
        permissions: Vec<String>,
    ) -> Result<StoredDocument, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO app_documents (collection, id, data, permissions)
             VALUES ($1, $2, $3, $4)
             RETURNING {DOC_COLS}"
        ))
        .bind(collection)
        .bind(id)
        .bind(&fields)
        .bind(&permissions)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return StoreError::Conflict(format!("{collection}/{id}"));
                }
            }
            map_sqlx(e)
        })?;

        row_to_document(row)
    }

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<StoredDocument>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {DOC_COLS} FROM app_documents WHERE collection = $1 AND id = $2"
        ))
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.map(row_to_document).transpose()
    }

    async fn list(
        &self,
        collection: &str,
        filters: &[Filter],
        order: Option<&Ordering>,
        page: Page,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        for f in filters {
            if !is_safe_field(&f.field) {
                return Err(StoreError::Other(format!("invalid filter field: {}", f.field)));
            }
        }
        if let Some(o) = order {
            if !is_safe_field(&o.field) {
                return Err(StoreError::Other(format!("invalid order field: {}", o.field)));
            }
        }

        let mut sql = format!("SELECT {DOC_COLS} FROM app_documents WHERE collection = $1");
        let mut arg = 2;
        for f in filters {
            if f.value.is_null() {
                sql.push_str(&format!(" AND data->>'{}' IS NULL", f.field));
            } else {
                sql.push_str(&format!(" AND data->>'{}' = ${arg}", f.field));
                arg += 1;
            }
        }

        match order {
            Some(o) if o.field == "created_at" || o.field == "updated_at" => {
                sql.push_str(&format!(
                    " ORDER BY {} {}",
                    o.field,
                    if o.descending { "DESC" } else { "ASC" }
                ));
            }
            Some(o) => {
                sql.push_str(&format!(
                    " ORDER BY data->>'{}' {}",
                    o.field,
                    if o.descending { "DESC" } else { "ASC" }
                ));
            }
            None => sql.push_str(" ORDER BY created_at DESC"),
        }
        sql.push_str(&format!(" LIMIT ${arg} OFFSET ${}", arg + 1));

        let mut query = sqlx::query(&sql).bind(collection);
        for f in filters {
            if !f.value.is_null() {
                query = query.bind(filter_text(&f.value));
            }
        }
        query = query.bind(page.limit).bind(page.offset);

        let rows = query.fetch_all(&self.pool).await.map_err(map_sqlx)?;
        rows.into_iter().map(row_to_document).collect()
    }

    async fn update(
        &self,
        collection: &str,
        id: Uuid,
        fields: Value,
    ) -> Result<StoredDocument, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE app_documents
             SET data = data || $3, updated_at = NOW()
             WHERE collection = $1 AND id = $2
             RETURNING {DOC_COLS}"
        ))
        .bind(collection)
        .bind(id)
        .bind(&fields)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        match row {
            Some(row) => row_to_document(row),
            None => Err(StoreError::NotFound {
                collection: collection.to_string(),
                id,
            }),
        }
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM app_documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id,
            });
        }
        Ok(())
    }
}
