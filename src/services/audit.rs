use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::audit::{AuditAction, AuditLogEntry, AuditLogQuery};
use crate::scoped::ScopedStore;
use crate::store::{DocumentStore, Filter, Ordering, Page};

/// An audit log entry to record.
pub struct AuditEntry {
    pub tenant_id: Uuid,
    pub organization_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub user_name: Option<String>,
    pub action: AuditAction,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
}

/// Fire-and-forget audit log entry.
/// Spawns a background task — never blocks the request handler,
/// never propagates errors (logs a warning on failure).
///
/// Together with the registration flow this is the only writer that talks
/// to the store directly; the tenant id comes from an already-assembled
/// context, never from a request payload.
pub fn log(store: Arc<dyn DocumentStore>, entry: AuditEntry) {
    let record = AuditLogEntry {
        id: Uuid::new_v4(),
        tenant_id: entry.tenant_id,
        organization_id: entry.organization_id,
        user_id: entry.user_id,
        user_name: entry.user_name,
        action: entry.action,
        resource_type: entry.resource_type,
        resource_id: entry.resource_id,
        created_at: Utc::now(),
    };

    tokio::spawn(async move {
        let fields = match serde_json::to_value(&record) {
            Ok(fields) => fields,
            Err(e) => {
                tracing::warn!("audit entry serialization failed: {e}");
                return;
            }
        };
        let perms = vec![format!("tenant:{}", record.tenant_id)];
        if let Err(e) = store
            .create(AuditLogEntry::COLLECTION, record.id, fields, perms)
            .await
        {
            tracing::warn!(tenant = %record.tenant_id, "audit log insert failed: {e}");
        }
    });
}

pub async fn list(
    scoped: &ScopedStore<'_>,
    query: &AuditLogQuery,
) -> Result<Vec<AuditLogEntry>, AppError> {
    if !scoped.ctx().role.is_advisor_side() {
        return Err(AppError::Forbidden);
    }

    let mut extra = Vec::new();
    if let Some(action) = query.action {
        extra.push(Filter::eq("action", json!(action)));
    }

    let per_page = query.per_page.unwrap_or(50).clamp(1, 200);
    let offset = (query.page.unwrap_or(1).max(1) - 1) * per_page;

    scoped
        .list::<AuditLogEntry>(
            None,
            &extra,
            Some(&Ordering::desc("created_at")),
            Page::new(per_page, offset),
        )
        .await
}

/// GDPR erasure for audit data: strip the recorded name from a user's
/// entries and keep the rows. The user id stays as a pseudonym so the
/// trail remains coherent. This is the single sanctioned mutation of
/// audit entries.
pub async fn pseudonymize_user(
    store: &dyn DocumentStore,
    tenant_id: Uuid,
    user_id: Uuid,
) -> Result<usize, AppError> {
    let filters = [
        Filter::eq("tenant_id", json!(tenant_id)),
        Filter::eq("user_id", json!(user_id)),
    ];

    let mut scrubbed = 0;
    loop {
        // The update does not change filter membership, so plain offset
        // paging walks the full set.
        let docs = store
            .list(
                AuditLogEntry::COLLECTION,
                &filters,
                None,
                Page::new(200, scrubbed as i64),
            )
            .await?;
        if docs.is_empty() {
            break;
        }
        let batch = docs.len();
        for doc in docs {
            store
                .update(
                    AuditLogEntry::COLLECTION,
                    doc.id,
                    json!({ "user_name": null }),
                )
                .await?;
        }
        scrubbed += batch;
        if batch < 200 {
            break;
        }
    }
    Ok(scrubbed)
}
