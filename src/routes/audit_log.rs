use axum::{extract::{Query, State}, Json};
use serde_json::{json, Value};

use crate::context::AuthorizationContext;
use crate::error::AppError;
use crate::models::audit::{AuditAction, AuditLogEntry, AuditLogQuery};
use crate::scoped::ScopedStore;
use crate::services::audit::{self, AuditEntry};
use crate::store::{Ordering, Page};
use crate::AppState;

pub async fn list_audit_log(
    State(state): State<AppState>,
    ctx: AuthorizationContext,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<Vec<AuditLogEntry>>, AppError> {
    let scoped = ScopedStore::new(state.store.as_ref(), &ctx);
    let entries = audit::list(&scoped, &query).await?;
    Ok(Json(entries))
}

const EXPORT_CAP: usize = 10_000;

/// Full tenant-wide dump for compliance reviews. The export itself is an
/// audited action.
pub async fn export_audit_log(
    State(state): State<AppState>,
    ctx: AuthorizationContext,
) -> Result<Json<Value>, AppError> {
    if !ctx.role.is_advisor_side() {
        return Err(AppError::Forbidden);
    }
    let scoped = ScopedStore::new(state.store.as_ref(), &ctx);

    let mut entries: Vec<AuditLogEntry> = Vec::new();
    loop {
        let batch = scoped
            .list::<AuditLogEntry>(
                None,
                &[],
                Some(&Ordering::asc("created_at")),
                Page::new(200, entries.len() as i64),
            )
            .await?;
        let batch_len = batch.len();
        entries.extend(batch);
        if batch_len < 200 || entries.len() >= EXPORT_CAP {
            break;
        }
    }
    let truncated = entries.len() >= EXPORT_CAP;

    audit::log(
        state.store.clone(),
        AuditEntry {
            tenant_id: ctx.tenant_id,
            organization_id: None,
            user_id: Some(ctx.user_id),
            user_name: None,
            action: AuditAction::Export,
            resource_type: Some("audit_log".into()),
            resource_id: None,
        },
    );

    Ok(Json(json!({ "entries": entries, "truncated": truncated })))
}
