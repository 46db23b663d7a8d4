use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::audit::AuditAction;
use crate::models::checklist::ChecklistItem;
use crate::models::document::{CreateDocumentRequest, Document, DocumentQuery, RETENTION_YEARS};
use crate::scoped::ScopedStore;
use crate::services::audit::{self, AuditEntry};
use crate::store::{DocumentStore, Filter, Ordering, Page};

pub struct DocumentService;

impl DocumentService {
    /// Record metadata for an uploaded file against a checklist item. The
    /// bytes were already handed to the storage collaborator; `file_id` is
    /// its opaque reference.
    pub async fn create(
        store: &Arc<dyn DocumentStore>,
        scoped: &ScopedStore<'_>,
        req: CreateDocumentRequest,
    ) -> Result<Document, AppError> {
        if req.file_id.trim().is_empty() || req.original_filename.trim().is_empty() {
            return Err(AppError::Validation("Dateiangaben fehlen.".into()));
        }
        if req.size_bytes <= 0 {
            return Err(AppError::Validation("Ungültige Dateigröße.".into()));
        }

        let ctx = scoped.ctx();
        // Scope check on the target item; the document inherits its
        // organization.
        let item: ChecklistItem = scoped.get(req.checklist_item_id).await?;

        let document = Document {
            id: Uuid::new_v4(),
            tenant_id: ctx.tenant_id,
            organization_id: item.organization_id,
            checklist_item_id: item.id,
            uploaded_by: ctx.user_id,
            file_id: req.file_id.trim().to_string(),
            original_filename: req.original_filename.trim().to_string(),
            content_type: req.content_type,
            size_bytes: req.size_bytes,
            retention_until: Utc::now() + Duration::days(365 * RETENTION_YEARS),
            created_at: Utc::now(),
        };
        let document = scoped.create(&document).await?;

        audit::log(
            store.clone(),
            AuditEntry {
                tenant_id: ctx.tenant_id,
                organization_id: Some(document.organization_id),
                user_id: Some(ctx.user_id),
                user_name: None,
                action: AuditAction::Upload,
                resource_type: Some("document".into()),
                resource_id: Some(document.id.to_string()),
            },
        );

        Ok(document)
    }

    pub async fn list(
        scoped: &ScopedStore<'_>,
        query: &DocumentQuery,
    ) -> Result<Vec<Document>, AppError> {
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (query.page.unwrap_or(1).max(1) - 1) * per_page;

        let mut extra = Vec::new();
        if let Some(item_id) = query.checklist_item_id {
            extra.push(Filter::eq("checklist_item_id", json!(item_id)));
        }

        scoped
            .list::<Document>(
                query.organization_id,
                &extra,
                Some(&Ordering::desc("created_at")),
                Page::new(per_page, offset),
            )
            .await
    }

    /// Resolve a document for download and record the access.
    pub async fn download(
        store: &Arc<dyn DocumentStore>,
        scoped: &ScopedStore<'_>,
        id: Uuid,
    ) -> Result<Document, AppError> {
        let document: Document = scoped.get(id).await?;

        let ctx = scoped.ctx();
        audit::log(
            store.clone(),
            AuditEntry {
                tenant_id: ctx.tenant_id,
                organization_id: Some(document.organization_id),
                user_id: Some(ctx.user_id),
                user_name: None,
                action: AuditAction::Download,
                resource_type: Some("document".into()),
                resource_id: Some(document.id.to_string()),
            },
        );

        Ok(document)
    }

    /// Delete document metadata. Advisor-side only, and only once the
    /// retention deadline has passed.
    pub async fn delete(
        store: &Arc<dyn DocumentStore>,
        scoped: &ScopedStore<'_>,
        id: Uuid,
    ) -> Result<(), AppError> {
        let ctx = scoped.ctx();
        if !ctx.role.is_advisor_side() {
            return Err(AppError::Forbidden);
        }

        let document: Document = scoped.get(id).await?;
        if !document.retention_expired(Utc::now()) {
            return Err(AppError::Validation(format!(
                "Der Beleg unterliegt der Aufbewahrungspflicht bis {}.",
                document.retention_until.format("%d.%m.%Y")
            )));
        }

        scoped.delete::<Document>(id).await?;

        audit::log(
            store.clone(),
            AuditEntry {
                tenant_id: ctx.tenant_id,
                organization_id: Some(document.organization_id),
                user_id: Some(ctx.user_id),
                user_name: None,
                action: AuditAction::Delete,
                resource_type: Some("document".into()),
                resource_id: Some(document.id.to_string()),
            },
        );

        Ok(())
    }
}
