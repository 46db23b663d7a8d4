use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::checklist::{
    progress, Checklist, ChecklistDetailResponse, ChecklistItem, ChecklistQuery,
    ChecklistResponse, CreateChecklistRequest, CreateItemRequest, ItemStatus, Progress,
    UpdateChecklistRequest, UpdateItemStatusRequest,
};
use crate::models::document::Document;
use crate::models::organization::{OrgType, Organization};
use crate::scoped::ScopedStore;
use crate::store::{Filter, Ordering, Page};

pub struct ChecklistService;

impl ChecklistService {
    /// Create a checklist for a client organization, optionally with its
    /// initial items. Item creation failures roll the whole checklist back.
    pub async fn create(
        scoped: &ScopedStore<'_>,
        req: CreateChecklistRequest,
    ) -> Result<ChecklistDetailResponse, AppError> {
        let ctx = scoped.ctx();
        if !ctx.role.is_advisor_side() {
            return Err(AppError::Forbidden);
        }
        if req.title.trim().is_empty() {
            return Err(AppError::Validation("Der Titel ist erforderlich.".into()));
        }

        let org: Organization = scoped.get(req.organization_id).await?;
        if org.org_type != OrgType::Client {
            return Err(AppError::Validation(
                "Checklisten werden Mandanten zugeordnet, nicht der Kanzlei selbst.".into(),
            ));
        }

        let checklist = Checklist {
            id: Uuid::new_v4(),
            tenant_id: ctx.tenant_id,
            organization_id: org.id,
            title: req.title.trim().to_string(),
            description: req.description.clone(),
            fiscal_year: req.fiscal_year,
            created_by: ctx.user_id,
            created_at: Utc::now(),
        };
        let checklist = scoped.create(&checklist).await?;

        let mut items = Vec::with_capacity(req.items.len());
        for (position, item_req) in req.items.into_iter().enumerate() {
            let item = ChecklistItem {
                id: Uuid::new_v4(),
                tenant_id: ctx.tenant_id,
                organization_id: org.id,
                checklist_id: checklist.id,
                title: item_req.title,
                status: ItemStatus::Red,
                requires_document: item_req.requires_document,
                position: position as i32,
                created_at: Utc::now(),
            };
            match scoped.create(&item).await {
                Ok(item) => items.push(item),
                Err(e) => {
                    for created in &items {
                        if let Err(de) = scoped.delete::<ChecklistItem>(created.id).await {
                            tracing::error!(item = %created.id, "checklist rollback failed: {de}");
                        }
                    }
                    if let Err(de) = scoped.delete::<Checklist>(checklist.id).await {
                        tracing::error!(checklist = %checklist.id, "checklist rollback failed: {de}");
                    }
                    return Err(e);
                }
            }
        }

        let progress = progress(&items);
        Ok(ChecklistDetailResponse {
            checklist,
            progress,
            items,
        })
    }

    pub async fn list(
        scoped: &ScopedStore<'_>,
        query: &ChecklistQuery,
    ) -> Result<Vec<ChecklistResponse>, AppError> {
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (query.page.unwrap_or(1).max(1) - 1) * per_page;

        let checklists = scoped
            .list::<Checklist>(
                query.organization_id,
                &[],
                Some(&Ordering::desc("created_at")),
                Page::new(per_page, offset),
            )
            .await?;

        let mut responses = Vec::with_capacity(checklists.len());
        for checklist in checklists {
            let progress = Self::load_progress(scoped, checklist.id).await?;
            responses.push(ChecklistResponse {
                checklist,
                progress,
            });
        }
        Ok(responses)
    }

    pub async fn get(
        scoped: &ScopedStore<'_>,
        id: Uuid,
    ) -> Result<ChecklistDetailResponse, AppError> {
        let checklist: Checklist = scoped.get(id).await?;
        let items = Self::load_items(scoped, id).await?;
        let progress = progress(&items);
        Ok(ChecklistDetailResponse {
            checklist,
            progress,
            items,
        })
    }

    pub async fn update(
        scoped: &ScopedStore<'_>,
        id: Uuid,
        req: UpdateChecklistRequest,
    ) -> Result<ChecklistResponse, AppError> {
        if !scoped.ctx().role.is_advisor_side() {
            return Err(AppError::Forbidden);
        }

        let mut patch = serde_json::Map::new();
        if let Some(title) = req.title {
            if title.trim().is_empty() {
                return Err(AppError::Validation("Der Titel ist erforderlich.".into()));
            }
            patch.insert("title".into(), json!(title.trim()));
        }
        if let Some(description) = req.description {
            patch.insert("description".into(), json!(description));
        }
        if let Some(fiscal_year) = req.fiscal_year {
            patch.insert("fiscal_year".into(), json!(fiscal_year));
        }

        let checklist: Checklist = scoped.update(id, json!(patch)).await?;
        let progress = Self::load_progress(scoped, checklist.id).await?;
        Ok(ChecklistResponse {
            checklist,
            progress,
        })
    }

    /// Delete a checklist and its items. Refused while any uploaded
    /// document still references one of the items (retention).
    pub async fn delete(scoped: &ScopedStore<'_>, id: Uuid) -> Result<(), AppError> {
        if !scoped.ctx().role.is_advisor_side() {
            return Err(AppError::Forbidden);
        }
        let checklist: Checklist = scoped.get(id).await?;

        let items = Self::load_items(scoped, checklist.id).await?;
        for item in &items {
            let documents = scoped
                .list::<Document>(
                    None,
                    &[Filter::eq("checklist_item_id", json!(item.id))],
                    None,
                    Page::new(1, 0),
                )
                .await?;
            if !documents.is_empty() {
                return Err(AppError::Validation(
                    "Die Checkliste enthält Belege, die der Aufbewahrungspflicht unterliegen."
                        .into(),
                ));
            }
        }

        for item in items {
            scoped.delete::<ChecklistItem>(item.id).await?;
        }
        scoped.delete::<Checklist>(checklist.id).await?;
        Ok(())
    }

    pub async fn add_item(
        scoped: &ScopedStore<'_>,
        checklist_id: Uuid,
        req: CreateItemRequest,
    ) -> Result<ChecklistItem, AppError> {
        let ctx = scoped.ctx();
        if !ctx.role.is_advisor_side() {
            return Err(AppError::Forbidden);
        }
        if req.title.trim().is_empty() {
            return Err(AppError::Validation("Der Titel ist erforderlich.".into()));
        }

        let checklist: Checklist = scoped.get(checklist_id).await?;
        let existing = Self::load_items(scoped, checklist.id).await?;

        let item = ChecklistItem {
            id: Uuid::new_v4(),
            tenant_id: checklist.tenant_id,
            organization_id: checklist.organization_id,
            checklist_id: checklist.id,
            title: req.title.trim().to_string(),
            status: ItemStatus::Red,
            requires_document: req.requires_document,
            position: existing.len() as i32,
            created_at: Utc::now(),
        };
        scoped.create(&item).await
    }

    /// Free-form status transition on an item: any state is reachable from
    /// any other. Returns the item together with the parent's recomputed
    /// progress, derived from the items in the same operation.
    pub async fn set_item_status(
        scoped: &ScopedStore<'_>,
        item_id: Uuid,
        req: UpdateItemStatusRequest,
    ) -> Result<(ChecklistItem, Progress), AppError> {
        let item: ChecklistItem = scoped
            .update(item_id, json!({ "status": req.status }))
            .await?;
        let progress = Self::load_progress(scoped, item.checklist_id).await?;
        Ok((item, progress))
    }

    async fn load_items(
        scoped: &ScopedStore<'_>,
        checklist_id: Uuid,
    ) -> Result<Vec<ChecklistItem>, AppError> {
        scoped
            .list::<ChecklistItem>(
                None,
                &[Filter::eq("checklist_id", json!(checklist_id))],
                Some(&Ordering::asc("created_at")),
                Page::new(200, 0),
            )
            .await
    }

    async fn load_progress(
        scoped: &ScopedStore<'_>,
        checklist_id: Uuid,
    ) -> Result<Progress, AppError> {
        let items = Self::load_items(scoped, checklist_id).await?;
        Ok(progress(&items))
    }
}
