//! Scoped data access layer.
//!
//! Every read and write of tenant-owned records goes through
//! [`ScopedStore`], parameterized by the caller's [`AuthorizationContext`].
//! The tenant filter is injected unconditionally; client roles additionally
//! have the organization filter pinned to their own membership, whatever a
//! caller passed in. Scope misses surface as not-found, never as forbidden.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::context::AuthorizationContext;
use crate::error::AppError;
use crate::models::{
    audit::AuditLogEntry,
    checklist::{Checklist, ChecklistItem},
    document::Document,
    organization::{OrgStatus, Organization},
    user::{InvitationToken, User},
};
use crate::store::{DocumentStore, Filter, Ordering, Page, StoreError};

/// A record the scoped layer knows how to guard.
pub trait ScopedRecord: Serialize + DeserializeOwned {
    const COLLECTION: &'static str;

    /// Field carrying the organization scope. Organizations scope by their
    /// own id.
    const ORG_FIELD: &'static str = "organization_id";

    /// Whether client roles may ever write records of this kind. Reads are
    /// governed by scope alone.
    const CLIENT_WRITABLE: bool = true;

    fn record_id(&self) -> Uuid;
    fn record_tenant_id(&self) -> Uuid;
    fn record_organization_id(&self) -> Option<Uuid>;
}

impl ScopedRecord for Checklist {
    const COLLECTION: &'static str = Checklist::COLLECTION;

    fn record_id(&self) -> Uuid {
        self.id
    }
    fn record_tenant_id(&self) -> Uuid {
        self.tenant_id
    }
    fn record_organization_id(&self) -> Option<Uuid> {
        Some(self.organization_id)
    }
}

impl ScopedRecord for ChecklistItem {
    const COLLECTION: &'static str = ChecklistItem::COLLECTION;

    fn record_id(&self) -> Uuid {
        self.id
    }
    fn record_tenant_id(&self) -> Uuid {
        self.tenant_id
    }
    fn record_organization_id(&self) -> Option<Uuid> {
        Some(self.organization_id)
    }
}

impl ScopedRecord for Document {
    const COLLECTION: &'static str = Document::COLLECTION;

    fn record_id(&self) -> Uuid {
        self.id
    }
    fn record_tenant_id(&self) -> Uuid {
        self.tenant_id
    }
    fn record_organization_id(&self) -> Option<Uuid> {
        Some(self.organization_id)
    }
}

impl ScopedRecord for Organization {
    const COLLECTION: &'static str = Organization::COLLECTION;
    const ORG_FIELD: &'static str = "id";
    const CLIENT_WRITABLE: bool = false;

    fn record_id(&self) -> Uuid {
        self.id
    }
    fn record_tenant_id(&self) -> Uuid {
        self.tenant_id
    }
    fn record_organization_id(&self) -> Option<Uuid> {
        Some(self.id)
    }
}

impl ScopedRecord for User {
    const COLLECTION: &'static str = User::COLLECTION;
    const CLIENT_WRITABLE: bool = false;

    fn record_id(&self) -> Uuid {
        self.id
    }
    fn record_tenant_id(&self) -> Uuid {
        self.tenant_id
    }
    fn record_organization_id(&self) -> Option<Uuid> {
        Some(self.organization_id)
    }
}

impl ScopedRecord for InvitationToken {
    const COLLECTION: &'static str = InvitationToken::COLLECTION;

    fn record_id(&self) -> Uuid {
        self.id
    }
    fn record_tenant_id(&self) -> Uuid {
        self.tenant_id
    }
    fn record_organization_id(&self) -> Option<Uuid> {
        Some(self.organization_id)
    }
}

impl ScopedRecord for AuditLogEntry {
    const COLLECTION: &'static str = AuditLogEntry::COLLECTION;

    fn record_id(&self) -> Uuid {
        self.id
    }
    fn record_tenant_id(&self) -> Uuid {
        self.tenant_id
    }
    fn record_organization_id(&self) -> Option<Uuid> {
        self.organization_id
    }
}

pub struct ScopedStore<'a> {
    store: &'a dyn DocumentStore,
    ctx: &'a AuthorizationContext,
}

impl<'a> ScopedStore<'a> {
    pub fn new(store: &'a dyn DocumentStore, ctx: &'a AuthorizationContext) -> Self {
        Self { store, ctx }
    }

    pub fn ctx(&self) -> &AuthorizationContext {
        self.ctx
    }

    /// Role-based organization scope: advisor-side callers may pass any
    /// organization (or none for tenant-wide queries); client roles are
    /// pinned to their own organization regardless of the parameter.
    fn effective_org(&self, requested: Option<Uuid>) -> Option<Uuid> {
        if self.ctx.role.is_advisor_side() {
            requested
        } else {
            Some(self.ctx.organization_id)
        }
    }

    fn check_ownership<T: ScopedRecord>(&self, record: &T) -> Result<(), AppError> {
        if record.record_tenant_id() != self.ctx.tenant_id {
            tracing::warn!(
                collection = T::COLLECTION,
                record = %record.record_id(),
                user = %self.ctx.user_id,
                "cross-tenant record access suppressed"
            );
            return Err(AppError::NotFound);
        }
        if !self.ctx.role.is_advisor_side()
            && record.record_organization_id() != Some(self.ctx.organization_id)
        {
            return Err(AppError::OrganizationScopeViolation);
        }
        Ok(())
    }

    fn check_writable<T: ScopedRecord>(&self) -> Result<(), AppError> {
        if !T::CLIENT_WRITABLE && !self.ctx.role.is_advisor_side() {
            return Err(AppError::Forbidden);
        }
        Ok(())
    }

    fn permissions(&self, organization_id: Option<Uuid>) -> Vec<String> {
        let mut perms = vec![format!("tenant:{}", self.ctx.tenant_id)];
        if let Some(org) = organization_id {
            perms.push(format!("org:{org}"));
        }
        perms
    }

    pub async fn list<T: ScopedRecord>(
        &self,
        requested_org: Option<Uuid>,
        extra: &[Filter],
        order: Option<&Ordering>,
        page: Page,
    ) -> Result<Vec<T>, AppError> {
        let mut filters = vec![Filter::eq("tenant_id", json!(self.ctx.tenant_id))];
        if let Some(org) = self.effective_org(requested_org) {
            filters.push(Filter::eq(T::ORG_FIELD, json!(org)));
        }
        filters.extend_from_slice(extra);

        let docs = self.store.list(T::COLLECTION, &filters, order, page).await?;
        let mut records = Vec::with_capacity(docs.len());
        for doc in docs {
            records.push(doc.decode::<T>()?);
        }
        Ok(records)
    }

    /// Fetch by id and re-validate scope on the result. A record outside
    /// the caller's scope answers exactly like a missing one.
    pub async fn get<T: ScopedRecord>(&self, id: Uuid) -> Result<T, AppError> {
        let doc = self
            .store
            .get(T::COLLECTION, id)
            .await?
            .ok_or(AppError::NotFound)?;
        let record: T = doc.decode()?;
        self.check_ownership(&record)?;
        Ok(record)
    }

    /// Insert a record with identifiers stamped from the context: the
    /// tenant id always, the organization id for client roles. A
    /// caller-supplied tenant or organization field in the payload never
    /// survives this.
    pub async fn create<T: ScopedRecord>(&self, record: &T) -> Result<T, AppError> {
        self.check_writable::<T>()?;

        let mut fields = serde_json::to_value(record).map_err(StoreError::from)?;
        let obj = fields
            .as_object_mut()
            .ok_or_else(|| AppError::Internal("record did not serialize to an object".into()))?;
        obj.insert("tenant_id".into(), json!(self.ctx.tenant_id));
        if !self.ctx.role.is_advisor_side() {
            obj.insert(T::ORG_FIELD.into(), json!(self.ctx.organization_id));
        }

        // Advisor-side callers choose the target organization, but only
        // among this tenant's active organizations.
        let org = obj
            .get(T::ORG_FIELD)
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok());
        if T::ORG_FIELD == "organization_id" {
            if let Some(org) = org {
                if org != self.ctx.organization_id {
                    self.assert_org_in_tenant(org).await?;
                }
            }
        }

        let id = record.record_id();
        let created = self
            .store
            .create(T::COLLECTION, id, fields, self.permissions(org))
            .await?;
        Ok(created.decode()?)
    }

    /// Merge-update after re-verifying ownership. Scope and identity fields
    /// are stripped from the patch, they are not updatable through this
    /// layer.
    pub async fn update<T: ScopedRecord>(&self, id: Uuid, mut patch: Value) -> Result<T, AppError> {
        self.check_writable::<T>()?;
        let _current: T = self.get(id).await?;

        if let Some(obj) = patch.as_object_mut() {
            obj.remove("id");
            obj.remove("tenant_id");
            obj.remove(T::ORG_FIELD);
            obj.remove("created_at");
        }

        match self.store.update(T::COLLECTION, id, patch).await {
            Ok(doc) => Ok(doc.decode()?),
            // Deleted between the ownership check and the write.
            Err(StoreError::NotFound { .. }) => Err(AppError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete after re-verifying ownership.
    pub async fn delete<T: ScopedRecord>(&self, id: Uuid) -> Result<(), AppError> {
        self.check_writable::<T>()?;
        let _current: T = self.get(id).await?;

        match self.store.delete(T::COLLECTION, id).await {
            Ok(()) | Err(StoreError::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn assert_org_in_tenant(&self, org_id: Uuid) -> Result<(), AppError> {
        let doc = self
            .store
            .get(Organization::COLLECTION, org_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let org: Organization = doc.decode()?;
        if org.tenant_id != self.ctx.tenant_id || org.status != OrgStatus::Active {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
