//! Tenant/organization directory: read-heavy keyed lookups used by the
//! context assembler. Mutations belong to the registration and invitation
//! flows, never here.

use std::sync::Arc;

use uuid::Uuid;

use crate::models::{organization::Organization, tenant::Tenant, user::{User, UserStatus}};
use crate::store::{DocumentStore, Filter, Page, StoreError};

/// The resolved binding of a principal to one organization within one
/// tenant.
#[derive(Debug, Clone)]
pub struct Membership {
    pub user: User,
    pub organization: Organization,
    pub tenant: Tenant,
}

#[derive(Clone)]
pub struct Directory {
    store: Arc<dyn DocumentStore>,
}

impl Directory {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn tenant_by_slug(&self, slug: &str) -> Result<Option<Tenant>, StoreError> {
        let docs = self
            .store
            .list(
                Tenant::COLLECTION,
                &[Filter::eq("slug", slug.to_lowercase())],
                None,
                Page::new(1, 0),
            )
            .await?;
        docs.first().map(|d| d.decode()).transpose()
    }

    pub async fn tenant_by_id(&self, id: Uuid) -> Result<Option<Tenant>, StoreError> {
        let doc = self.store.get(Tenant::COLLECTION, id).await?;
        doc.map(|d| d.decode()).transpose()
    }

    /// Resolve the membership a principal holds. A user always belongs to
    /// exactly one organization and, transitively, one tenant; anything
    /// dangling resolves to `None` (fail closed) with an operational
    /// warning, never to a partial membership.
    pub async fn membership_by_identity(
        &self,
        identity_id: Uuid,
    ) -> Result<Option<Membership>, StoreError> {
        let docs = self
            .store
            .list(
                User::COLLECTION,
                &[Filter::eq("identity_id", serde_json::json!(identity_id))],
                None,
                Page::new(1, 0),
            )
            .await?;
        let Some(doc) = docs.first() else {
            return Ok(None);
        };
        let user: User = doc.decode()?;

        if user.status != UserStatus::Active {
            return Ok(None);
        }

        let organization = self
            .store
            .get(Organization::COLLECTION, user.organization_id)
            .await?
            .map(|d| d.decode::<Organization>())
            .transpose()?;
        let tenant = self.tenant_by_id(user.tenant_id).await?;

        match (organization, tenant) {
            (Some(organization), Some(tenant)) => Ok(Some(Membership {
                user,
                organization,
                tenant,
            })),
            _ => {
                tracing::warn!(
                    user_id = %user.id,
                    tenant_id = %user.tenant_id,
                    "membership references a missing organization or tenant"
                );
                Ok(None)
            }
        }
    }
}
