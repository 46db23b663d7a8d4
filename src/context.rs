//! Authorization context assembly.
//!
//! Every business operation runs against an [`AuthorizationContext`]
//! produced here. Assembly is total: it yields either a real context or a
//! typed failure, never a placeholder, and never retries a step.

use uuid::Uuid;

use crate::directory::Directory;
use crate::error::AppError;
use crate::identity::{IdentityError, IdentityProvider};
use crate::middleware::host::HostRoute;
use crate::models::user::UserRole;

#[derive(Debug, Clone)]
pub struct AuthorizationContext {
    pub tenant_id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub role: UserRole,
    pub subdomain: String,
}

/// Five steps in strict order, short-circuiting on the first failure.
///
/// The final cross-check is the load-bearing invariant of the whole
/// system: a principal with a membership in tenant A browsing tenant B's
/// subdomain must never receive a context scoped to B.
pub async fn assemble(
    directory: &Directory,
    identity: &dyn IdentityProvider,
    route: &HostRoute,
    credential: Option<&str>,
) -> Result<AuthorizationContext, AppError> {
    // 1. Tenant slug from the host.
    let slug = match route {
        HostRoute::Tenant(slug) => slug.clone(),
        HostRoute::Root => return Err(AppError::NoTenantInRequest),
    };

    // 2. Principal from the session credential.
    let credential = credential.ok_or(AppError::Unauthenticated)?;
    let principal = match identity.resolve_session(credential).await {
        Ok(Some(principal)) => principal,
        Ok(None) => return Err(AppError::Unauthenticated),
        Err(IdentityError::Unavailable(msg)) => {
            tracing::error!(%slug, error = %msg, "identity provider unreachable");
            return Err(AppError::AuthProviderUnavailable);
        }
        Err(e) => return Err(AppError::Internal(e.to_string())),
    };

    // 3. Tenant record. A suspended or inactive tenant is served the same
    // answer as a missing one.
    let tenant = directory
        .tenant_by_slug(&slug)
        .await?
        .filter(|t| t.is_active())
        .ok_or_else(|| AppError::TenantNotFound { slug: slug.clone() })?;

    // 4. Membership of the principal.
    let membership = directory
        .membership_by_identity(principal.id)
        .await?
        .ok_or_else(|| {
            tracing::warn!(%slug, identity = %principal.id, "no membership for principal");
            AppError::MembershipNotFound {
                identity_id: principal.id.to_string(),
            }
        })?;

    // 5. Cross-check. Not skippable, not cacheable across tenants.
    if membership.tenant.id != tenant.id {
        tracing::warn!(
            %slug,
            identity = %principal.id,
            member_of = %membership.tenant.slug,
            "cross-tenant access attempt"
        );
        return Err(AppError::TenantMismatch { slug });
    }

    Ok(AuthorizationContext {
        tenant_id: tenant.id,
        organization_id: membership.organization.id,
        user_id: membership.user.id,
        role: membership.user.role,
        subdomain: slug,
    })
}
