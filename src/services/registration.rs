//! Firm signup and client/invitation onboarding.
//!
//! Tenant + advisor organization + owner identity + owner membership are
//! one logical unit: if a later step fails, every earlier step is
//! compensated before the error surfaces. Session creation comes after the
//! unit and is best-effort.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::identity::{generate_token, token_digest, IdentityError, IdentityProvider, SessionCredential};
use crate::models::audit::AuditAction;
use crate::models::organization::{
    CreateClientRequest, CreatedClientResponse, OrgStatus, OrgType, Organization,
};
use crate::models::tenant::{SignupRequest, Tenant, TenantStatus};
use crate::models::user::{AcceptInviteRequest, InvitationToken, User, UserRole, UserStatus};
use crate::scoped::ScopedStore;
use crate::services::audit::{self, AuditEntry};
use crate::store::{DocumentStore, Filter, Page, StoreError};

pub const INVITE_EXPIRY_DAYS: i64 = 14;

fn is_valid_signup_slug(s: &str) -> bool {
    let len = s.len();
    len >= 3
        && len <= 32
        && s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !s.starts_with('-')
        && !s.ends_with('-')
}

#[derive(Debug, serde::Serialize)]
pub struct SlugCheck {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug)]
pub struct RegistrationOutcome {
    pub tenant: Tenant,
    pub user: User,
    pub session: Option<SessionCredential>,
}

pub struct RegistrationService;

impl RegistrationService {
    pub async fn check_slug(
        store: &dyn DocumentStore,
        config: &Config,
        slug: &str,
    ) -> Result<SlugCheck, AppError> {
        let slug = slug.to_lowercase();

        if !is_valid_signup_slug(&slug) {
            return Ok(SlugCheck {
                available: false,
                reason: Some(
                    "Der Bezeichner muss 3 bis 32 Zeichen lang sein (Kleinbuchstaben, Ziffern, Bindestriche)."
                        .into(),
                ),
            });
        }
        if config.is_reserved_slug(&slug) {
            return Ok(SlugCheck {
                available: false,
                reason: Some("Dieser Bezeichner ist reserviert.".into()),
            });
        }
        if slug_taken(store, &slug).await? {
            return Ok(SlugCheck {
                available: false,
                reason: Some("Dieser Bezeichner ist bereits vergeben.".into()),
            });
        }
        Ok(SlugCheck {
            available: true,
            reason: None,
        })
    }

    /// Register a new advisory firm. See module docs for the atomicity
    /// contract; failure of the final session step leaves all created
    /// records valid.
    pub async fn register(
        store: &Arc<dyn DocumentStore>,
        identity: &dyn IdentityProvider,
        config: &Config,
        req: SignupRequest,
    ) -> Result<RegistrationOutcome, AppError> {
        let slug = req.slug.to_lowercase();

        if !is_valid_signup_slug(&slug) {
            return Err(AppError::Validation(
                "Der Bezeichner muss 3 bis 32 Zeichen lang sein (Kleinbuchstaben, Ziffern, Bindestriche), ohne Bindestrich am Anfang oder Ende."
                    .into(),
            ));
        }
        if config.is_reserved_slug(&slug) {
            return Err(AppError::ReservedSubdomain { slug });
        }
        if !req.email.contains('@') {
            return Err(AppError::Validation("Ungültige E-Mail-Adresse.".into()));
        }
        if req.password.len() < 8 {
            return Err(AppError::Validation(
                "Das Passwort muss mindestens 8 Zeichen lang sein.".into(),
            ));
        }
        if req.name.trim().is_empty() {
            return Err(AppError::Validation("Der Kanzleiname ist erforderlich.".into()));
        }
        if req.first_name.trim().is_empty() || req.last_name.trim().is_empty() {
            return Err(AppError::Validation("Vor- und Nachname sind erforderlich.".into()));
        }
        if slug_taken(store.as_ref(), &slug).await? {
            return Err(AppError::DuplicateSubdomain { slug });
        }

        // 1. Tenant. The unique slug index is the atomic backstop for the
        // availability check above.
        let tenant = Tenant {
            id: Uuid::new_v4(),
            slug: slug.clone(),
            name: req.name.trim().to_string(),
            owner_email: req.email.to_lowercase(),
            branding: None,
            status: TenantStatus::Active,
            created_at: Utc::now(),
        };
        match store
            .create(
                Tenant::COLLECTION,
                tenant.id,
                serde_json::to_value(&tenant).map_err(StoreError::from)?,
                vec![format!("tenant:{}", tenant.id)],
            )
            .await
        {
            Ok(_) => {}
            Err(StoreError::Conflict(_)) => return Err(AppError::DuplicateSubdomain { slug }),
            Err(e) => return Err(e.into()),
        }

        // 2. Advisor organization.
        let org = Organization {
            id: Uuid::new_v4(),
            tenant_id: tenant.id,
            org_type: OrgType::Advisor,
            name: tenant.name.clone(),
            tax_id: req.tax_id.clone(),
            contact_email: Some(tenant.owner_email.clone()),
            contact_phone: req.phone.clone(),
            status: OrgStatus::Active,
            created_at: Utc::now(),
        };
        if let Err(e) = store
            .create(
                Organization::COLLECTION,
                org.id,
                serde_json::to_value(&org).map_err(StoreError::from)?,
                vec![format!("tenant:{}", tenant.id), format!("org:{}", org.id)],
            )
            .await
        {
            compensate(store.as_ref(), &[(Tenant::COLLECTION, tenant.id)]).await;
            return Err(AppError::OrphanedRegistrationFailure {
                reason: format!("advisor organization creation failed: {e}"),
            });
        }

        // 3. Owner identity.
        let display_name = format!("{} {}", req.first_name.trim(), req.last_name.trim());
        let owner_identity = match identity
            .create_identity(&req.email, &req.password, &display_name)
            .await
        {
            Ok(identity) => identity,
            Err(IdentityError::Duplicate) => {
                compensate(
                    store.as_ref(),
                    &[(Organization::COLLECTION, org.id), (Tenant::COLLECTION, tenant.id)],
                )
                .await;
                return Err(AppError::Validation(
                    "Für diese E-Mail-Adresse existiert bereits ein Konto.".into(),
                ));
            }
            Err(e) => {
                compensate(
                    store.as_ref(),
                    &[(Organization::COLLECTION, org.id), (Tenant::COLLECTION, tenant.id)],
                )
                .await;
                return Err(AppError::OrphanedRegistrationFailure {
                    reason: format!("owner identity creation failed: {e}"),
                });
            }
        };

        // 4. Owner membership.
        let user = User {
            id: Uuid::new_v4(),
            tenant_id: tenant.id,
            organization_id: org.id,
            identity_id: owner_identity.id,
            role: UserRole::Owner,
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            email: tenant.owner_email.clone(),
            status: UserStatus::Active,
            last_login_at: None,
            created_at: Utc::now(),
        };
        if let Err(e) = store
            .create(
                User::COLLECTION,
                user.id,
                serde_json::to_value(&user).map_err(StoreError::from)?,
                vec![format!("tenant:{}", tenant.id), format!("org:{}", org.id)],
            )
            .await
        {
            if let Err(ie) = identity.delete_identity(owner_identity.id).await {
                tracing::error!(
                    identity = %owner_identity.id,
                    "orphaned identity after failed registration, manual cleanup required: {ie}"
                );
            }
            compensate(
                store.as_ref(),
                &[(Organization::COLLECTION, org.id), (Tenant::COLLECTION, tenant.id)],
            )
            .await;
            return Err(AppError::OrphanedRegistrationFailure {
                reason: format!("owner membership creation failed: {e}"),
            });
        }

        // 5. Session, outside the atomic unit: the account is fully usable
        // even if this fails and the owner has to log in manually.
        let session = match identity.create_session(&req.email, &req.password).await {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(%slug, "post-registration session creation failed: {e}");
                None
            }
        };

        tracing::info!(%slug, tenant = %tenant.id, "registered new advisory firm");
        Ok(RegistrationOutcome {
            tenant,
            user,
            session,
        })
    }

    /// Create a client organization plus the invitation for its first
    /// administrator. Same compensation discipline as firm signup.
    pub async fn invite_client(
        store: &Arc<dyn DocumentStore>,
        scoped: &ScopedStore<'_>,
        req: CreateClientRequest,
    ) -> Result<CreatedClientResponse, AppError> {
        let ctx = scoped.ctx();
        if !ctx.role.is_advisor_side() {
            return Err(AppError::Forbidden);
        }
        if req.name.trim().is_empty() {
            return Err(AppError::Validation("Der Firmenname ist erforderlich.".into()));
        }
        if !req.admin_email.contains('@') {
            return Err(AppError::Validation("Ungültige E-Mail-Adresse.".into()));
        }

        let org = Organization {
            id: Uuid::new_v4(),
            tenant_id: ctx.tenant_id,
            org_type: OrgType::Client,
            name: req.name.trim().to_string(),
            tax_id: req.tax_id.clone(),
            contact_email: req.contact_email.clone(),
            contact_phone: req.contact_phone.clone(),
            status: OrgStatus::Active,
            created_at: Utc::now(),
        };
        let org = scoped.create(&org).await?;

        let raw_token = generate_token();
        let invitation = InvitationToken {
            id: Uuid::new_v4(),
            tenant_id: ctx.tenant_id,
            organization_id: org.id,
            email: req.admin_email.to_lowercase(),
            role: UserRole::ClientAdmin,
            token_hash: token_digest(&raw_token),
            invited_by: ctx.user_id,
            used: false,
            expires_at: Utc::now() + Duration::days(INVITE_EXPIRY_DAYS),
            created_at: Utc::now(),
        };
        if let Err(e) = scoped.create(&invitation).await {
            compensate(store.as_ref(), &[(Organization::COLLECTION, org.id)]).await;
            return Err(AppError::OrphanedRegistrationFailure {
                reason: format!("client invitation creation failed: {e}"),
            });
        }

        audit::log(
            store.clone(),
            AuditEntry {
                tenant_id: ctx.tenant_id,
                organization_id: Some(org.id),
                user_id: Some(ctx.user_id),
                user_name: None,
                action: AuditAction::Invite,
                resource_type: Some("organization".into()),
                resource_id: Some(org.id.to_string()),
            },
        );

        Ok(CreatedClientResponse {
            organization: org,
            invitation_token: raw_token,
        })
    }

    /// Redeem an invitation on a tenant subdomain. The token is consumed
    /// first; identity/membership failures un-consume it.
    pub async fn accept_invite(
        store: &Arc<dyn DocumentStore>,
        identity: &dyn IdentityProvider,
        tenant: &Tenant,
        req: AcceptInviteRequest,
    ) -> Result<RegistrationOutcome, AppError> {
        if req.password.len() < 8 {
            return Err(AppError::Validation(
                "Das Passwort muss mindestens 8 Zeichen lang sein.".into(),
            ));
        }
        if req.first_name.trim().is_empty() || req.last_name.trim().is_empty() {
            return Err(AppError::Validation("Vor- und Nachname sind erforderlich.".into()));
        }

        let invalid =
            || AppError::Validation("Die Einladung ist ungültig oder abgelaufen.".into());

        let docs = store
            .list(
                InvitationToken::COLLECTION,
                &[
                    Filter::eq("token_hash", token_digest(&req.token)),
                    Filter::eq("tenant_id", json!(tenant.id)),
                ],
                None,
                Page::new(1, 0),
            )
            .await?;
        let invitation: InvitationToken = docs.first().ok_or_else(invalid)?.decode()?;

        if invitation.used || invitation.expires_at <= Utc::now() {
            return Err(invalid());
        }

        // Consume before creating anything, so a duplicate submit can never
        // register twice.
        store
            .update(InvitationToken::COLLECTION, invitation.id, json!({ "used": true }))
            .await?;

        let display_name = format!("{} {}", req.first_name.trim(), req.last_name.trim());
        let invitee = match identity
            .create_identity(&invitation.email, &req.password, &display_name)
            .await
        {
            Ok(identity) => identity,
            Err(e) => {
                if let Err(ue) = store
                    .update(InvitationToken::COLLECTION, invitation.id, json!({ "used": false }))
                    .await
                {
                    tracing::error!(invitation = %invitation.id, "failed to release consumed invitation: {ue}");
                }
                return match e {
                    IdentityError::Duplicate => Err(AppError::Validation(
                        "Für diese E-Mail-Adresse existiert bereits ein Konto.".into(),
                    )),
                    other => Err(AppError::Internal(other.to_string())),
                };
            }
        };

        let user = User {
            id: Uuid::new_v4(),
            tenant_id: tenant.id,
            organization_id: invitation.organization_id,
            identity_id: invitee.id,
            role: invitation.role,
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            email: invitation.email.clone(),
            status: UserStatus::Active,
            last_login_at: None,
            created_at: Utc::now(),
        };
        if let Err(e) = store
            .create(
                User::COLLECTION,
                user.id,
                serde_json::to_value(&user).map_err(StoreError::from)?,
                vec![
                    format!("tenant:{}", tenant.id),
                    format!("org:{}", invitation.organization_id),
                ],
            )
            .await
        {
            if let Err(ie) = identity.delete_identity(invitee.id).await {
                tracing::error!(identity = %invitee.id, "orphaned identity after failed invite acceptance: {ie}");
            }
            if let Err(ue) = store
                .update(InvitationToken::COLLECTION, invitation.id, json!({ "used": false }))
                .await
            {
                tracing::error!(invitation = %invitation.id, "failed to release consumed invitation: {ue}");
            }
            return Err(AppError::OrphanedRegistrationFailure {
                reason: format!("invitee membership creation failed: {e}"),
            });
        }

        let session = match identity.create_session(&invitation.email, &req.password).await {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(tenant = %tenant.slug, "post-acceptance session creation failed: {e}");
                None
            }
        };

        Ok(RegistrationOutcome {
            tenant: tenant.clone(),
            user,
            session,
        })
    }
}

async fn slug_taken(store: &dyn DocumentStore, slug: &str) -> Result<bool, StoreError> {
    let docs = store
        .list(
            Tenant::COLLECTION,
            &[Filter::eq("slug", slug)],
            None,
            Page::new(1, 0),
        )
        .await?;
    Ok(!docs.is_empty())
}

/// Best-effort rollback of already-created records, newest first. A record
/// that cannot be removed is an orphan needing manual remediation and is
/// logged as such, loudly.
async fn compensate(store: &dyn DocumentStore, created: &[(&'static str, Uuid)]) {
    for (collection, id) in created {
        match store.delete(collection, *id).await {
            Ok(()) | Err(StoreError::NotFound { .. }) => {}
            Err(e) => {
                tracing::error!(
                    collection,
                    id = %id,
                    "registration rollback failed, orphaned record requires manual cleanup: {e}"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_slug_bounds() {
        assert!(is_valid_signup_slug("mueller"));
        assert!(is_valid_signup_slug("kanzlei-123"));
        assert!(!is_valid_signup_slug("ab"));
        assert!(!is_valid_signup_slug("-mueller"));
        assert!(!is_valid_signup_slug("mueller-"));
        assert!(!is_valid_signup_slug("Müller"));
        assert!(!is_valid_signup_slug(&"x".repeat(33)));
    }
}
