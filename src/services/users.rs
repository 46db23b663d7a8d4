use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;
use crate::identity::{generate_token, token_digest, IdentityProvider};
use crate::models::audit::AuditAction;
use crate::models::organization::Organization;
use crate::models::user::{InvitationToken, InviteUserRequest, User, UserProfile, UserRole};
use crate::scoped::ScopedStore;
use crate::services::audit::{self, AuditEntry};
use crate::services::registration::INVITE_EXPIRY_DAYS;
use crate::store::{DocumentStore, Ordering, Page};

pub struct UserService;

impl UserService {
    /// Invite an additional user into an organization. Advisors invite into
    /// any organization of the tenant; a client admin only invites
    /// `client_employee`s into their own.
    pub async fn invite(
        store: &Arc<dyn DocumentStore>,
        scoped: &ScopedStore<'_>,
        req: InviteUserRequest,
    ) -> Result<String, AppError> {
        let ctx = scoped.ctx();
        match ctx.role {
            UserRole::Owner | UserRole::Advisor => {}
            UserRole::ClientAdmin if req.role == UserRole::ClientEmployee => {}
            _ => return Err(AppError::Forbidden),
        }
        if !req.email.contains('@') {
            return Err(AppError::Validation("Ungültige E-Mail-Adresse.".into()));
        }

        let org_id = if ctx.role.is_advisor_side() {
            req.organization_id.unwrap_or(ctx.organization_id)
        } else {
            ctx.organization_id
        };
        let org: Organization = scoped.get(org_id).await?;
        if !req.role.allowed_in(org.org_type) {
            return Err(AppError::Validation(
                "Diese Rolle passt nicht zum Organisationstyp.".into(),
            ));
        }

        let raw_token = generate_token();
        let invitation = InvitationToken {
            id: Uuid::new_v4(),
            tenant_id: ctx.tenant_id,
            organization_id: org.id,
            email: req.email.to_lowercase(),
            role: req.role,
            token_hash: token_digest(&raw_token),
            invited_by: ctx.user_id,
            used: false,
            expires_at: Utc::now() + Duration::days(INVITE_EXPIRY_DAYS),
            created_at: Utc::now(),
        };
        scoped.create(&invitation).await?;

        audit::log(
            store.clone(),
            AuditEntry {
                tenant_id: ctx.tenant_id,
                organization_id: Some(org.id),
                user_id: Some(ctx.user_id),
                user_name: None,
                action: AuditAction::Invite,
                resource_type: Some("user".into()),
                resource_id: Some(invitation.email.clone()),
            },
        );

        Ok(raw_token)
    }

    pub async fn list(
        scoped: &ScopedStore<'_>,
        organization_id: Option<Uuid>,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> Result<Vec<UserProfile>, AppError> {
        let per_page = per_page.unwrap_or(50).clamp(1, 200);
        let offset = (page.unwrap_or(1).max(1) - 1) * per_page;

        let users = scoped
            .list::<User>(
                organization_id,
                &[],
                Some(&Ordering::asc("created_at")),
                Page::new(per_page, offset),
            )
            .await?;
        Ok(users.into_iter().map(UserProfile::from).collect())
    }

    /// Flip a membership to inactive. The row is never removed; the
    /// directory stops resolving it on the next request.
    pub async fn deactivate(scoped: &ScopedStore<'_>, id: Uuid) -> Result<UserProfile, AppError> {
        let ctx = scoped.ctx();
        if id == ctx.user_id {
            return Err(AppError::Validation(
                "Das eigene Konto kann nicht deaktiviert werden.".into(),
            ));
        }

        let target: User = scoped.get(id).await?;
        if target.role == UserRole::Owner && ctx.role != UserRole::Owner {
            return Err(AppError::Forbidden);
        }

        let updated: User = scoped.update(id, json!({ "status": "inactive" })).await?;
        Ok(updated.into())
    }

    /// GDPR erasure: scrub the personal fields of the membership, remove
    /// the login identity, pseudonymize the audit trail. The membership and
    /// audit rows stay.
    pub async fn gdpr_erase(
        store: &Arc<dyn DocumentStore>,
        identity: &dyn IdentityProvider,
        scoped: &ScopedStore<'_>,
        id: Uuid,
    ) -> Result<(), AppError> {
        let ctx = scoped.ctx();
        if ctx.role != UserRole::Owner {
            return Err(AppError::Forbidden);
        }

        let target: User = scoped.get(id).await?;

        let _scrubbed: User = scoped
            .update(
                id,
                json!({
                    "first_name": "Gelöscht",
                    "last_name": "Gelöscht",
                    "email": format!("entfernt+{}@anonym.invalid", target.id),
                    "status": "inactive",
                }),
            )
            .await?;

        identity
            .delete_identity(target.identity_id)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let entries = audit::pseudonymize_user(store.as_ref(), ctx.tenant_id, target.id).await?;
        tracing::info!(user = %target.id, entries, "pseudonymized audit entries after erasure");

        Ok(())
    }
}
