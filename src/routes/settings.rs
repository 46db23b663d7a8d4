use axum::{extract::State, Json};
use serde_json::json;

use crate::context::AuthorizationContext;
use crate::error::AppError;
use crate::models::tenant::{Tenant, TenantStatus, UpdateSettingsRequest};
use crate::models::user::UserRole;
use crate::AppState;

/// Owner-only tenant settings update: display name, branding, lifecycle
/// status. The slug is immutable and tenants are never hard-deleted.
pub async fn update_settings(
    State(state): State<AppState>,
    ctx: AuthorizationContext,
    Json(body): Json<UpdateSettingsRequest>,
) -> Result<Json<Tenant>, AppError> {
    if ctx.role != UserRole::Owner {
        return Err(AppError::Forbidden);
    }

    let mut patch = serde_json::Map::new();
    if let Some(name) = body.name {
        if name.trim().is_empty() {
            return Err(AppError::Validation("Der Kanzleiname ist erforderlich.".into()));
        }
        patch.insert("name".into(), json!(name.trim()));
    }
    if let Some(branding) = body.branding {
        patch.insert("branding".into(), json!(branding));
    }
    if let Some(status) = body.status {
        // Suspension is operator-side; an owner switching their own tenant
        // to suspended could never switch it back.
        if status == TenantStatus::Suspended {
            return Err(AppError::Validation(
                "Die Suspendierung erfolgt ausschließlich durch den Betreiber.".into(),
            ));
        }
        patch.insert("status".into(), json!(status));
    }

    if patch.is_empty() {
        return Err(AppError::Validation("Keine Änderungen übermittelt.".into()));
    }

    let doc = state
        .store
        .update(Tenant::COLLECTION, ctx.tenant_id, json!(patch))
        .await?;
    Ok(Json(doc.decode()?))
}
