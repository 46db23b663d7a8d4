use axum::{extract::State, Json};

use crate::error::AppError;
use crate::middleware::auth::TenantSlug;
use crate::models::tenant::TenantInfo;
use crate::AppState;

/// Public branding lookup for a tenant's login page.
pub async fn get_tenant_info(
    State(state): State<AppState>,
    TenantSlug(slug): TenantSlug,
) -> Result<Json<TenantInfo>, AppError> {
    let tenant = state
        .directory
        .tenant_by_slug(&slug)
        .await?
        .filter(|t| t.is_active())
        .ok_or(AppError::TenantNotFound { slug })?;

    Ok(Json(tenant.into()))
}
