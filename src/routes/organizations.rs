use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::context::AuthorizationContext;
use crate::error::AppError;
use crate::models::organization::{CreateClientRequest, CreatedClientResponse, Organization};
use crate::scoped::ScopedStore;
use crate::services::registration::RegistrationService;
use crate::store::{Ordering, Page};
use crate::AppState;

#[derive(Deserialize)]
pub struct OrgListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Advisors see every organization of the tenant; client roles only their
/// own (the scoped layer pins the filter).
pub async fn list_organizations(
    State(state): State<AppState>,
    ctx: AuthorizationContext,
    Query(query): Query<OrgListQuery>,
) -> Result<Json<Vec<Organization>>, AppError> {
    let scoped = ScopedStore::new(state.store.as_ref(), &ctx);
    let per_page = query.per_page.unwrap_or(50).clamp(1, 200);
    let offset = (query.page.unwrap_or(1).max(1) - 1) * per_page;

    let orgs = scoped
        .list::<Organization>(
            None,
            &[],
            Some(&Ordering::asc("name")),
            Page::new(per_page, offset),
        )
        .await?;
    Ok(Json(orgs))
}

pub async fn get_organization(
    State(state): State<AppState>,
    ctx: AuthorizationContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Organization>, AppError> {
    let scoped = ScopedStore::new(state.store.as_ref(), &ctx);
    let org: Organization = scoped.get(id).await?;
    Ok(Json(org))
}

/// Create a client company and the invitation for its first administrator.
pub async fn create_client(
    State(state): State<AppState>,
    ctx: AuthorizationContext,
    Json(body): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<CreatedClientResponse>), AppError> {
    let scoped = ScopedStore::new(state.store.as_ref(), &ctx);
    let created = RegistrationService::invite_client(&state.store, &scoped, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
