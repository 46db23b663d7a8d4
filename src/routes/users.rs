use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::context::AuthorizationContext;
use crate::error::AppError;
use crate::models::user::{InviteUserRequest, UserProfile};
use crate::scoped::ScopedStore;
use crate::services::users::UserService;
use crate::AppState;

#[derive(Deserialize)]
pub struct UserListQuery {
    pub organization_id: Option<Uuid>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

pub async fn list_users(
    State(state): State<AppState>,
    ctx: AuthorizationContext,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Vec<UserProfile>>, AppError> {
    let scoped = ScopedStore::new(state.store.as_ref(), &ctx);
    let users = UserService::list(&scoped, query.organization_id, query.page, query.per_page).await?;
    Ok(Json(users))
}

pub async fn invite_user(
    State(state): State<AppState>,
    ctx: AuthorizationContext,
    Json(body): Json<InviteUserRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let scoped = ScopedStore::new(state.store.as_ref(), &ctx);
    let token = UserService::invite(&state.store, &scoped, body).await?;
    Ok((StatusCode::CREATED, Json(json!({ "invitation_token": token }))))
}

pub async fn deactivate_user(
    State(state): State<AppState>,
    ctx: AuthorizationContext,
    Path(id): Path<Uuid>,
) -> Result<Json<UserProfile>, AppError> {
    let scoped = ScopedStore::new(state.store.as_ref(), &ctx);
    let profile = UserService::deactivate(&scoped, id).await?;
    Ok(Json(profile))
}

/// GDPR erasure: scrubs personal fields, removes the login identity,
/// pseudonymizes audit entries. The membership row itself stays.
pub async fn erase_user(
    State(state): State<AppState>,
    ctx: AuthorizationContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let scoped = ScopedStore::new(state.store.as_ref(), &ctx);
    UserService::gdpr_erase(&state.store, state.identity.as_ref(), &scoped, id).await?;
    Ok(Json(json!({ "erased": true })))
}
