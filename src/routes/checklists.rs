use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::context::AuthorizationContext;
use crate::error::AppError;
use crate::models::checklist::{
    ChecklistDetailResponse, ChecklistItem, ChecklistQuery, ChecklistResponse,
    CreateChecklistRequest, CreateItemRequest, UpdateChecklistRequest, UpdateItemStatusRequest,
};
use crate::scoped::ScopedStore;
use crate::services::checklists::ChecklistService;
use crate::AppState;

pub async fn list_checklists(
    State(state): State<AppState>,
    ctx: AuthorizationContext,
    Query(query): Query<ChecklistQuery>,
) -> Result<Json<Vec<ChecklistResponse>>, AppError> {
    let scoped = ScopedStore::new(state.store.as_ref(), &ctx);
    let checklists = ChecklistService::list(&scoped, &query).await?;
    Ok(Json(checklists))
}

pub async fn create_checklist(
    State(state): State<AppState>,
    ctx: AuthorizationContext,
    Json(body): Json<CreateChecklistRequest>,
) -> Result<(StatusCode, Json<ChecklistDetailResponse>), AppError> {
    let scoped = ScopedStore::new(state.store.as_ref(), &ctx);
    let created = ChecklistService::create(&scoped, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_checklist(
    State(state): State<AppState>,
    ctx: AuthorizationContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ChecklistDetailResponse>, AppError> {
    let scoped = ScopedStore::new(state.store.as_ref(), &ctx);
    let checklist = ChecklistService::get(&scoped, id).await?;
    Ok(Json(checklist))
}

pub async fn update_checklist(
    State(state): State<AppState>,
    ctx: AuthorizationContext,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateChecklistRequest>,
) -> Result<Json<ChecklistResponse>, AppError> {
    let scoped = ScopedStore::new(state.store.as_ref(), &ctx);
    let updated = ChecklistService::update(&scoped, id, body).await?;
    Ok(Json(updated))
}

pub async fn delete_checklist(
    State(state): State<AppState>,
    ctx: AuthorizationContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let scoped = ScopedStore::new(state.store.as_ref(), &ctx);
    ChecklistService::delete(&scoped, id).await?;
    Ok(Json(json!({ "deleted": true })))
}

pub async fn add_item(
    State(state): State<AppState>,
    ctx: AuthorizationContext,
    Path(id): Path<Uuid>,
    Json(body): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<ChecklistItem>), AppError> {
    let scoped = ScopedStore::new(state.store.as_ref(), &ctx);
    let item = ChecklistService::add_item(&scoped, id, body).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Traffic-light update on an item; the response carries the parent's
/// recomputed progress.
pub async fn set_item_status(
    State(state): State<AppState>,
    ctx: AuthorizationContext,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateItemStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let scoped = ScopedStore::new(state.store.as_ref(), &ctx);
    let (item, progress) = ChecklistService::set_item_status(&scoped, id, body).await?;
    Ok(Json(json!({ "item": item, "progress": progress })))
}
