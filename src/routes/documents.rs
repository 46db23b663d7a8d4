use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::context::AuthorizationContext;
use crate::error::AppError;
use crate::models::document::{CreateDocumentRequest, Document, DocumentQuery};
use crate::scoped::ScopedStore;
use crate::services::documents::DocumentService;
use crate::AppState;

pub async fn list_documents(
    State(state): State<AppState>,
    ctx: AuthorizationContext,
    Query(query): Query<DocumentQuery>,
) -> Result<Json<Vec<Document>>, AppError> {
    let scoped = ScopedStore::new(state.store.as_ref(), &ctx);
    let documents = DocumentService::list(&scoped, &query).await?;
    Ok(Json(documents))
}

pub async fn create_document(
    State(state): State<AppState>,
    ctx: AuthorizationContext,
    Json(body): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<Document>), AppError> {
    let scoped = ScopedStore::new(state.store.as_ref(), &ctx);
    let document = DocumentService::create(&state.store, &scoped, body).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn get_document(
    State(state): State<AppState>,
    ctx: AuthorizationContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Document>, AppError> {
    let scoped = ScopedStore::new(state.store.as_ref(), &ctx);
    let document: Document = scoped.get(id).await?;
    Ok(Json(document))
}

/// Resolves the opaque storage reference for the edge to stream and writes
/// a download audit entry.
pub async fn download_document(
    State(state): State<AppState>,
    ctx: AuthorizationContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Document>, AppError> {
    let scoped = ScopedStore::new(state.store.as_ref(), &ctx);
    let document = DocumentService::download(&state.store, &scoped, id).await?;
    Ok(Json(document))
}

pub async fn delete_document(
    State(state): State<AppState>,
    ctx: AuthorizationContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let scoped = ScopedStore::new(state.store.as_ref(), &ctx);
    DocumentService::delete(&state.store, &scoped, id).await?;
    Ok(Json(json!({ "deleted": true })))
}
