use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::models::tenant::SignupRequest;
use crate::routes::auth::session_cookie_headers;
use crate::services::registration::{RegistrationService, SlugCheck};
use crate::AppState;

#[derive(Deserialize)]
pub struct CheckSlugQuery {
    pub slug: String,
}

pub async fn check_slug(
    State(state): State<AppState>,
    Query(params): Query<CheckSlugQuery>,
) -> Result<Json<SlugCheck>, AppError> {
    let check =
        RegistrationService::check_slug(state.store.as_ref(), &state.config, &params.slug).await?;
    Ok(Json(check))
}

pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> Result<(StatusCode, axum::http::HeaderMap, Json<Value>), AppError> {
    let outcome = RegistrationService::register(
        &state.store,
        state.identity.as_ref(),
        &state.config,
        body,
    )
    .await?;

    let scheme = if state.config.production { "https" } else { "http" };
    let login_url = format!(
        "{scheme}://{}.{}/login",
        outcome.tenant.slug, state.config.root_domain
    );

    // Signup happens on the root domain; scope the cookie to the root
    // domain so the tenant subdomain receives it.
    let headers = match &outcome.session {
        Some(session) => session_cookie_headers(&state.config, &session.0, true),
        None => axum::http::HeaderMap::new(),
    };

    Ok((
        StatusCode::CREATED,
        headers,
        Json(json!({
            "slug": outcome.tenant.slug,
            "name": outcome.tenant.name,
            "login_url": login_url,
        })),
    ))
}
