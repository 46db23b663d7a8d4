use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

use crate::config::SESSION_COOKIE;
use crate::context::{self, AuthorizationContext};
use crate::error::AppError;
use crate::middleware::host::HostRoute;
use crate::AppState;

/// Extract a named cookie value from request headers.
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|part| {
            let part = part.trim();
            part.strip_prefix(&prefix).map(|v| v.to_string())
        })
}

pub fn session_credential(headers: &HeaderMap) -> Option<String> {
    get_cookie(headers, SESSION_COOKIE).filter(|v| !v.is_empty())
}

/// The tenant slug resolved from the Host header, for routes that are
/// served on a tenant subdomain without authentication (login page data,
/// invite acceptance).
#[derive(Debug, Clone)]
pub struct TenantSlug(pub String);

impl FromRequestParts<AppState> for TenantSlug {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<HostRoute>() {
            Some(HostRoute::Tenant(slug)) => Ok(TenantSlug(slug.clone())),
            _ => Err(AppError::NoTenantInRequest),
        }
    }
}

/// Runs the full five-step context assembly for protected handlers. The
/// host outcome is taken from the request extension set by the host
/// router, never from the (rewritable) path.
impl FromRequestParts<AppState> for AuthorizationContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let route = parts
            .extensions
            .get::<HostRoute>()
            .cloned()
            .unwrap_or(HostRoute::Root);
        let credential = session_credential(&parts.headers);

        context::assemble(
            &state.directory,
            state.identity.as_ref(),
            &route,
            credential.as_deref(),
        )
        .await
    }
}
