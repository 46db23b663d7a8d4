use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::config::{Config, SESSION_COOKIE};
use crate::context::AuthorizationContext;
use crate::error::AppError;
use crate::identity::IdentityError;
use crate::middleware::auth::{session_credential, TenantSlug};
use crate::models::audit::AuditAction;
use crate::models::tenant::Tenant;
use crate::models::user::{AcceptInviteRequest, LoginRequest, User, UserProfile};
use crate::scoped::ScopedStore;
use crate::services::audit::{self, AuditEntry};
use crate::services::registration::RegistrationService;
use crate::AppState;

/// `Set-Cookie` headers for the session credential. `for_root_domain`
/// widens the cookie to the root domain and all tenant subdomains (used by
/// signup, which runs on the root host).
pub fn session_cookie_headers(config: &Config, token: &str, for_root_domain: bool) -> HeaderMap {
    let max_age = config.session_max_age_days * 24 * 60 * 60;
    let mut value = format!("{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age}");
    if for_root_domain {
        value.push_str(&format!("; Domain={}", config.root_domain));
    }
    if config.production {
        value.push_str("; Secure");
    }

    let mut headers = HeaderMap::new();
    if let Ok(v) = value.parse() {
        headers.insert(header::SET_COOKIE, v);
    }
    headers
}

fn clear_session_cookie(config: &Config) -> HeaderMap {
    let mut value = format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0");
    if config.production {
        value.push_str("; Secure");
    }
    let mut headers = HeaderMap::new();
    if let Ok(v) = value.parse() {
        headers.insert(header::SET_COOKIE, v);
    }
    headers
}

/// Login on a tenant subdomain. A valid identity without a membership in
/// this tenant answers exactly like a wrong password.
pub async fn login(
    State(state): State<AppState>,
    TenantSlug(slug): TenantSlug,
    Json(body): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<Value>), AppError> {
    let tenant: Tenant = state
        .directory
        .tenant_by_slug(&slug)
        .await?
        .filter(|t| t.is_active())
        .ok_or_else(|| AppError::TenantNotFound { slug: slug.clone() })?;

    let credential = match state.identity.create_session(&body.email, &body.password).await {
        Ok(credential) => credential,
        Err(IdentityError::InvalidCredentials) => return Err(AppError::InvalidCredentials),
        Err(IdentityError::Unavailable(msg)) => {
            tracing::error!(%slug, "identity provider unreachable during login: {msg}");
            return Err(AppError::AuthProviderUnavailable);
        }
        Err(e) => return Err(AppError::Internal(e.to_string())),
    };

    let principal = match state.identity.resolve_session(&credential.0).await {
        Ok(Some(principal)) => principal,
        Ok(None) => return Err(AppError::InvalidCredentials),
        Err(IdentityError::Unavailable(msg)) => {
            tracing::error!(%slug, "identity provider unreachable during login: {msg}");
            return Err(AppError::AuthProviderUnavailable);
        }
        Err(e) => return Err(AppError::Internal(e.to_string())),
    };

    let membership = state.directory.membership_by_identity(principal.id).await?;
    let membership = match membership {
        Some(m) if m.tenant.id == tenant.id => m,
        _ => {
            // Session is useless on this subdomain; do not leave it behind.
            let _ = state.identity.delete_session(&credential.0).await;
            tracing::warn!(%slug, identity = %principal.id, "login without membership in tenant");
            return Err(AppError::InvalidCredentials);
        }
    };

    if let Err(e) = state
        .store
        .update(
            User::COLLECTION,
            membership.user.id,
            json!({ "last_login_at": Utc::now() }),
        )
        .await
    {
        tracing::warn!(user = %membership.user.id, "failed to record last login: {e}");
    }

    audit::log(
        state.store.clone(),
        AuditEntry {
            tenant_id: tenant.id,
            organization_id: Some(membership.organization.id),
            user_id: Some(membership.user.id),
            user_name: Some(membership.user.display_name()),
            action: AuditAction::Login,
            resource_type: None,
            resource_id: None,
        },
    );

    let headers = session_cookie_headers(&state.config, &credential.0, false);
    let profile = UserProfile::from(membership.user);
    Ok((
        headers,
        Json(json!({ "user": profile, "tenant_name": tenant.name })),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (HeaderMap, Json<Value>) {
    if let Some(credential) = session_credential(&headers) {
        if let Err(e) = state.identity.delete_session(&credential).await {
            tracing::warn!("session deletion on logout failed: {e}");
        }
    }
    (
        clear_session_cookie(&state.config),
        Json(json!({ "status": "logged_out" })),
    )
}

/// The assembled context plus the caller's profile.
pub async fn me(
    State(state): State<AppState>,
    ctx: AuthorizationContext,
) -> Result<Json<Value>, AppError> {
    let scoped = ScopedStore::new(state.store.as_ref(), &ctx);
    let user: User = scoped.get(ctx.user_id).await?;

    Ok(Json(json!({
        "user": UserProfile::from(user),
        "subdomain": ctx.subdomain,
    })))
}

pub async fn accept_invite(
    State(state): State<AppState>,
    TenantSlug(slug): TenantSlug,
    Json(body): Json<AcceptInviteRequest>,
) -> Result<(StatusCode, HeaderMap, Json<Value>), AppError> {
    let tenant = state
        .directory
        .tenant_by_slug(&slug)
        .await?
        .filter(|t| t.is_active())
        .ok_or(AppError::TenantNotFound { slug })?;

    let outcome =
        RegistrationService::accept_invite(&state.store, state.identity.as_ref(), &tenant, body)
            .await?;

    let headers = match &outcome.session {
        Some(session) => session_cookie_headers(&state.config, &session.0, false),
        None => HeaderMap::new(),
    };

    Ok((
        StatusCode::CREATED,
        headers,
        Json(json!({ "user": UserProfile::from(outcome.user) })),
    ))
}
