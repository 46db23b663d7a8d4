use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Application error taxonomy. Authorization failures are terminal for the
/// request: they are never retried and always logged before being mapped to
/// a user-facing response.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("no tenant in request")]
    NoTenantInRequest,

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("auth provider unavailable")]
    AuthProviderUnavailable,

    #[error("tenant not found: {slug}")]
    TenantNotFound { slug: String },

    #[error("no membership for identity {identity_id}")]
    MembershipNotFound { identity_id: String },

    #[error("membership tenant does not match requested tenant {slug}")]
    TenantMismatch { slug: String },

    /// A client-role caller resolved a record outside their organization.
    /// Surfaced as not-found so the record's existence is not confirmed.
    #[error("organization scope violation")]
    OrganizationScopeViolation,

    #[error("subdomain already taken: {slug}")]
    DuplicateSubdomain { slug: String },

    #[error("subdomain is reserved: {slug}")]
    ReservedSubdomain { slug: String },

    /// A step of an atomic registration sequence failed after a prior step
    /// succeeded and had to be compensated.
    #[error("registration failed: {reason}")]
    OrphanedRegistrationFailure { reason: String },

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Validation(String),

    #[error("not found")]
    NotFound,

    #[error("forbidden")]
    Forbidden,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            // Missing tenant or unknown tenant: nothing to show but the
            // root marketing page.
            AppError::NoTenantInRequest => (
                StatusCode::NOT_FOUND,
                json!({ "error": "Not found" }),
            ),
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Authentication required", "redirect": "/login" }),
            ),
            AppError::AuthProviderUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": "Anmeldedienst vorübergehend nicht erreichbar. Bitte später erneut versuchen." }),
            ),
            // Cross-tenant and scope violations are indistinguishable from
            // a missing record: a 403 here would confirm existence.
            AppError::TenantNotFound { .. }
            | AppError::TenantMismatch { .. }
            | AppError::MembershipNotFound { .. }
            | AppError::OrganizationScopeViolation
            | AppError::NotFound => (StatusCode::NOT_FOUND, json!({ "error": "Not found" })),
            AppError::DuplicateSubdomain { .. } => (
                StatusCode::CONFLICT,
                json!({ "error": "Dieser Bezeichner ist bereits vergeben." }),
            ),
            AppError::ReservedSubdomain { .. } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Dieser Bezeichner ist reserviert." }),
            ),
            AppError::OrphanedRegistrationFailure { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Registrierung fehlgeschlagen. Es wurden keine Daten angelegt." }),
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "E-Mail-Adresse oder Passwort ist ungültig." }),
            ),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::Forbidden => (StatusCode::FORBIDDEN, json!({ "error": "Forbidden" })),
            AppError::Store(StoreError::Unavailable(_)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": "Service temporarily unavailable" }),
            ),
            AppError::Store(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Internal server error" }),
            ),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else if status == StatusCode::NOT_FOUND || status == StatusCode::UNAUTHORIZED {
            // Authorization outcomes are logged with enough context for
            // security review; the response body stays generic.
            tracing::warn!(error = %self, "request denied");
        }

        (status, Json(body)).into_response()
    }
}
