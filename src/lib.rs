pub mod config;
pub mod context;
pub mod db;
pub mod directory;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod scoped;
pub mod services;
pub mod store;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use directory::Directory;
use identity::IdentityProvider;
use store::DocumentStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub directory: Directory,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        config: Arc<Config>,
    ) -> Self {
        let directory = Directory::new(store.clone());
        Self {
            store,
            identity,
            directory,
            config,
        }
    }
}

/// Build the full router: public root-domain routes plus the tenant
/// namespace the host router rewrites into.
pub fn build_router(state: AppState) -> Router {
    // CORS: the root domain, its tenant subdomains, and localhost during
    // development. Credentials are cookies, so no wildcard origin.
    let cors_origin = {
        let root = state.config.root_domain.clone();
        AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            let o = match origin.to_str() {
                Ok(s) => s,
                Err(_) => return false,
            };
            if o.starts_with("http://localhost") || o.starts_with("http://127.0.0.1") {
                return true;
            }
            let host = match o.strip_prefix("https://").or_else(|| o.strip_prefix("http://")) {
                Some(rest) => rest.split('/').next().unwrap_or(rest),
                None => return false,
            };
            let host = host.split(':').next().unwrap_or(host);
            host == root || host.ends_with(&format!(".{root}"))
        })
    };

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(AllowHeaders::list([header::CONTENT_TYPE, header::ACCEPT]))
        .allow_credentials(true)
        .allow_origin(cors_origin);

    let tenant_routes = Router::new()
        .route("/info", get(routes::tenant_info::get_tenant_info))
        // Auth
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/auth/me", get(routes::auth::me))
        .route("/auth/accept-invite", post(routes::auth::accept_invite))
        // Organizations
        .route(
            "/organizations",
            get(routes::organizations::list_organizations).post(routes::organizations::create_client),
        )
        .route("/organizations/{id}", get(routes::organizations::get_organization))
        // Users
        .route("/users", get(routes::users::list_users))
        .route("/users/invite", post(routes::users::invite_user))
        .route("/users/{id}", delete(routes::users::deactivate_user))
        .route("/users/{id}/erase", post(routes::users::erase_user))
        // Checklists
        .route(
            "/checklists",
            get(routes::checklists::list_checklists).post(routes::checklists::create_checklist),
        )
        .route(
            "/checklists/{id}",
            get(routes::checklists::get_checklist)
                .put(routes::checklists::update_checklist)
                .delete(routes::checklists::delete_checklist),
        )
        .route("/checklists/{id}/items", post(routes::checklists::add_item))
        .route("/items/{id}/status", put(routes::checklists::set_item_status))
        // Documents
        .route(
            "/documents",
            get(routes::documents::list_documents).post(routes::documents::create_document),
        )
        .route(
            "/documents/{id}",
            get(routes::documents::get_document).delete(routes::documents::delete_document),
        )
        .route("/documents/{id}/download", get(routes::documents::download_document))
        // Audit log
        .route("/audit-log", get(routes::audit_log::list_audit_log))
        .route("/audit-log/export", get(routes::audit_log::export_audit_log))
        // Settings
        .route("/settings", put(routes::settings::update_settings));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/signup", post(routes::signup::signup))
        .route("/signup/check-slug", get(routes::signup::check_slug))
        .nest("/tenants/{slug}", tenant_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::host::resolve_tenant_host,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
