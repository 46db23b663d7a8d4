//! Context assembly: the five-step resolution and its cross-tenant check.

mod common;

use serde_json::json;

use kanzleihub_api::context::assemble;
use kanzleihub_api::error::AppError;
use kanzleihub_api::identity::IdentityProvider;
use kanzleihub_api::middleware::host::{resolve_host, HostRoute};
use kanzleihub_api::models::tenant::Tenant;

use common::{env, login_ctx, register_firm};

#[tokio::test]
async fn assembles_context_for_member_of_tenant() {
    let env = env();
    let outcome = register_firm(&env, "mueller", "anna@kanzlei-mueller.de").await;

    let ctx = login_ctx(&env, "mueller", "anna@kanzlei-mueller.de", "streng-geheim-1").await;
    assert_eq!(ctx.tenant_id, outcome.tenant.id);
    assert_eq!(ctx.user_id, outcome.user.id);
    assert_eq!(ctx.organization_id, outcome.user.organization_id);
    assert_eq!(ctx.subdomain, "mueller");
}

#[tokio::test]
async fn cross_tenant_browsing_fails_with_tenant_mismatch() {
    let env = env();
    register_firm(&env, "mueller", "anna@kanzlei-mueller.de").await;
    register_firm(&env, "schmidt", "jo@kanzlei-schmidt.de").await;

    let credential = env
        .identity
        .create_session("anna@kanzlei-mueller.de", "streng-geheim-1")
        .await
        .unwrap();

    // Authenticated member of "mueller" browsing "schmidt"'s subdomain
    // must never be granted a context scoped to "schmidt".
    let result = assemble(
        &env.directory,
        env.identity.as_ref(),
        &HostRoute::Tenant("schmidt".into()),
        Some(&credential.0),
    )
    .await;

    match result {
        Err(AppError::TenantMismatch { slug }) => assert_eq!(slug, "schmidt"),
        other => panic!("expected TenantMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_or_invalid_credentials_are_unauthenticated() {
    let env = env();
    register_firm(&env, "mueller", "anna@kanzlei-mueller.de").await;

    let no_cookie = assemble(
        &env.directory,
        env.identity.as_ref(),
        &HostRoute::Tenant("mueller".into()),
        None,
    )
    .await;
    assert!(matches!(no_cookie, Err(AppError::Unauthenticated)));

    let garbage = assemble(
        &env.directory,
        env.identity.as_ref(),
        &HostRoute::Tenant("mueller".into()),
        Some("deadbeef"),
    )
    .await;
    assert!(matches!(garbage, Err(AppError::Unauthenticated)));
}

#[tokio::test]
async fn root_host_yields_no_tenant() {
    let env = env();
    let result = assemble(
        &env.directory,
        env.identity.as_ref(),
        &HostRoute::Root,
        Some("irrelevant"),
    )
    .await;
    assert!(matches!(result, Err(AppError::NoTenantInRequest)));
}

#[tokio::test]
async fn unknown_slug_is_tenant_not_found() {
    let env = env();
    register_firm(&env, "mueller", "anna@kanzlei-mueller.de").await;
    let credential = env
        .identity
        .create_session("anna@kanzlei-mueller.de", "streng-geheim-1")
        .await
        .unwrap();

    let result = assemble(
        &env.directory,
        env.identity.as_ref(),
        &HostRoute::Tenant("niemand".into()),
        Some(&credential.0),
    )
    .await;
    assert!(matches!(result, Err(AppError::TenantNotFound { .. })));
}

#[tokio::test]
async fn identity_without_membership_is_membership_not_found() {
    let env = env();
    register_firm(&env, "mueller", "anna@kanzlei-mueller.de").await;

    env.identity
        .create_identity("fremd@example.de", "streng-geheim-1", "Fremde Person")
        .await
        .unwrap();
    let credential = env
        .identity
        .create_session("fremd@example.de", "streng-geheim-1")
        .await
        .unwrap();

    let result = assemble(
        &env.directory,
        env.identity.as_ref(),
        &HostRoute::Tenant("mueller".into()),
        Some(&credential.0),
    )
    .await;
    assert!(matches!(result, Err(AppError::MembershipNotFound { .. })));
}

#[tokio::test]
async fn suspended_tenant_resolves_like_a_missing_one() {
    let env = env();
    let outcome = register_firm(&env, "mueller", "anna@kanzlei-mueller.de").await;

    env.store
        .update(Tenant::COLLECTION, outcome.tenant.id, json!({ "status": "suspended" }))
        .await
        .unwrap();

    let credential = env
        .identity
        .create_session("anna@kanzlei-mueller.de", "streng-geheim-1")
        .await
        .unwrap();
    let result = assemble(
        &env.directory,
        env.identity.as_ref(),
        &HostRoute::Tenant("mueller".into()),
        Some(&credential.0),
    )
    .await;
    assert!(matches!(result, Err(AppError::TenantNotFound { .. })));
}

#[tokio::test]
async fn reserved_slug_never_routes_even_if_a_tenant_row_exists() {
    let env = env();

    // A row with a reserved slug somehow exists in the directory; the host
    // router still refuses to resolve it.
    let outcome = register_firm(&env, "mueller", "anna@kanzlei-mueller.de").await;
    env.store
        .update(Tenant::COLLECTION, outcome.tenant.id, json!({ "slug": "admin" }))
        .await
        .unwrap();

    assert_eq!(
        resolve_host(&env.config, "admin.kanzleihub.de"),
        HostRoute::Root
    );
}
