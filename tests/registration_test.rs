//! Firm signup and invitation flows, including the compensation discipline.

mod common;

use kanzleihub_api::error::AppError;
use kanzleihub_api::identity::IdentityProvider;
use kanzleihub_api::models::organization::{CreateClientRequest, OrgType, Organization};
use kanzleihub_api::models::tenant::Tenant;
use kanzleihub_api::models::user::{AcceptInviteRequest, User, UserRole};
use kanzleihub_api::scoped::ScopedStore;
use kanzleihub_api::services::registration::RegistrationService;
use kanzleihub_api::store::{Filter, Page};

use common::{env, login_ctx, register_firm, signup_request, TestEnv};

fn client_request(name: &str, admin_email: &str) -> CreateClientRequest {
    CreateClientRequest {
        name: name.into(),
        tax_id: Some("12/345/67890".into()),
        contact_email: Some(admin_email.into()),
        contact_phone: None,
        admin_email: admin_email.into(),
    }
}

async fn tenant_count(env: &TestEnv, slug: &str) -> usize {
    env.store
        .list(
            Tenant::COLLECTION,
            &[Filter::eq("slug", slug)],
            None,
            Page::new(10, 0),
        )
        .await
        .unwrap()
        .len()
}

#[tokio::test]
async fn registration_creates_tenant_advisor_org_and_owner() {
    let env = env();
    let outcome = register_firm(&env, "mueller", "anna@kanzlei-mueller.de").await;

    assert_eq!(outcome.tenant.slug, "mueller");
    assert_eq!(outcome.user.role, UserRole::Owner);
    assert!(outcome.session.is_some());

    let ctx = login_ctx(&env, "mueller", "anna@kanzlei-mueller.de", "streng-geheim-1").await;
    let scoped = ScopedStore::new(env.store.as_ref(), &ctx);
    let org: Organization = scoped.get(ctx.organization_id).await.unwrap();
    assert_eq!(org.org_type, OrgType::Advisor);
    assert_eq!(org.tenant_id, outcome.tenant.id);
}

#[tokio::test]
async fn duplicate_slug_is_rejected_and_nothing_extra_is_created() {
    let env = env();
    register_firm(&env, "mueller", "anna@kanzlei-mueller.de").await;

    let result = RegistrationService::register(
        &env.store,
        env.identity.as_ref(),
        &env.config,
        signup_request("mueller", "other@example.de"),
    )
    .await;

    assert!(matches!(result, Err(AppError::DuplicateSubdomain { .. })));
    assert_eq!(tenant_count(&env, "mueller").await, 1);

    // The rejected registrant's identity must not linger either.
    let login = env
        .identity
        .create_session("other@example.de", "streng-geheim-1")
        .await;
    assert!(login.is_err());
}

#[tokio::test]
async fn reserved_slug_is_rejected_without_side_effects() {
    let env = env();
    let result = RegistrationService::register(
        &env.store,
        env.identity.as_ref(),
        &env.config,
        signup_request("admin", "anna@example.de"),
    )
    .await;

    match result {
        Err(AppError::ReservedSubdomain { slug }) => assert_eq!(slug, "admin"),
        other => panic!("expected ReservedSubdomain, got {other:?}"),
    }
    assert_eq!(tenant_count(&env, "admin").await, 0);
}

#[tokio::test]
async fn failed_org_creation_rolls_back_the_tenant() {
    let env = env();
    env.failing.fail_create_on(Some(Organization::COLLECTION));

    let result = RegistrationService::register(
        &env.store,
        env.identity.as_ref(),
        &env.config,
        signup_request("mueller", "anna@kanzlei-mueller.de"),
    )
    .await;

    assert!(matches!(
        result,
        Err(AppError::OrphanedRegistrationFailure { .. })
    ));
    // No subsequent request can resolve the half-registered tenant.
    env.failing.fail_create_on(None);
    assert!(env.directory.tenant_by_slug("mueller").await.unwrap().is_none());

    // The slug is free again.
    register_firm(&env, "mueller", "anna@kanzlei-mueller.de").await;
}

#[tokio::test]
async fn failed_membership_creation_rolls_back_identity_org_and_tenant() {
    let env = env();
    env.failing.fail_create_on(Some(User::COLLECTION));

    let result = RegistrationService::register(
        &env.store,
        env.identity.as_ref(),
        &env.config,
        signup_request("mueller", "anna@kanzlei-mueller.de"),
    )
    .await;
    assert!(matches!(
        result,
        Err(AppError::OrphanedRegistrationFailure { .. })
    ));

    env.failing.fail_create_on(None);
    assert!(env.directory.tenant_by_slug("mueller").await.unwrap().is_none());
    // The identity was compensated too, so the email can register again.
    register_firm(&env, "mueller", "anna@kanzlei-mueller.de").await;
}

#[tokio::test]
async fn failed_session_creation_keeps_all_records_valid() {
    let env = env();
    env.failing.fail_create_on(Some("sessions"));

    let outcome = RegistrationService::register(
        &env.store,
        env.identity.as_ref(),
        &env.config,
        signup_request("mueller", "anna@kanzlei-mueller.de"),
    )
    .await
    .expect("registration must succeed without a session");

    assert!(outcome.session.is_none());
    assert_eq!(tenant_count(&env, "mueller").await, 1);

    // Manual login works once the provider recovers.
    env.failing.fail_create_on(None);
    let ctx = login_ctx(&env, "mueller", "anna@kanzlei-mueller.de", "streng-geheim-1").await;
    assert_eq!(ctx.tenant_id, outcome.tenant.id);
}

#[tokio::test]
async fn client_invitation_round_trip() {
    let env = env();
    register_firm(&env, "mueller", "anna@kanzlei-mueller.de").await;
    let ctx = login_ctx(&env, "mueller", "anna@kanzlei-mueller.de", "streng-geheim-1").await;
    let scoped = ScopedStore::new(env.store.as_ref(), &ctx);

    let created = RegistrationService::invite_client(
        &env.store,
        &scoped,
        client_request("Bäckerei Krume GmbH", "chef@krume.de"),
    )
    .await
    .unwrap();
    assert_eq!(created.organization.org_type, OrgType::Client);

    let tenant = env.directory.tenant_by_slug("mueller").await.unwrap().unwrap();
    let accepted = RegistrationService::accept_invite(
        &env.store,
        env.identity.as_ref(),
        &tenant,
        AcceptInviteRequest {
            token: created.invitation_token.clone(),
            first_name: "Karl".into(),
            last_name: "Krume".into(),
            password: "noch-geheimer-2".into(),
        },
    )
    .await
    .unwrap();

    assert_eq!(accepted.user.role, UserRole::ClientAdmin);
    assert_eq!(accepted.user.organization_id, created.organization.id);

    // The invitation is single-use.
    let again = RegistrationService::accept_invite(
        &env.store,
        env.identity.as_ref(),
        &tenant,
        AcceptInviteRequest {
            token: created.invitation_token,
            first_name: "Karla".into(),
            last_name: "Krume".into(),
            password: "noch-geheimer-3".into(),
        },
    )
    .await;
    assert!(matches!(again, Err(AppError::Validation(_))));

    // The new admin can log in on the firm's subdomain.
    let client_ctx = login_ctx(&env, "mueller", "chef@krume.de", "noch-geheimer-2").await;
    assert_eq!(client_ctx.role, UserRole::ClientAdmin);
    assert_eq!(client_ctx.organization_id, created.organization.id);
}

#[tokio::test]
async fn unknown_invitation_token_is_rejected() {
    let env = env();
    register_firm(&env, "mueller", "anna@kanzlei-mueller.de").await;
    let tenant = env.directory.tenant_by_slug("mueller").await.unwrap().unwrap();

    let result = RegistrationService::accept_invite(
        &env.store,
        env.identity.as_ref(),
        &tenant,
        AcceptInviteRequest {
            token: "kein-echtes-token".into(),
            first_name: "Karl".into(),
            last_name: "Krume".into(),
            password: "noch-geheimer-2".into(),
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn failed_acceptance_releases_the_invitation() {
    let env = env();
    register_firm(&env, "mueller", "anna@kanzlei-mueller.de").await;
    let ctx = login_ctx(&env, "mueller", "anna@kanzlei-mueller.de", "streng-geheim-1").await;
    let scoped = ScopedStore::new(env.store.as_ref(), &ctx);
    let created = RegistrationService::invite_client(
        &env.store,
        &scoped,
        client_request("Bäckerei Krume GmbH", "chef@krume.de"),
    )
    .await
    .unwrap();
    let tenant = env.directory.tenant_by_slug("mueller").await.unwrap().unwrap();

    env.failing.fail_create_on(Some(User::COLLECTION));
    let failed = RegistrationService::accept_invite(
        &env.store,
        env.identity.as_ref(),
        &tenant,
        AcceptInviteRequest {
            token: created.invitation_token.clone(),
            first_name: "Karl".into(),
            last_name: "Krume".into(),
            password: "noch-geheimer-2".into(),
        },
    )
    .await;
    assert!(matches!(
        failed,
        Err(AppError::OrphanedRegistrationFailure { .. })
    ));

    // Token was released and the identity compensated: the same invitation
    // works on retry.
    env.failing.fail_create_on(None);
    let accepted = RegistrationService::accept_invite(
        &env.store,
        env.identity.as_ref(),
        &tenant,
        AcceptInviteRequest {
            token: created.invitation_token,
            first_name: "Karl".into(),
            last_name: "Krume".into(),
            password: "noch-geheimer-2".into(),
        },
    )
    .await
    .unwrap();
    assert_eq!(accepted.user.role, UserRole::ClientAdmin);
}
