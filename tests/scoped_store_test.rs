//! Scoped data access layer: tenant filter injection, role-based
//! organization pinning, write-time identifier stamping.

mod common;

use chrono::Utc;
use uuid::Uuid;

use kanzleihub_api::context::AuthorizationContext;
use kanzleihub_api::error::AppError;
use kanzleihub_api::models::checklist::{Checklist, CreateChecklistRequest, NewItem};
use kanzleihub_api::models::document::{CreateDocumentRequest, Document};
use kanzleihub_api::models::organization::{CreateClientRequest, Organization};
use kanzleihub_api::models::user::AcceptInviteRequest;
use kanzleihub_api::scoped::ScopedStore;
use kanzleihub_api::services::checklists::ChecklistService;
use kanzleihub_api::services::documents::DocumentService;
use kanzleihub_api::services::registration::RegistrationService;
use kanzleihub_api::store::Page;

use common::{env, login_ctx, register_firm, TestEnv};

struct Fixture {
    env: TestEnv,
    owner_ctx: AuthorizationContext,
    org_backer: Organization,
    org_consulting: Organization,
    backer_admin_ctx: AuthorizationContext,
}

/// One firm, two client companies, a client admin logged in for the first.
async fn fixture() -> Fixture {
    let env = env();
    register_firm(&env, "mueller", "anna@kanzlei-mueller.de").await;
    let owner_ctx = login_ctx(&env, "mueller", "anna@kanzlei-mueller.de", "streng-geheim-1").await;

    let mut orgs = Vec::new();
    for (name, email) in [
        ("Bäckerei Krume GmbH", "chef@krume.de"),
        ("IT Beratung Nord AG", "kontakt@it-nord.de"),
    ] {
        let scoped = ScopedStore::new(env.store.as_ref(), &owner_ctx);
        let created = RegistrationService::invite_client(
            &env.store,
            &scoped,
            CreateClientRequest {
                name: name.into(),
                tax_id: None,
                contact_email: Some(email.into()),
                contact_phone: None,
                admin_email: email.into(),
            },
        )
        .await
        .unwrap();

        let tenant = env.directory.tenant_by_slug("mueller").await.unwrap().unwrap();
        RegistrationService::accept_invite(
            &env.store,
            env.identity.as_ref(),
            &tenant,
            AcceptInviteRequest {
                token: created.invitation_token.clone(),
                first_name: "Kim".into(),
                last_name: "Muster".into(),
                password: "noch-geheimer-2".into(),
            },
        )
        .await
        .unwrap();
        orgs.push(created.organization);
    }

    let backer_admin_ctx = login_ctx(&env, "mueller", "chef@krume.de", "noch-geheimer-2").await;
    let org_consulting = orgs.pop().unwrap();
    let org_backer = orgs.pop().unwrap();

    Fixture {
        env,
        owner_ctx,
        org_backer,
        org_consulting,
        backer_admin_ctx,
    }
}

fn checklist_request(org: Uuid, title: &str) -> CreateChecklistRequest {
    CreateChecklistRequest {
        organization_id: org,
        title: title.into(),
        description: None,
        fiscal_year: Some(2025),
        items: vec![
            NewItem {
                title: "Kontoauszüge".into(),
                requires_document: true,
            },
            NewItem {
                title: "Lohnjournal".into(),
                requires_document: true,
            },
        ],
    }
}

#[tokio::test]
async fn client_role_listing_is_pinned_to_own_organization() {
    let f = fixture().await;
    let owner_scoped = ScopedStore::new(f.env.store.as_ref(), &f.owner_ctx);

    ChecklistService::create(
        &owner_scoped,
        checklist_request(f.org_backer.id, "Jahresabschluss Bäckerei"),
    )
    .await
    .unwrap();
    ChecklistService::create(
        &owner_scoped,
        checklist_request(f.org_consulting.id, "Jahresabschluss IT"),
    )
    .await
    .unwrap();

    // A forged organization_id parameter pointing at the other client must
    // still only yield the caller's own checklists.
    let client_scoped = ScopedStore::new(f.env.store.as_ref(), &f.backer_admin_ctx);
    let listed = client_scoped
        .list::<Checklist>(Some(f.org_consulting.id), &[], None, Page::default())
        .await
        .unwrap();

    assert_eq!(listed.len(), 1);
    assert!(listed.iter().all(|c| c.organization_id == f.org_backer.id));

    // The advisor, by contrast, sees both when not filtering.
    let all = owner_scoped
        .list::<Checklist>(None, &[], None, Page::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn get_outside_own_organization_reads_as_not_found() {
    let f = fixture().await;
    let owner_scoped = ScopedStore::new(f.env.store.as_ref(), &f.owner_ctx);
    let other = ChecklistService::create(
        &owner_scoped,
        checklist_request(f.org_consulting.id, "Jahresabschluss IT"),
    )
    .await
    .unwrap();

    let client_scoped = ScopedStore::new(f.env.store.as_ref(), &f.backer_admin_ctx);
    let result = client_scoped.get::<Checklist>(other.checklist.id).await;
    // Surfaced as an organization scope violation internally, rendered as
    // plain not-found externally.
    assert!(matches!(
        result,
        Err(AppError::OrganizationScopeViolation)
    ));
}

#[tokio::test]
async fn cross_tenant_get_reads_as_not_found() {
    let f = fixture().await;
    let owner_scoped = ScopedStore::new(f.env.store.as_ref(), &f.owner_ctx);
    let checklist = ChecklistService::create(
        &owner_scoped,
        checklist_request(f.org_backer.id, "Jahresabschluss Bäckerei"),
    )
    .await
    .unwrap();

    register_firm(&f.env, "schmidt", "jo@kanzlei-schmidt.de").await;
    let other_ctx = login_ctx(&f.env, "schmidt", "jo@kanzlei-schmidt.de", "streng-geheim-1").await;
    let other_scoped = ScopedStore::new(f.env.store.as_ref(), &other_ctx);

    let result = other_scoped.get::<Checklist>(checklist.checklist.id).await;
    assert!(matches!(result, Err(AppError::NotFound)));
}

#[tokio::test]
async fn create_stamps_identifiers_from_the_context() {
    let f = fixture().await;
    let owner_scoped = ScopedStore::new(f.env.store.as_ref(), &f.owner_ctx);

    // Forged tenant id in the payload is overwritten by the context's.
    let forged = Checklist {
        id: Uuid::new_v4(),
        tenant_id: Uuid::new_v4(),
        organization_id: f.org_backer.id,
        title: "Umsatzsteuer 2025".into(),
        description: None,
        fiscal_year: Some(2025),
        created_by: f.owner_ctx.user_id,
        created_at: Utc::now(),
    };
    let created = owner_scoped.create(&forged).await.unwrap();
    assert_eq!(created.tenant_id, f.owner_ctx.tenant_id);

    // A client uploading against their own checklist cannot smuggle the
    // document into another organization.
    let checklist = ChecklistService::create(
        &owner_scoped,
        checklist_request(f.org_backer.id, "Jahresabschluss Bäckerei"),
    )
    .await
    .unwrap();
    let item_id = checklist.items[0].id;

    let client_scoped = ScopedStore::new(f.env.store.as_ref(), &f.backer_admin_ctx);
    let document = DocumentService::create(
        &f.env.store,
        &client_scoped,
        CreateDocumentRequest {
            checklist_item_id: item_id,
            file_id: "blob-4711".into(),
            original_filename: "kontoauszug-januar.pdf".into(),
            content_type: "application/pdf".into(),
            size_bytes: 52_113,
        },
    )
    .await
    .unwrap();
    assert_eq!(document.tenant_id, f.backer_admin_ctx.tenant_id);
    assert_eq!(document.organization_id, f.org_backer.id);
    assert_eq!(document.uploaded_by, f.backer_admin_ctx.user_id);
}

#[tokio::test]
async fn create_rejects_organizations_of_other_tenants() {
    let f = fixture().await;

    register_firm(&f.env, "schmidt", "jo@kanzlei-schmidt.de").await;
    let other_ctx = login_ctx(&f.env, "schmidt", "jo@kanzlei-schmidt.de", "streng-geheim-1").await;
    let other_scoped = ScopedStore::new(f.env.store.as_ref(), &other_ctx);

    // Advisor of "schmidt" targeting a "mueller" client organization.
    let result = ChecklistService::create(
        &other_scoped,
        checklist_request(f.org_backer.id, "Fremde Checkliste"),
    )
    .await;
    assert!(matches!(result, Err(AppError::NotFound)));
}

#[tokio::test]
async fn update_strips_scope_fields_from_the_patch() {
    let f = fixture().await;
    let owner_scoped = ScopedStore::new(f.env.store.as_ref(), &f.owner_ctx);
    let checklist = ChecklistService::create(
        &owner_scoped,
        checklist_request(f.org_backer.id, "Jahresabschluss Bäckerei"),
    )
    .await
    .unwrap();

    let updated: Checklist = owner_scoped
        .update(
            checklist.checklist.id,
            serde_json::json!({
                "title": "Jahresabschluss 2025",
                "tenant_id": Uuid::new_v4(),
                "organization_id": f.org_consulting.id,
            }),
        )
        .await
        .unwrap();

    assert_eq!(updated.title, "Jahresabschluss 2025");
    assert_eq!(updated.tenant_id, f.owner_ctx.tenant_id);
    assert_eq!(updated.organization_id, f.org_backer.id);
}

#[tokio::test]
async fn client_roles_cannot_write_organizations() {
    let f = fixture().await;
    let client_scoped = ScopedStore::new(f.env.store.as_ref(), &f.backer_admin_ctx);

    let result = client_scoped
        .update::<Organization>(f.org_backer.id, serde_json::json!({ "name": "Umbenannt" }))
        .await;
    assert!(matches!(result, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn documents_of_other_organizations_stay_invisible() {
    let f = fixture().await;
    let owner_scoped = ScopedStore::new(f.env.store.as_ref(), &f.owner_ctx);
    let checklist = ChecklistService::create(
        &owner_scoped,
        checklist_request(f.org_consulting.id, "Jahresabschluss IT"),
    )
    .await
    .unwrap();

    let document = DocumentService::create(
        &f.env.store,
        &owner_scoped,
        CreateDocumentRequest {
            checklist_item_id: checklist.items[0].id,
            file_id: "blob-0815".into(),
            original_filename: "bilanz.pdf".into(),
            content_type: "application/pdf".into(),
            size_bytes: 99_000,
        },
    )
    .await
    .unwrap();

    let client_scoped = ScopedStore::new(f.env.store.as_ref(), &f.backer_admin_ctx);
    let listed = client_scoped
        .list::<Document>(Some(f.org_consulting.id), &[], None, Page::default())
        .await
        .unwrap();
    assert!(listed.is_empty());

    let got = client_scoped.get::<Document>(document.id).await;
    assert!(matches!(got, Err(AppError::OrganizationScopeViolation)));
}
