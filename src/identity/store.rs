//! Document-store-backed identity provider.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::{token_digest, generate_token, Identity, IdentityError, IdentityProvider, SessionCredential};
use crate::store::{DocumentStore, Filter, Page, StoreError};

const IDENTITIES: &str = "identities";
const SESSIONS: &str = "sessions";

const BCRYPT_COST: u32 = 12;

#[derive(Debug, Serialize, Deserialize)]
struct IdentityRecord {
    id: Uuid,
    email: String,
    secret_hash: String,
    display_name: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    id: Uuid,
    identity_id: Uuid,
    token_hash: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

pub struct StoreIdentityProvider {
    store: Arc<dyn DocumentStore>,
    session_ttl: Duration,
}

impl StoreIdentityProvider {
    pub fn new(store: Arc<dyn DocumentStore>, session_max_age_days: i64) -> Self {
        Self {
            store,
            session_ttl: Duration::days(session_max_age_days),
        }
    }

    async fn identity_by_email(&self, email: &str) -> Result<Option<IdentityRecord>, IdentityError> {
        let docs = self
            .store
            .list(
                IDENTITIES,
                &[Filter::eq("email", email.to_lowercase())],
                None,
                Page::new(1, 0),
            )
            .await
            .map_err(map_store)?;
        docs.first()
            .map(|d| d.decode::<IdentityRecord>())
            .transpose()
            .map_err(map_store)
    }
}

fn map_store(e: StoreError) -> IdentityError {
    match e {
        StoreError::Unavailable(msg) => IdentityError::Unavailable(msg),
        other => IdentityError::Other(other.to_string()),
    }
}

#[async_trait]
impl IdentityProvider for StoreIdentityProvider {
    async fn create_identity(
        &self,
        email: &str,
        secret: &str,
        display_name: &str,
    ) -> Result<Identity, IdentityError> {
        let email = email.to_lowercase();
        if self.identity_by_email(&email).await?.is_some() {
            return Err(IdentityError::Duplicate);
        }

        let secret_hash = bcrypt::hash(secret, BCRYPT_COST)
            .map_err(|e| IdentityError::Other(e.to_string()))?;
        let record = IdentityRecord {
            id: Uuid::new_v4(),
            email: email.clone(),
            secret_hash,
            display_name: display_name.to_string(),
            created_at: Utc::now(),
        };

        let fields = serde_json::to_value(&record).map_err(|e| IdentityError::Other(e.to_string()))?;
        match self
            .store
            .create(IDENTITIES, record.id, fields, vec![format!("identity:{}", record.id)])
            .await
        {
            Ok(_) => Ok(Identity {
                id: record.id,
                email: record.email,
                display_name: record.display_name,
            }),
            // Unique email index raced with the lookup above.
            Err(StoreError::Conflict(_)) => Err(IdentityError::Duplicate),
            Err(e) => Err(map_store(e)),
        }
    }

    async fn create_session(
        &self,
        email: &str,
        secret: &str,
    ) -> Result<SessionCredential, IdentityError> {
        let record = self
            .identity_by_email(email)
            .await?
            .ok_or(IdentityError::InvalidCredentials)?;

        let valid = bcrypt::verify(secret, &record.secret_hash)
            .map_err(|e| IdentityError::Other(e.to_string()))?;
        if !valid {
            return Err(IdentityError::InvalidCredentials);
        }

        let token = generate_token();
        let session = SessionRecord {
            id: Uuid::new_v4(),
            identity_id: record.id,
            token_hash: token_digest(&token),
            expires_at: Utc::now() + self.session_ttl,
            created_at: Utc::now(),
        };
        let fields = serde_json::to_value(&session).map_err(|e| IdentityError::Other(e.to_string()))?;
        self.store
            .create(SESSIONS, session.id, fields, vec![format!("identity:{}", record.id)])
            .await
            .map_err(map_store)?;

        Ok(SessionCredential(token))
    }

    async fn resolve_session(&self, credential: &str) -> Result<Option<Identity>, IdentityError> {
        let docs = self
            .store
            .list(
                SESSIONS,
                &[Filter::eq("token_hash", token_digest(credential))],
                None,
                Page::new(1, 0),
            )
            .await
            .map_err(map_store)?;

        let Some(doc) = docs.first() else {
            return Ok(None);
        };
        let session: SessionRecord = doc.decode().map_err(map_store)?;

        if session.expires_at <= Utc::now() {
            // Expired credential is identical to a missing one; the row is
            // garbage either way.
            let _ = self.store.delete(SESSIONS, session.id).await;
            return Ok(None);
        }

        let identity = self
            .store
            .get(IDENTITIES, session.identity_id)
            .await
            .map_err(map_store)?;
        match identity {
            Some(doc) => {
                let record: IdentityRecord = doc.decode().map_err(map_store)?;
                Ok(Some(Identity {
                    id: record.id,
                    email: record.email,
                    display_name: record.display_name,
                }))
            }
            None => Ok(None),
        }
    }

    async fn delete_session(&self, credential: &str) -> Result<(), IdentityError> {
        let docs = self
            .store
            .list(
                SESSIONS,
                &[Filter::eq("token_hash", token_digest(credential))],
                None,
                Page::new(1, 0),
            )
            .await
            .map_err(map_store)?;

        if let Some(doc) = docs.first() {
            match self.store.delete(SESSIONS, doc.id).await {
                Ok(()) | Err(StoreError::NotFound { .. }) => {}
                Err(e) => return Err(map_store(e)),
            }
        }
        Ok(())
    }

    async fn delete_identity(&self, id: Uuid) -> Result<(), IdentityError> {
        // Orphan any sessions first so a stale cookie cannot resolve.
        let sessions = self
            .store
            .list(SESSIONS, &[Filter::eq("identity_id", json!(id))], None, Page::new(200, 0))
            .await
            .map_err(map_store)?;
        for doc in sessions {
            let _ = self.store.delete(SESSIONS, doc.id).await;
        }

        match self.store.delete(IDENTITIES, id).await {
            Ok(()) | Err(StoreError::NotFound { .. }) => Ok(()),
            Err(e) => Err(map_store(e)),
        }
    }
}
