//! Identity/session collaborator interface.
//!
//! Authentication identities are distinct from membership records: the
//! provider knows emails and secrets, nothing about tenants. Session
//! credentials are opaque to every caller.

pub mod store;

use async_trait::async_trait;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
}

/// Opaque session credential as handed to the cookie. Only its digest is
/// ever persisted.
#[derive(Debug, Clone)]
pub struct SessionCredential(pub String);

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity already exists")]
    Duplicate,

    #[error("invalid credentials")]
    InvalidCredentials,

    /// Distinguished from "unauthenticated": surfaced as a 5xx so valid
    /// users are not locked out during a provider outage.
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_identity(
        &self,
        email: &str,
        secret: &str,
        display_name: &str,
    ) -> Result<Identity, IdentityError>;

    async fn create_session(
        &self,
        email: &str,
        secret: &str,
    ) -> Result<SessionCredential, IdentityError>;

    /// `Ok(None)` is a definitive "unauthenticated": an invalid or expired
    /// credential is treated identically to a missing one.
    async fn resolve_session(&self, credential: &str) -> Result<Option<Identity>, IdentityError>;

    async fn delete_session(&self, credential: &str) -> Result<(), IdentityError>;

    /// Compensation hook for registration rollback.
    async fn delete_identity(&self, id: Uuid) -> Result<(), IdentityError>;
}

/// 256 bits of randomness, hex-encoded. Shared by sessions and invitation
/// tokens.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
