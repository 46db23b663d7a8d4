use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::organization::OrgType;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Owner,
    Advisor,
    ClientAdmin,
    ClientEmployee,
}

impl UserRole {
    /// Owner and advisor roles see every organization of their tenant;
    /// client roles are confined to their own.
    pub fn is_advisor_side(self) -> bool {
        matches!(self, UserRole::Owner | UserRole::Advisor)
    }

    /// Role/organization pairing invariant: advisor-side roles belong to the
    /// advisor organization, client roles to a client organization.
    pub fn allowed_in(self, org_type: OrgType) -> bool {
        match self {
            UserRole::Owner | UserRole::Advisor => org_type == OrgType::Advisor,
            UserRole::ClientAdmin | UserRole::ClientEmployee => org_type == OrgType::Client,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UserRole::Owner => "owner",
            UserRole::Advisor => "advisor",
            UserRole::ClientAdmin => "client_admin",
            UserRole::ClientEmployee => "client_employee",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(UserRole::Owner),
            "advisor" => Ok(UserRole::Advisor),
            "client_admin" => Ok(UserRole::ClientAdmin),
            "client_employee" => Ok(UserRole::ClientEmployee),
            _ => Err(anyhow::anyhow!("Unknown role: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
    Pending,
}

/// Membership record binding an authentication identity to exactly one
/// organization within exactly one tenant. Never hard-deleted; GDPR erasure
/// scrubs the personal fields instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub organization_id: Uuid,
    /// Reference into the external identity provider.
    pub identity_id: Uuid,
    pub role: UserRole,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub status: UserStatus,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub const COLLECTION: &'static str = "users";

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Single-use invitation into an organization. The raw token is only ever
/// handed to the invitee; the record keeps its digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationToken {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub organization_id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub token_hash: String,
    pub invited_by: Uuid,
    pub used: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl InvitationToken {
    pub const COLLECTION: &'static str = "invitations";
}

// Request/Response DTOs

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct InviteUserRequest {
    pub organization_id: Option<Uuid>,
    pub email: String,
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct AcceptInviteRequest {
    pub token: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub role: UserRole,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub status: UserStatus,
}

impl From<User> for UserProfile {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            organization_id: u.organization_id,
            role: u.role,
            first_name: u.first_name,
            last_name: u.last_name,
            email: u.email,
            status: u.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_org_pairing() {
        assert!(UserRole::Owner.allowed_in(OrgType::Advisor));
        assert!(UserRole::Advisor.allowed_in(OrgType::Advisor));
        assert!(!UserRole::Owner.allowed_in(OrgType::Client));
        assert!(UserRole::ClientAdmin.allowed_in(OrgType::Client));
        assert!(!UserRole::ClientEmployee.allowed_in(OrgType::Advisor));
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [
            UserRole::Owner,
            UserRole::Advisor,
            UserRole::ClientAdmin,
            UserRole::ClientEmployee,
        ] {
            let parsed: UserRole = role.to_string().parse().unwrap();
            assert_eq!(parsed, role);
        }
    }
}
