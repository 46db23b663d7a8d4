use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical organization type. Every consumer references this definition;
/// the `advisor_firm`/`client_company` wording that floated around earlier
/// drafts is not valid on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrgType {
    Advisor,
    Client,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrgStatus {
    Active,
    Inactive,
}

/// A company-level entity within a tenant: the advisory firm itself
/// (exactly one per tenant) or one of its client companies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub org_type: OrgType,
    pub name: String,
    pub tax_id: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub status: OrgStatus,
    pub created_at: DateTime<Utc>,
}

impl Organization {
    pub const COLLECTION: &'static str = "organizations";
}

/// Creating a client company also invites its first administrator.
#[derive(Debug, Deserialize)]
pub struct CreateClientRequest {
    pub name: String,
    pub tax_id: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub admin_email: String,
}

#[derive(Debug, Serialize)]
pub struct CreatedClientResponse {
    pub organization: Organization,
    /// Raw invitation token for the first `client_admin`; shown once.
    pub invitation_token: String,
}
