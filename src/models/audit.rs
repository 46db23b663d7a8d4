use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Login,
    Upload,
    Download,
    Delete,
    Export,
    Invite,
}

/// Append-only record of a sensitive action. Ordinary application code never
/// updates or deletes entries; GDPR erasure pseudonymizes the name field and
/// keeps the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub organization_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub user_name: Option<String>,
    pub action: AuditAction,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    pub const COLLECTION: &'static str = "audit_log";
}

#[derive(Debug, Deserialize)]
pub struct AuditLogQuery {
    pub action: Option<AuditAction>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
