use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Regulatory minimum retention for uploaded documents (§ 147 AO).
pub const RETENTION_YEARS: i64 = 10;

/// Metadata for an uploaded file. The bytes themselves live behind the
/// opaque `file_id` of the storage collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub organization_id: Uuid,
    pub checklist_item_id: Uuid,
    pub uploaded_by: Uuid,
    pub file_id: String,
    pub original_filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    /// Deletion is rejected before this instant.
    pub retention_until: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub const COLLECTION: &'static str = "documents";

    pub fn retention_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.retention_until
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    pub checklist_item_id: Uuid,
    pub file_id: String,
    pub original_filename: String,
    pub content_type: String,
    pub size_bytes: i64,
}

#[derive(Debug, Deserialize)]
pub struct DocumentQuery {
    pub checklist_item_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
