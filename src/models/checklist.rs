use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Traffic-light status of a checklist item. Transitions are free-form
/// corrections, any state is reachable from any other.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Red,
    Yellow,
    Green,
}

/// A document-collection checklist assigned to one client organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checklist {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub organization_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub fiscal_year: Option<i32>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Checklist {
    pub const COLLECTION: &'static str = "checklists";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub organization_id: Uuid,
    pub checklist_id: Uuid,
    pub title: String,
    pub status: ItemStatus,
    pub requires_document: bool,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

impl ChecklistItem {
    pub const COLLECTION: &'static str = "checklist_items";
}

/// Aggregate progress of a checklist. Always derived from the items, never
/// stored; `completed` counts `green` items.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub total: usize,
    pub completed: usize,
    pub percent: u8,
}

pub fn progress(items: &[ChecklistItem]) -> Progress {
    let total = items.len();
    let completed = items
        .iter()
        .filter(|i| i.status == ItemStatus::Green)
        .count();
    let percent = if total == 0 {
        0
    } else {
        (completed * 100 / total) as u8
    };
    Progress {
        total,
        completed,
        percent,
    }
}

// Request/Response DTOs

#[derive(Debug, Deserialize)]
pub struct NewItem {
    pub title: String,
    #[serde(default)]
    pub requires_document: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateChecklistRequest {
    pub organization_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub fiscal_year: Option<i32>,
    #[serde(default)]
    pub items: Vec<NewItem>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateChecklistRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub fiscal_year: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub title: String,
    #[serde(default)]
    pub requires_document: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemStatusRequest {
    pub status: ItemStatus,
}

#[derive(Debug, Deserialize)]
pub struct ChecklistQuery {
    pub organization_id: Option<Uuid>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ChecklistResponse {
    #[serde(flatten)]
    pub checklist: Checklist,
    pub progress: Progress,
}

#[derive(Debug, Serialize)]
pub struct ChecklistDetailResponse {
    #[serde(flatten)]
    pub checklist: Checklist,
    pub progress: Progress,
    pub items: Vec<ChecklistItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(status: ItemStatus) -> ChecklistItem {
        ChecklistItem {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            checklist_id: Uuid::new_v4(),
            title: "Kontoauszüge".into(),
            status,
            requires_document: true,
            position: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn progress_counts_green_over_total() {
        let items = vec![
            item(ItemStatus::Green),
            item(ItemStatus::Green),
            item(ItemStatus::Yellow),
            item(ItemStatus::Red),
        ];
        let p = progress(&items);
        assert_eq!(p.total, 4);
        assert_eq!(p.completed, 2);
        assert_eq!(p.percent, 50);
    }

    #[test]
    fn progress_recomputes_after_status_change() {
        let mut items = vec![
            item(ItemStatus::Green),
            item(ItemStatus::Green),
            item(ItemStatus::Yellow),
            item(ItemStatus::Red),
        ];
        items[2].status = ItemStatus::Green;
        assert_eq!(progress(&items).percent, 75);
    }

    #[test]
    fn progress_of_empty_checklist_is_zero() {
        assert_eq!(progress(&[]).percent, 0);
    }
}
