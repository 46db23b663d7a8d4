use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Inactive,
    Suspended,
}

/// Optional branding shown on the tenant's login page. Persisted as one
/// nested object; the serde round-trip is the only mapping between the
/// domain value and the stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branding {
    pub logo_url: Option<String>,
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
}

/// One advisory firm. The slug is globally unique and immutable after
/// creation; rows are never hard-deleted (10-year retention), only the
/// status changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub owner_email: String,
    #[serde(default)]
    pub branding: Option<Branding>,
    pub status: TenantStatus,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    pub const COLLECTION: &'static str = "tenants";

    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub slug: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub tax_id: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub name: Option<String>,
    pub branding: Option<Branding>,
    pub status: Option<TenantStatus>,
}

/// Public subset served to the login page of a tenant subdomain.
#[derive(Debug, Serialize)]
pub struct TenantInfo {
    pub slug: String,
    pub name: String,
    pub branding: Option<Branding>,
}

impl From<Tenant> for TenantInfo {
    fn from(t: Tenant) -> Self {
        Self {
            slug: t.slug,
            name: t.name,
            branding: t.branding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_mapping_round_trips_with_and_without_branding() {
        let mut tenant = Tenant {
            id: Uuid::new_v4(),
            slug: "mueller".into(),
            name: "Steuerkanzlei Müller".into(),
            owner_email: "info@kanzlei-mueller.de".into(),
            branding: None,
            status: TenantStatus::Active,
            created_at: Utc::now(),
        };

        let fields = serde_json::to_value(&tenant).unwrap();
        let decoded: Tenant = serde_json::from_value(fields).unwrap();
        assert_eq!(decoded.slug, tenant.slug);
        assert!(decoded.branding.is_none());

        tenant.branding = Some(Branding {
            logo_url: Some("https://cdn.example/logo.png".into()),
            primary_color: Some("#1a3c6e".into()),
            secondary_color: None,
        });
        let fields = serde_json::to_value(&tenant).unwrap();
        let decoded: Tenant = serde_json::from_value(fields).unwrap();
        assert_eq!(decoded.branding, tenant.branding);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(TenantStatus::Suspended).unwrap(),
            serde_json::json!("suspended")
        );
    }
}
