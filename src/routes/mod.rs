pub mod audit_log;
pub mod auth;
pub mod checklists;
pub mod documents;
pub mod health;
pub mod organizations;
pub mod settings;
pub mod signup;
pub mod tenant_info;
pub mod users;
