pub mod audit;
pub mod checklist;
pub mod document;
pub mod organization;
pub mod tenant;
pub mod user;
