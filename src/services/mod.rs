pub mod audit;
pub mod checklists;
pub mod documents;
pub mod registration;
pub mod users;
