pub mod assignments;
pub mod auth;
pub mod batches;
pub mod class_tests;
pub mod clock;
pub mod error;
pub mod fees;
pub mod identity;
pub mod membership;
pub mod messages;
pub mod notes;
pub mod notifications;
pub mod ports;
pub mod recipients;
pub mod repository;
pub mod services;
pub mod store;
pub mod students;
pub mod teachers;
pub mod util;

pub type DomainResult<T> = Result<T, error::DomainError>;
