pub mod applications;
pub mod database;
pub mod jobs;
pub mod messages;
pub mod notifications;
pub mod resumes;
pub mod reviews;
pub mod revocations;
pub mod users;

pub use database::Database;
