pub mod accounts;
pub mod admin;
pub mod applications;
pub mod jobs;
pub mod messages;
pub mod misc;
pub mod notifications;
pub mod resumes;
pub mod reviews;
