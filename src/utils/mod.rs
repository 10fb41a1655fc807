pub mod auth;
pub mod config;
pub mod enc;
pub mod enums;
pub mod error;
pub mod routes;
pub mod structures;
pub mod validate;
