//! Job and internship placement portal: students browse and apply to
//! postings, recruiters publish postings and review applicants.

pub mod client;
pub mod data;
pub mod utils;

use actix_web::web;
use tracing::info;

use crate::data::users::NewUser;
use crate::data::Database;
use crate::utils::config::PortalConfig;
use crate::utils::enc::hash_password;
use crate::utils::enums::Role;
use crate::utils::error::{ApiError, ApiResult};
use crate::utils::routes::{
    accounts, admin, applications, jobs, messages, misc, notifications, resumes, reviews,
};

/// Shared by every request handler through `web::Data`.
pub struct AppState {
    pub db: Database,
    pub config: PortalConfig,
}

impl AppState {
    pub fn new(db: Database, config: PortalConfig) -> Self {
        Self { db, config }
    }

    /// Creates the configured administrator unless that email is already taken.
    pub fn seed_admin(&self) -> ApiResult<()> {
        let Some(seed) = &self.config.admin_seed else {
            return Ok(());
        };
        let email = utils::validate::normalize_email(&seed.email);
        if self.db.user_by_email(&email)?.is_some() {
            return Ok(());
        }

        let password_hash = hash_password(&seed.password, &self.config.hash_secret)?;
        let admin = self.db.create_user(&NewUser {
            name: seed.name.clone(),
            email,
            password_hash,
            role: Role::Admin,
        })?;
        info!("Seeded administrator account {}", admin.id);
        Ok(())
    }
}

/// Registers every route. Static paths go before `{job_id}` paths that would
/// otherwise capture them.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::validation(format!("Invalid request body: {err}")).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::validation(format!("Invalid query: {err}")).into()),
    )
    // Auth & profile
    .service(accounts::register)
    .service(accounts::login)
    .service(accounts::logout)
    .service(accounts::get_profile)
    .service(accounts::update_profile)
    .service(accounts::change_password)
    .service(accounts::delete_account)
    // Jobs
    .service(jobs::list_internships)
    .service(jobs::list_jobs)
    .service(jobs::create_job)
    .service(jobs::my_jobs)
    .service(jobs::get_job)
    .service(jobs::update_job)
    .service(jobs::delete_job)
    .service(jobs::job_applications)
    // Applications
    .service(applications::apply)
    .service(applications::set_applicant_status)
    .service(applications::remove_applicant)
    .service(applications::list_applied)
    .service(applications::withdraw)
    .service(applications::list_received)
    .service(applications::update_status)
    // Reviews
    .service(reviews::create_review)
    .service(reviews::list_reviews)
    // Notifications
    .service(notifications::list_notifications)
    .service(notifications::mark_all_read)
    .service(notifications::mark_read)
    // Messages
    .service(messages::list_conversations)
    .service(messages::send_message)
    .service(messages::get_conversation)
    // Resumes & files
    .service(resumes::upload_resume)
    .service(resumes::latest_resume)
    .service(misc::serve_file)
    .service(misc::health_check)
    // Admin
    .service(admin::list_users)
    .service(admin::delete_user);
}
