use actix_web::{delete, get, patch, post, put, web, HttpResponse};
use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::data::applications::{Application, NewApplication};
use crate::data::jobs::Job;
use crate::utils::auth::{owned_job, require_role, AuthUser, RecruiterUser, StudentUser};
use crate::utils::enums::{ApplicationStatus, NotificationKind, Role};
use crate::utils::error::{ApiError, ApiResult};
use crate::utils::routes::notifications::notify;
use crate::utils::structures::{ApplyRequest, StatusRequest};
use crate::utils::validate::{optional_text, require_text};
use crate::AppState;

const ALREADY_APPLIED: &str = "You have already applied to this job";

/// Accepts only a recruiter decision: `accepted` or `rejected`.
fn parse_decision(status: Option<&str>) -> ApiResult<ApplicationStatus> {
    status
        .map(str::trim)
        .and_then(|s| s.parse::<ApplicationStatus>().ok())
        .filter(ApplicationStatus::is_decision)
        .ok_or_else(|| ApiError::validation("Status must be either 'accepted' or 'rejected'"))
}

/// Persists a decision on an application of `job` and tells the student.
fn decide(
    state: &AppState,
    job: &Job,
    application: &Application,
    status: ApplicationStatus,
) -> ApiResult<Application> {
    let updated = state
        .db
        .set_application_status(&application.id, status)?
        .ok_or_else(|| ApiError::not_found("Application not found"))?;

    info!("Application {} for job {} marked {}", updated.id, job.id, status);
    notify(
        &state.db,
        &updated.student_id,
        &format!("Your application for {} was {}", job.title, status),
        NotificationKind::Application,
    );
    Ok(updated)
}

#[post("/api/jobs/{job_id}/apply")]
pub async fn apply(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<String>,
    body: web::Json<ApplyRequest>,
) -> ApiResult<HttpResponse> {
    let job = state
        .db
        .job_by_id(&path.into_inner())?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    if job.is_owned_by(auth.id()) {
        return Err(ApiError::validation("Recruiter cannot apply to their own job"));
    }
    require_role(&auth.user, &[Role::Student])?;

    let body = body.into_inner();
    let resume_link = require_text("resumeLink", body.resume_link.as_deref())?;
    let cover_letter = if state.config.cover_letter_required {
        Some(require_text("coverLetter", body.cover_letter.as_deref())?)
    } else {
        optional_text(body.cover_letter.as_deref())
    };

    if state.config.enforce_apply_deadline && Utc::now().date_naive() > job.apply_by {
        return Err(ApiError::validation("The application deadline for this job has passed"));
    }

    if state.db.application_for(&job.id, auth.id())?.is_some() {
        return Err(ApiError::conflict(ALREADY_APPLIED));
    }

    // The unique (job, student) constraint settles a race with a concurrent apply
    let application = state
        .db
        .create_application(&NewApplication {
            job_id: job.id.clone(),
            student_id: auth.id().to_string(),
            resume_link,
            cover_letter,
        })
        .map_err(|e| ApiError::conflict_on_unique(e, ALREADY_APPLIED))?;

    info!("Student {} applied to job {}", auth.id(), job.id);
    notify(
        &state.db,
        &job.recruiter.id,
        &format!("{} applied to {}", auth.user.name, job.title),
        NotificationKind::Application,
    );

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Application submitted successfully",
        "application": application
    })))
}

#[put("/api/jobs/{job_id}/applicants/{student_id}/status")]
pub async fn set_applicant_status(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<(String, String)>,
    body: web::Json<StatusRequest>,
) -> ApiResult<HttpResponse> {
    let (job_id, student_id) = path.into_inner();
    let job = owned_job(&state.db, &job_id, &auth.user)?;
    let status = parse_decision(body.status.as_deref())?;

    let application = state
        .db
        .application_for(&job.id, &student_id)?
        .ok_or_else(|| ApiError::not_found("Applicant not found for this job"))?;
    let application = decide(&state, &job, &application, status)?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Application {} successfully", status),
        "application": application
    })))
}

#[delete("/api/jobs/{job_id}/applicants/{student_id}")]
pub async fn remove_applicant(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let (job_id, student_id) = path.into_inner();
    let job = owned_job(&state.db, &job_id, &auth.user)?;

    let application = state
        .db
        .application_for(&job.id, &student_id)?
        .ok_or_else(|| ApiError::not_found("Applicant not found for this job"))?;
    state.db.delete_application(&application.id)?;

    info!("Recruiter {} removed applicant {} from job {}", auth.id(), student_id, job.id);
    notify(
        &state.db,
        &student_id,
        &format!("Your application for {} was removed", job.title),
        NotificationKind::Application,
    );

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Applicant removed successfully"
    })))
}

#[get("/api/student/applied")]
pub async fn list_applied(state: web::Data<AppState>, auth: StudentUser) -> ApiResult<HttpResponse> {
    let applications = state.db.applications_for_student(auth.id())?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": applications.len(),
        "applications": applications
    })))
}

#[delete("/api/student/applied/{application_id}")]
pub async fn withdraw(
    state: web::Data<AppState>,
    auth: StudentUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let application = state
        .db
        .application_by_id(&path.into_inner())?
        .ok_or_else(|| ApiError::not_found("Application not found"))?;

    if application.student_id != auth.user.id {
        return Err(ApiError::forbidden("Not authorized to withdraw this application"));
    }

    state.db.delete_application(&application.id)?;
    info!("Student {} withdrew application {}", auth.id(), application.id);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Application withdrawn successfully"
    })))
}

#[get("/api/recruiter/application")]
pub async fn list_received(state: web::Data<AppState>, auth: RecruiterUser) -> ApiResult<HttpResponse> {
    let applications = state.db.applications_for_recruiter(auth.id(), None)?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": applications.len(),
        "applications": applications
    })))
}

#[patch("/api/recruiter/application/{id}/status")]
pub async fn update_status(
    state: web::Data<AppState>,
    auth: RecruiterUser,
    path: web::Path<String>,
    body: web::Json<StatusRequest>,
) -> ApiResult<HttpResponse> {
    let application = state
        .db
        .application_by_id(&path.into_inner())?
        .ok_or_else(|| ApiError::not_found("Application not found"))?;
    let job = owned_job(&state.db, &application.job_id, &auth.user)?;
    let status = parse_decision(body.status.as_deref())?;

    let application = decide(&state, &job, &application, status)?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Application {} successfully", status),
        "application": application
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_decisions_are_accepted() {
        assert_eq!(parse_decision(Some("accepted")).unwrap(), ApplicationStatus::Accepted);
        assert_eq!(parse_decision(Some(" rejected ")).unwrap(), ApplicationStatus::Rejected);
        assert!(parse_decision(Some("pending")).is_err());
        assert!(parse_decision(Some("hired")).is_err());
        assert!(parse_decision(None).is_err());
    }
}
