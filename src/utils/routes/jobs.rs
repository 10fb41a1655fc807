use actix_web::{delete, get, post, put, web, HttpResponse};
use serde_json::json;
use tracing::info;

use crate::data::jobs::{JobChanges, JobFilter, NewJob};
use crate::utils::auth::{owned_job, AuthUser, RecruiterUser};
use crate::utils::enums::{JobType, TimePeriod};
use crate::utils::error::{ApiError, ApiResult};
use crate::utils::structures::{JobQuery, JobRequest};
use crate::utils::validate::{optional_text, parse_apply_by, require_text};
use crate::AppState;

const REQUIRED_JOB_FIELDS: [&str; 8] = [
    "title",
    "description",
    "company",
    "location",
    "skills",
    "applyBy",
    "timePeriod",
    "jobType",
];

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn new_job_from(body: JobRequest) -> ApiResult<NewJob> {
    let skills = body.skills.as_ref().map(|s| s.normalize()).unwrap_or_default();
    let provided = [
        present(&body.title),
        present(&body.description),
        present(&body.company),
        present(&body.location),
        !skills.is_empty(),
        present(&body.apply_by),
        present(&body.time_period),
        present(&body.job_type),
    ];

    let missing: Vec<&str> = REQUIRED_JOB_FIELDS
        .iter()
        .zip(provided)
        .filter(|(_, ok)| !ok)
        .map(|(field, _)| *field)
        .collect();
    if !missing.is_empty() {
        return Err(ApiError::validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    Ok(NewJob {
        title: require_text("title", body.title.as_deref())?,
        description: require_text("description", body.description.as_deref())?,
        company: require_text("company", body.company.as_deref())?,
        location: require_text("location", body.location.as_deref())?,
        salary: optional_text(body.salary.as_deref()),
        skills,
        apply_by: parse_apply_by(body.apply_by.as_deref().unwrap_or_default())?,
        time_period: body.time_period.as_deref().unwrap_or_default().trim().parse()?,
        job_type: body.job_type.as_deref().unwrap_or_default().trim().parse()?,
    })
}

/// Only provided fields change; a provided field must still be valid.
fn job_changes_from(body: JobRequest) -> ApiResult<JobChanges> {
    let text = |field: &str, value: Option<String>| -> ApiResult<Option<String>> {
        value.map(|v| require_text(field, Some(v.as_str()))).transpose()
    };

    let skills = match body.skills {
        Some(skills) => {
            let skills = skills.normalize();
            if skills.is_empty() {
                return Err(ApiError::validation("skills cannot be empty"));
            }
            Some(skills)
        }
        None => None,
    };

    Ok(JobChanges {
        title: text("title", body.title)?,
        description: text("description", body.description)?,
        company: text("company", body.company)?,
        location: text("location", body.location)?,
        // A blank salary clears it
        salary: body.salary.map(|v| optional_text(Some(&v))),
        skills,
        apply_by: body.apply_by.as_deref().map(parse_apply_by).transpose()?,
        time_period: body
            .time_period
            .as_deref()
            .map(|v| v.trim().parse::<TimePeriod>())
            .transpose()?,
        job_type: body
            .job_type
            .as_deref()
            .map(|v| v.trim().parse::<JobType>())
            .transpose()?,
    })
}

#[get("/api/jobs")]
pub async fn list_jobs(state: web::Data<AppState>, query: web::Query<JobQuery>) -> ApiResult<HttpResponse> {
    let query = query.into_inner();
    let filter = JobFilter {
        search: optional_text(query.q.as_deref()),
        location: optional_text(query.location.as_deref()),
        job_type: optional_text(query.job_type.as_deref())
            .map(|v| v.parse::<JobType>())
            .transpose()?,
        recruiter_id: None,
    };

    let jobs = state.db.list_jobs(&filter)?;
    if jobs.is_empty() && state.config.empty_job_list_not_found {
        return Err(ApiError::not_found("No jobs found"));
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": jobs.len(),
        "jobs": jobs
    })))
}

#[get("/api/jobs/internship")]
pub async fn list_internships(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let jobs = state.db.list_jobs(&JobFilter {
        job_type: Some(JobType::Internship),
        ..Default::default()
    })?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": jobs.len(),
        "jobs": jobs
    })))
}

#[get("/api/recruiter/jobs")]
pub async fn my_jobs(state: web::Data<AppState>, auth: RecruiterUser) -> ApiResult<HttpResponse> {
    let jobs = state.db.list_jobs(&JobFilter {
        recruiter_id: Some(auth.id().to_string()),
        ..Default::default()
    })?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": jobs.len(),
        "jobs": jobs
    })))
}

#[post("/api/jobs")]
pub async fn create_job(
    state: web::Data<AppState>,
    auth: RecruiterUser,
    body: web::Json<JobRequest>,
) -> ApiResult<HttpResponse> {
    let new_job = new_job_from(body.into_inner())?;
    let job = state.db.create_job(auth.id(), &new_job)?;
    info!("Recruiter {} created job {} ({})", auth.id(), job.id, job.title);

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "job": job
    })))
}

#[get("/api/jobs/{job_id}")]
pub async fn get_job(state: web::Data<AppState>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let job = state
        .db
        .job_detail(&path.into_inner())?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "job": job
    })))
}

#[put("/api/jobs/{job_id}")]
pub async fn update_job(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<String>,
    body: web::Json<JobRequest>,
) -> ApiResult<HttpResponse> {
    let job = owned_job(&state.db, &path.into_inner(), &auth.user)?;
    let changes = job_changes_from(body.into_inner())?;

    let job = state
        .db
        .update_job(&job.id, &changes)?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;
    info!("Recruiter {} updated job {}", auth.id(), job.id);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "job": job
    })))
}

#[delete("/api/jobs/{job_id}")]
pub async fn delete_job(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let job = owned_job(&state.db, &path.into_inner(), &auth.user)?;
    let removed = state
        .db
        .delete_job(&job.id)?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;
    info!(
        "Recruiter {} deleted job {} along with {} applications",
        auth.id(),
        job.id,
        removed
    );

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Job deleted successfully"
    })))
}

/// Applications received for one job, visible to its owner only.
#[get("/api/jobs/{job_id}/applicants")]
pub async fn job_applications(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let job = owned_job(&state.db, &path.into_inner(), &auth.user)?;
    let applications = state
        .db
        .applications_for_recruiter(auth.id(), Some(&job.id))?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": applications.len(),
        "applications": applications
    })))
}
