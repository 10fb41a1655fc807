use actix_web::{get, post, web, HttpResponse};
use serde_json::json;
use tracing::info;

use crate::data::reviews::average_rating;
use crate::utils::auth::StudentUser;
use crate::utils::error::{ApiError, ApiResult};
use crate::utils::structures::ReviewRequest;
use crate::utils::validate::require_text;
use crate::AppState;

#[post("/api/jobs/{job_id}/reviews")]
pub async fn create_review(
    state: web::Data<AppState>,
    auth: StudentUser,
    path: web::Path<String>,
    body: web::Json<ReviewRequest>,
) -> ApiResult<HttpResponse> {
    let job = state
        .db
        .job_by_id(&path.into_inner())?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    let body = body.into_inner();
    let rating = body
        .rating
        .filter(|r| (1..=5).contains(r))
        .ok_or_else(|| ApiError::validation("Rating must be between 1 and 5"))?;
    let text = require_text("text", body.text.as_deref())?;

    if state.db.application_for(&job.id, auth.id())?.is_none() {
        return Err(ApiError::forbidden("Only applicants can review this job"));
    }

    let review = state
        .db
        .create_review(&job.id, &job.recruiter.id, auth.id(), rating as u8, &text)
        .map_err(|e| ApiError::conflict_on_unique(e, "You have already reviewed this job"))?;
    info!("Student {} reviewed job {} ({} stars)", auth.id(), job.id, rating);

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "review": review
    })))
}

#[get("/api/jobs/{job_id}/reviews")]
pub async fn list_reviews(state: web::Data<AppState>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let job_id = path.into_inner();
    if state.db.job_by_id(&job_id)?.is_none() {
        return Err(ApiError::not_found("Job not found"));
    }

    let reviews = state.db.reviews_for_job(&job_id)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "averageRating": average_rating(&reviews),
        "reviews": reviews
    })))
}
