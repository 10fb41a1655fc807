use std::path::Path;

use actix_web::{get, web, HttpResponse};
use chrono::Utc;
use serde_json::json;
use tokio::fs;

use crate::utils::error::{ApiError, ApiResult};
use crate::AppState;

#[get("/health_check")]
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "timestamp": Utc::now().timestamp()
    }))
}

/// Fallback for paths no route matches.
pub async fn route_not_found() -> ApiResult<HttpResponse> {
    Err(ApiError::not_found("Route not found"))
}

fn content_type_for(file_name: &str) -> &'static str {
    match Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("txt") => "text/plain; charset=utf-8",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Uploaded files, served from the uploads directory only.
#[get("/uploads/{filename}")]
pub async fn serve_file(state: web::Data<AppState>, filename: web::Path<String>) -> ApiResult<HttpResponse> {
    let filename = filename.into_inner();
    let not_found = || ApiError::not_found("File not found");

    if filename.is_empty() || filename.contains(['/', '\\']) || filename.contains("..") {
        return Err(not_found());
    }

    let content = fs::read(state.config.uploads_dir.join(&filename))
        .await
        .map_err(|_| not_found())?;
    Ok(HttpResponse::Ok()
        .content_type(content_type_for(&filename))
        .body(content))
}
