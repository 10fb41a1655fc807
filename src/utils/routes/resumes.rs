use std::path::{Path, PathBuf};

use actix_multipart::{Field, Multipart};
use actix_web::{get, post, web, HttpResponse};
use futures_util::StreamExt;
use serde_json::{json, Value};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::data::resumes::Resume;
use crate::utils::auth::AuthUser;
use crate::utils::error::{ApiError, ApiResult};
use crate::AppState;

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["pdf", "doc", "docx", "txt"];
const MAX_PARSED_DATA_BYTES: usize = 64 * 1024;

/// A resume file written to the uploads directory for the current request.
struct StoredFile {
    path: PathBuf,
    file_name: String,
    original_name: String,
}

fn resume_extension(file_name: &str) -> ApiResult<String> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(ApiError::validation(format!(
            "Resume must be one of: {}",
            ALLOWED_EXTENSIONS.join(", ")
        )))
    }
}

/// Streams a multipart field to `path`, failing once `limit` bytes are exceeded.
async fn save_field(field: &mut Field, path: &Path, limit: usize) -> ApiResult<usize> {
    let mut file = fs::File::create(path)
        .await
        .map_err(|e| ApiError::server(format!("Failed to create file: {e}")))?;

    let mut total = 0;
    while let Some(chunk) = field.next().await {
        let data = chunk.map_err(|e| ApiError::validation(format!("Failed to read upload: {e}")))?;
        total += data.len();
        if total > limit {
            return Err(ApiError::validation(format!(
                "Resume exceeds the maximum size of {limit} bytes"
            )));
        }
        file.write_all(&data)
            .await
            .map_err(|e| ApiError::server(format!("Failed to write file: {e}")))?;
    }
    file.flush()
        .await
        .map_err(|e| ApiError::server(format!("Failed to write file: {e}")))?;
    Ok(total)
}

async fn read_field(field: &mut Field, limit: usize) -> ApiResult<Vec<u8>> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.next().await {
        let data = chunk.map_err(|e| ApiError::validation(format!("Failed to read upload: {e}")))?;
        if buf.len() + data.len() > limit {
            return Err(ApiError::validation("Form field is too large"));
        }
        buf.extend_from_slice(&data);
    }
    Ok(buf)
}

/// Reads every form field. A resume file is recorded in `stored` as soon as it
/// is created, so the caller can remove it whatever fails afterwards.
async fn receive_upload(
    state: &AppState,
    user_id: &str,
    payload: &mut Multipart,
    stored: &mut Option<StoredFile>,
) -> ApiResult<Option<Value>> {
    let uploads_dir = &state.config.uploads_dir;
    let mut parsed_data = None;

    while let Some(field) = payload.next().await {
        let mut field = field.map_err(|e| ApiError::validation(format!("Malformed upload: {e}")))?;
        let name = field.name().to_string();

        match name.as_str() {
            "resume" => {
                if stored.is_some() {
                    return Err(ApiError::validation("Only one resume file can be uploaded at a time"));
                }
                let original_name = field
                    .content_disposition()
                    .get_filename()
                    .unwrap_or("resume")
                    .to_string();
                let extension = resume_extension(&original_name)?;
                let file_name = format!("{}.{}", uuid::Uuid::new_v4(), extension);
                let path = uploads_dir.join(&file_name);

                let file = stored.insert(StoredFile {
                    path,
                    file_name,
                    original_name,
                });
                let bytes = save_field(&mut field, &file.path, state.config.max_upload_bytes).await?;
                if bytes == 0 {
                    return Err(ApiError::validation("Uploaded resume is empty"));
                }
                info!("Stored resume {} ({} bytes) for user {}", file.file_name, bytes, user_id);
            }
            "parsedData" => {
                let raw = read_field(&mut field, MAX_PARSED_DATA_BYTES).await?;
                let value: Value = serde_json::from_slice(&raw)
                    .map_err(|_| ApiError::validation("parsedData must be valid JSON"))?;
                parsed_data = Some(value);
            }
            _ => {
                read_field(&mut field, MAX_PARSED_DATA_BYTES).await?;
            }
        }
    }

    Ok(parsed_data)
}

fn record_resume(
    state: &AppState,
    user_id: &str,
    stored: Option<&StoredFile>,
    parsed_data: Option<Value>,
) -> ApiResult<Resume> {
    let file = stored.ok_or_else(|| ApiError::validation("No resume file uploaded"))?;
    Ok(state.db.create_resume(
        user_id,
        &format!("/uploads/{}", file.file_name),
        &file.original_name,
        parsed_data,
    )?)
}

/// Multipart upload: file field `resume`, optional JSON text field `parsedData`.
#[post("/api/resume/upload")]
pub async fn upload_resume(
    state: web::Data<AppState>,
    auth: AuthUser,
    mut payload: Multipart,
) -> ApiResult<HttpResponse> {
    fs::create_dir_all(&state.config.uploads_dir)
        .await
        .map_err(|e| ApiError::server(format!("Failed to create uploads directory: {e}")))?;

    let mut stored = None;
    let outcome = receive_upload(&state, auth.id(), &mut payload, &mut stored)
        .await
        .and_then(|parsed_data| record_resume(&state, auth.id(), stored.as_ref(), parsed_data));

    match outcome {
        Ok(resume) => Ok(HttpResponse::Created().json(json!({
            "success": true,
            "resume": resume
        }))),
        Err(e) => {
            if let Some(file) = stored {
                if let Err(cleanup) = fs::remove_file(&file.path).await {
                    warn!("Failed to remove rejected upload {}: {}", file.path.display(), cleanup);
                }
            }
            Err(e)
        }
    }
}

#[get("/api/resume")]
pub async fn latest_resume(state: web::Data<AppState>, auth: AuthUser) -> ApiResult<HttpResponse> {
    let resume = state
        .db
        .latest_resume(auth.id())?
        .ok_or_else(|| ApiError::not_found("No resume uploaded yet"))?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "resume": resume
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_allowlist() {
        assert_eq!(resume_extension("CV.PDF").unwrap(), "pdf");
        assert_eq!(resume_extension("cv.final.docx").unwrap(), "docx");
        assert!(resume_extension("cv.exe").is_err());
        assert!(resume_extension("no_extension").is_err());
    }
}
