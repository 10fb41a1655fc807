use actix_web::{delete, get, web, HttpResponse};
use serde_json::json;
use tracing::info;

use crate::utils::auth::AdminUser;
use crate::utils::error::{ApiError, ApiResult};
use crate::AppState;

#[get("/api/admin/users")]
pub async fn list_users(state: web::Data<AppState>, _admin: AdminUser) -> ApiResult<HttpResponse> {
    let users = state.db.list_users()?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": users.len(),
        "users": users
    })))
}

#[delete("/api/admin/users/{user_id}")]
pub async fn delete_user(
    state: web::Data<AppState>,
    admin: AdminUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let user_id = path.into_inner();
    if user_id == admin.user.id {
        return Err(ApiError::validation("Administrators cannot delete their own account here"));
    }

    if !state.db.delete_user(&user_id)? {
        return Err(ApiError::not_found("User not found"));
    }
    info!("Admin {} deleted user {}", admin.id(), user_id);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "User deleted successfully"
    })))
}
