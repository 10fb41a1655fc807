use actix_web::{get, patch, web, HttpResponse};
use serde_json::json;
use tracing::warn;

use crate::data::Database;
use crate::utils::auth::AuthUser;
use crate::utils::enums::NotificationKind;
use crate::utils::error::{ApiError, ApiResult};
use crate::AppState;

/// Records a notification for `recipient_id`. A failure here never fails the
/// request that triggered it.
pub(crate) fn notify(db: &Database, recipient_id: &str, message: &str, kind: NotificationKind) {
    if let Err(e) = db.create_notification(recipient_id, message, kind) {
        warn!("Failed to notify user {}: {}", recipient_id, e);
    }
}

#[get("/api/notifications")]
pub async fn list_notifications(state: web::Data<AppState>, auth: AuthUser) -> ApiResult<HttpResponse> {
    let notifications = state.db.notifications_for(auth.id())?;
    let unread = notifications.iter().filter(|n| !n.read).count();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "unread": unread,
        "notifications": notifications
    })))
}

#[patch("/api/notifications/read-all")]
pub async fn mark_all_read(state: web::Data<AppState>, auth: AuthUser) -> ApiResult<HttpResponse> {
    let updated = state.db.mark_all_notifications_read(auth.id())?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "updated": updated
    })))
}

#[patch("/api/notifications/{id}/read")]
pub async fn mark_read(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let notification = state
        .db
        .notification_by_id(&id)?
        .ok_or_else(|| ApiError::not_found("Notification not found"))?;

    if notification.recipient_id != auth.user.id {
        return Err(ApiError::forbidden("Not authorized to update this notification"));
    }

    let notification = state
        .db
        .mark_notification_read(&id)?
        .ok_or_else(|| ApiError::not_found("Notification not found"))?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "notification": notification
    })))
}
