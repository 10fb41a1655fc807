use actix_web::{get, post, web, HttpResponse};
use serde_json::json;
use tracing::info;

use crate::utils::auth::AuthUser;
use crate::utils::enums::NotificationKind;
use crate::utils::error::{ApiError, ApiResult};
use crate::utils::routes::notifications::notify;
use crate::utils::structures::SendMessageRequest;
use crate::utils::validate::require_text;
use crate::AppState;

#[post("/api/messages")]
pub async fn send_message(
    state: web::Data<AppState>,
    auth: AuthUser,
    body: web::Json<SendMessageRequest>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let receiver_id = require_text("receiverId", body.receiver_id.as_deref())?;
    let content = require_text("content", body.content.as_deref())?;

    if receiver_id == auth.user.id {
        return Err(ApiError::validation("You cannot message yourself"));
    }
    let receiver = state
        .db
        .user_by_id(&receiver_id)?
        .ok_or_else(|| ApiError::not_found("Receiver not found"))?;

    let message = state.db.create_message(auth.id(), &receiver.id, &content)?;
    info!("User {} messaged user {}", auth.id(), receiver.id);
    notify(
        &state.db,
        &receiver.id,
        &format!("New message from {}", auth.user.name),
        NotificationKind::Message,
    );

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": message
    })))
}

#[get("/api/messages")]
pub async fn list_conversations(state: web::Data<AppState>, auth: AuthUser) -> ApiResult<HttpResponse> {
    let conversations = state.db.conversations(auth.id())?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "conversations": conversations
    })))
}

#[get("/api/messages/{user_id}")]
pub async fn get_conversation(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let messages = state.db.conversation(auth.id(), &path.into_inner())?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "messages": messages
    })))
}
