use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

use crate::data::users::{NewUser, ProfileChanges};
use crate::utils::auth::{issue_token, optional_claims, AuthUser};
use crate::utils::enc::{hash_password, verify_password};
use crate::utils::enums::Role;
use crate::utils::error::{ApiError, ApiResult};
use crate::utils::structures::{ChangePasswordRequest, LoginRequest, RegisterRequest, UpdateProfileRequest};
use crate::utils::validate::{
    normalize_email, optional_text, require_text, validate_email, validate_name, validate_password,
};
use crate::AppState;

const DUPLICATE_EMAIL: &str = "User already exists with this email";

#[post("/api/auth/register")]
pub async fn register(state: web::Data<AppState>, body: web::Json<RegisterRequest>) -> ApiResult<HttpResponse> {
    let body = body.into_inner();

    let name = require_text("name", body.name.as_deref())?;
    validate_name(&name)?;
    let email = normalize_email(&require_text("email", body.email.as_deref())?);
    validate_email(&email)?;
    let password = body.password.unwrap_or_default();
    validate_password(&password)?;

    let role: Role = body.role.as_deref().unwrap_or("student").trim().parse()?;
    if !role.self_registrable() {
        return Err(ApiError::validation("Role must be either student or recruiter"));
    }

    if state.db.user_by_email(&email)?.is_some() {
        return Err(ApiError::conflict(DUPLICATE_EMAIL));
    }

    let password_hash = hash_password(&password, &state.config.hash_secret)?;
    let user = state
        .db
        .create_user(&NewUser {
            name,
            email,
            password_hash,
            role,
        })
        .map_err(|e| ApiError::conflict_on_unique(e, DUPLICATE_EMAIL))?;

    let token = issue_token(&state.config, &user.id)?;
    info!("Registered {} account {}", user.role, user.id);

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "token": token,
        "user": user
    })))
}

#[post("/api/auth/login")]
pub async fn login(state: web::Data<AppState>, body: web::Json<LoginRequest>) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let (Some(email), Some(password)) = (body.email, body.password) else {
        return Err(ApiError::validation("Email and password are required"));
    };
    let email = normalize_email(&email);

    // Same answer for unknown email and wrong password
    let invalid = || ApiError::auth("Invalid credentials");

    let Some(user) = state.db.user_by_email(&email)? else {
        warn!("Login failed: unknown email");
        return Err(invalid());
    };

    if !verify_password(&password, &user.password, &state.config.hash_secret)? {
        warn!("Login failed: wrong password for user {}", user.id);
        return Err(invalid());
    }

    let token = issue_token(&state.config, &user.id)?;
    info!("User {} logged in", user.id);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "token": token,
        "user": user
    })))
}

/// Clients drop their token; if it is presented here it is also revoked server side.
#[post("/api/auth/logout")]
pub async fn logout(req: HttpRequest, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    if let Some(claims) = optional_claims(&req) {
        state.db.revoke_token(&claims.jti, claims.expires_at())?;
        let purged = state.db.purge_expired_revocations(Utc::now())?;
        info!("User {} logged out ({} stale revocations purged)", claims.sub, purged);
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Logged out successfully"
    })))
}

#[get("/api/auth/profile")]
pub async fn get_profile(auth: AuthUser) -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "user": auth.user
    })))
}

#[put("/api/auth/profile")]
pub async fn update_profile(
    state: web::Data<AppState>,
    auth: AuthUser,
    body: web::Json<UpdateProfileRequest>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let mut changes = ProfileChanges::default();

    if let Some(name) = body.name {
        validate_name(&name)?;
        changes.name = Some(name.trim().to_string());
    }

    if let Some(email) = body.email {
        let email = normalize_email(&email);
        validate_email(&email)?;
        if let Some(existing) = state.db.user_by_email(&email)? {
            if existing.id != auth.user.id {
                return Err(ApiError::conflict(DUPLICATE_EMAIL));
            }
        }
        changes.email = Some(email);
    }

    // A blank value clears the field
    changes.company_name = body.company_name.map(|v| optional_text(Some(&v)));
    changes.university = body.university.map(|v| optional_text(Some(&v)));
    changes.skills = body.skills.map(|s| s.normalize());

    let user = state
        .db
        .update_profile(auth.id(), &changes)
        .map_err(|e| ApiError::conflict_on_unique(e, DUPLICATE_EMAIL))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    info!("User {} updated their profile", user.id);
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "user": user
    })))
}

#[put("/api/auth/password")]
pub async fn change_password(
    state: web::Data<AppState>,
    auth: AuthUser,
    body: web::Json<ChangePasswordRequest>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let current = body.current_password.unwrap_or_default();
    let new_password = body.new_password.unwrap_or_default();

    if !verify_password(&current, &auth.user.password, &state.config.hash_secret)? {
        return Err(ApiError::auth("Current password is incorrect"));
    }
    validate_password(&new_password)?;

    let hash = hash_password(&new_password, &state.config.hash_secret)?;
    state.db.set_password(auth.id(), &hash)?;
    info!("User {} changed their password", auth.id());

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Password updated successfully"
    })))
}

#[delete("/api/auth/profile")]
pub async fn delete_account(state: web::Data<AppState>, auth: AuthUser) -> ApiResult<HttpResponse> {
    state.db.delete_user(auth.id())?;
    state
        .db
        .revoke_token(&auth.claims.jti, auth.claims.expires_at())?;
    info!("User {} ({}) deleted their account", auth.id(), auth.user.role);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Account deleted successfully"
    })))
}
