//! Bearer-token sessions: issuing and verifying tokens, and the request
//! extractors that resolve a token to a live user and enforce roles.

use std::ops::Deref;

use actix_web::dev::Payload;
use actix_web::http::header::Header;
use actix_web::{web, FromRequest, HttpRequest};
use actix_web_httpauth::headers::authorization::{Authorization, Bearer};
use chrono::{DateTime, Utc};
use futures_util::future::{ready, Ready};
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::warn;

use crate::data::database::new_id;
use crate::data::jobs::Job;
use crate::data::users::User;
use crate::data::Database;
use crate::utils::config::PortalConfig;
use crate::utils::enums::Role;
use crate::utils::error::{ApiError, ApiResult};
use crate::AppState;

/// Token payload: subject is the user id, `jti` identifies the token for logout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}

fn signing_key(secret: &str) -> ApiResult<Hmac<Sha256>> {
    Hmac::new_from_slice(secret.as_bytes())
        .map_err(|e| ApiError::server(format!("Invalid signing key: {e}")))
}

pub fn issue_token(config: &PortalConfig, user_id: &str) -> ApiResult<String> {
    let now = Utc::now();
    let ttl = chrono::Duration::from_std(config.token_ttl)
        .map_err(|e| ApiError::server(format!("Invalid token lifetime: {e}")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
        jti: new_id(),
    };

    claims
        .sign_with_key(&signing_key(&config.jwt_secret)?)
        .map_err(|e| ApiError::server(format!("Failed to sign token: {e}")))
}

/// Checks signature and expiry.
pub fn verify_token(config: &PortalConfig, token: &str) -> ApiResult<Claims> {
    let claims: Claims = token
        .verify_with_key(&signing_key(&config.jwt_secret)?)
        .map_err(|_| ApiError::auth("Token is not valid"))?;

    if claims.exp <= Utc::now().timestamp() {
        return Err(ApiError::auth("Token has expired"));
    }
    Ok(claims)
}

pub fn bearer_token(req: &HttpRequest) -> ApiResult<String> {
    let header = Authorization::<Bearer>::parse(req)
        .map_err(|_| ApiError::auth("No token, authorization denied"))?;
    Ok(header.into_scheme().token().to_string())
}

fn app_state(req: &HttpRequest) -> ApiResult<&web::Data<AppState>> {
    req.app_data::<web::Data<AppState>>()
        .ok_or_else(|| ApiError::server("Application state is not configured"))
}

/// Valid, unrevoked claims of the request's bearer token, if it carries one.
pub fn optional_claims(req: &HttpRequest) -> Option<Claims> {
    let state = app_state(req).ok()?;
    let token = bearer_token(req).ok()?;
    verify_token(&state.config, &token).ok()
}

fn authenticate(req: &HttpRequest) -> ApiResult<AuthUser> {
    let state = app_state(req)?;
    let token = bearer_token(req)?;
    let claims = verify_token(&state.config, &token).inspect_err(|e| {
        warn!("Rejected token on {}: {}", req.path(), e);
    })?;

    if state.db.is_token_revoked(&claims.jti)? {
        return Err(ApiError::auth("Token has been revoked"));
    }

    let user = state
        .db
        .user_by_id(&claims.sub)?
        .ok_or_else(|| ApiError::auth("User no longer exists"))?;

    Ok(AuthUser { user, claims })
}

/// The authenticated caller. Extracting it fails the request with 401.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub claims: Claims,
}

impl AuthUser {
    pub fn id(&self) -> &str {
        &self.user.id
    }
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

pub fn require_role(user: &User, allowed: &[Role]) -> ApiResult<()> {
    if allowed.contains(&user.role) {
        return Ok(());
    }
    let names: Vec<&str> = allowed.iter().map(Role::as_str).collect();
    Err(ApiError::forbidden(format!(
        "Access denied: {} role required",
        names.join(" or ")
    )))
}

/// Extractors that authenticate and then demand a role (403 otherwise).
macro_rules! role_extractor {
    ($(#[$meta:meta])* $name:ident, $($role:expr),+) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name(pub AuthUser);

        impl FromRequest for $name {
            type Error = ApiError;
            type Future = Ready<Result<Self, Self::Error>>;

            fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
                ready(authenticate(req).and_then(|auth| {
                    require_role(&auth.user, &[$($role),+])?;
                    Ok($name(auth))
                }))
            }
        }

        impl Deref for $name {
            type Target = AuthUser;

            fn deref(&self) -> &AuthUser {
                &self.0
            }
        }
    };
}

role_extractor!(StudentUser, Role::Student);
role_extractor!(RecruiterUser, Role::Recruiter);
role_extractor!(AdminUser, Role::Admin);

/// Loads a job the caller must own: 404 if absent, 403 if someone else's.
pub fn owned_job(db: &Database, job_id: &str, user: &User) -> ApiResult<Job> {
    let job = db
        .job_by_id(job_id)?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    if !job.is_owned_by(&user.id) {
        warn!("User {} attempted to modify job {} they do not own", user.id, job.id);
        return Err(ApiError::forbidden("Not authorized to modify this job"));
    }
    Ok(job)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn issued_tokens_verify() {
        let config = PortalConfig::default();
        let token = issue_token(&config, "user-1").unwrap();

        let claims = verify_token(&config, &token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert!(claims.exp > claims.iat);
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let config = PortalConfig::default();
        let token = issue_token(&config, "user-1").unwrap();

        let other = PortalConfig {
            jwt_secret: "another-secret".into(),
            ..PortalConfig::default()
        };
        assert!(matches!(verify_token(&other, &token), Err(ApiError::Auth(_))));
        assert!(matches!(verify_token(&config, "garbage"), Err(ApiError::Auth(_))));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let config = PortalConfig {
            token_ttl: Duration::from_secs(0),
            ..PortalConfig::default()
        };
        let token = issue_token(&config, "user-1").unwrap();
        let err = verify_token(&config, &token).unwrap_err();
        assert_eq!(err.to_string(), "Token has expired");
    }

    #[test]
    fn role_guard() {
        let db = Database::open_in_memory().unwrap();
        let student = crate::data::users::tests::seed_user(&db, "s@x.com", Role::Student);

        assert!(require_role(&student, &[Role::Student]).is_ok());
        let err = require_role(&student, &[Role::Recruiter, Role::Admin]).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert_eq!(err.to_string(), "Access denied: recruiter or admin role required");
    }

    #[test]
    fn ownership_guard() {
        let db = Database::open_in_memory().unwrap();
        let owner = crate::data::users::tests::seed_user(&db, "r1@x.com", Role::Recruiter);
        let other = crate::data::users::tests::seed_user(&db, "r2@x.com", Role::Recruiter);
        let job = db
            .create_job(&owner.id, &crate::data::jobs::tests::backend_engineer())
            .unwrap();

        assert_eq!(owned_job(&db, &job.id, &owner).unwrap().id, job.id);
        assert!(matches!(owned_job(&db, &job.id, &other), Err(ApiError::Forbidden(_))));
        assert!(matches!(owned_job(&db, "missing", &owner), Err(ApiError::NotFound(_))));
    }
}
