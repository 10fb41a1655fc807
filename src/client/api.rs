use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::store::TokenStore;
use super::ClientError;
use crate::data::applications::{Application, RecruiterApplication, StudentApplication};
use crate::data::jobs::{Job, JobDetail};
use crate::data::messages::{Conversation, Message};
use crate::data::notifications::Notification;
use crate::data::resumes::Resume;
use crate::data::reviews::Review;
use crate::data::users::User;
use crate::utils::enums::ApplicationStatus;
use crate::utils::structures::{
    ApplyRequest, JobQuery, JobRequest, LoginRequest, RegisterRequest, ReviewRequest, SendMessageRequest,
    StatusRequest, UpdateProfileRequest,
};

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationFeed {
    pub unread: usize,
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewList {
    pub average_rating: Option<f64>,
    pub reviews: Vec<Review>,
}

/// Typed wrapper over the portal's HTTP API.
///
/// Every request carries `Authorization: Bearer <token>` when the store holds
/// one. A 2xx answer is decoded; anything else becomes [`ClientError::Http`]
/// with the server's `message`.
#[derive(Clone)]
pub struct PortalClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
}

impl PortalClient {
    pub fn new(base_url: &str, tokens: Arc<dyn TokenStore>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub fn has_token(&self) -> bool {
        self.tokens.load().is_some()
    }

    pub fn clear_token(&self) -> Result<(), ClientError> {
        self.tokens.clear()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.base_url, path));
        match self.tokens.load() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn check(resp: Response) -> Result<Value, ClientError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json().await?);
        }

        let body: Option<Value> = resp.json().await.ok();
        let message = body
            .as_ref()
            .and_then(|b| b.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string());
        debug!("Request failed with {}: {}", status, message);

        Err(ClientError::Http {
            status: status.as_u16(),
            message,
        })
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Value, ClientError> {
        Self::check(builder.send().await?).await
    }

    /// Sends the request and decodes one field of the response body.
    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder, field: &str) -> Result<T, ClientError> {
        let mut body = self.send(builder).await?;
        let value = body.get_mut(field).map(Value::take).unwrap_or(Value::Null);
        Ok(serde_json::from_value(value)?)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        field: &str,
    ) -> Result<T, ClientError> {
        self.fetch(self.request(Method::POST, path).json(body), field).await
    }

    // Auth & profile

    pub async fn register(&self, request: &RegisterRequest) -> Result<User, ClientError> {
        let body = self.send(self.request(Method::POST, "/api/auth/register").json(request)).await?;
        self.store_session(body)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, ClientError> {
        let request = LoginRequest {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        };
        let body = self.send(self.request(Method::POST, "/api/auth/login").json(&request)).await?;
        self.store_session(body)
    }

    fn store_session(&self, body: Value) -> Result<User, ClientError> {
        let auth: AuthResponse = serde_json::from_value(body)?;
        self.tokens.save(&auth.token)?;
        Ok(auth.user)
    }

    /// Tells the server to revoke the token, then forgets it locally even if
    /// the server call failed.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let result = self.send(self.request(Method::POST, "/api/auth/logout")).await;
        self.tokens.clear()?;
        result.map(|_| ())
    }

    pub async fn profile(&self) -> Result<User, ClientError> {
        self.fetch(self.request(Method::GET, "/api/auth/profile"), "user").await
    }

    pub async fn update_profile(&self, changes: &UpdateProfileRequest) -> Result<User, ClientError> {
        self.fetch(self.request(Method::PUT, "/api/auth/profile").json(changes), "user")
            .await
    }

    // Jobs

    pub async fn list_jobs(&self, query: &JobQuery) -> Result<Vec<Job>, ClientError> {
        self.fetch(self.request(Method::GET, "/api/jobs").query(query), "jobs")
            .await
    }

    pub async fn internships(&self) -> Result<Vec<Job>, ClientError> {
        self.fetch(self.request(Method::GET, "/api/jobs/internship"), "jobs")
            .await
    }

    pub async fn my_jobs(&self) -> Result<Vec<Job>, ClientError> {
        self.fetch(self.request(Method::GET, "/api/recruiter/jobs"), "jobs")
            .await
    }

    pub async fn get_job(&self, job_id: &str) -> Result<JobDetail, ClientError> {
        self.fetch(self.request(Method::GET, &format!("/api/jobs/{job_id}")), "job")
            .await
    }

    pub async fn create_job(&self, job: &JobRequest) -> Result<Job, ClientError> {
        self.post_json("/api/jobs", job, "job").await
    }

    pub async fn update_job(&self, job_id: &str, changes: &JobRequest) -> Result<Job, ClientError> {
        let path = format!("/api/jobs/{job_id}");
        self.fetch(self.request(Method::PUT, &path).json(changes), "job").await
    }

    pub async fn delete_job(&self, job_id: &str) -> Result<(), ClientError> {
        self.send(self.request(Method::DELETE, &format!("/api/jobs/{job_id}")))
            .await
            .map(|_| ())
    }

    // Applications

    pub async fn apply(&self, job_id: &str, resume_link: &str, cover_letter: &str) -> Result<Application, ClientError> {
        let request = ApplyRequest {
            resume_link: Some(resume_link.to_string()),
            cover_letter: Some(cover_letter.to_string()),
        };
        self.post_json(&format!("/api/jobs/{job_id}/apply"), &request, "application")
            .await
    }

    pub async fn applied(&self) -> Result<Vec<StudentApplication>, ClientError> {
        self.fetch(self.request(Method::GET, "/api/student/applied"), "applications")
            .await
    }

    pub async fn withdraw(&self, application_id: &str) -> Result<(), ClientError> {
        let path = format!("/api/student/applied/{application_id}");
        self.send(self.request(Method::DELETE, &path)).await.map(|_| ())
    }

    pub async fn received_applications(&self) -> Result<Vec<RecruiterApplication>, ClientError> {
        self.fetch(self.request(Method::GET, "/api/recruiter/application"), "applications")
            .await
    }

    pub async fn set_status(
        &self,
        application_id: &str,
        status: ApplicationStatus,
    ) -> Result<Application, ClientError> {
        let request = StatusRequest {
            status: Some(status.to_string()),
        };
        let path = format!("/api/recruiter/application/{application_id}/status");
        self.fetch(self.request(Method::PATCH, &path).json(&request), "application")
            .await
    }

    // Notifications & messages

    pub async fn notifications(&self) -> Result<NotificationFeed, ClientError> {
        let body = self.send(self.request(Method::GET, "/api/notifications")).await?;
        Ok(serde_json::from_value(body)?)
    }

    pub async fn mark_notification_read(&self, notification_id: &str) -> Result<Notification, ClientError> {
        let path = format!("/api/notifications/{notification_id}/read");
        self.fetch(self.request(Method::PATCH, &path), "notification").await
    }

    pub async fn send_message(&self, receiver_id: &str, content: &str) -> Result<Message, ClientError> {
        let request = SendMessageRequest {
            receiver_id: Some(receiver_id.to_string()),
            content: Some(content.to_string()),
        };
        self.post_json("/api/messages", &request, "message").await
    }

    pub async fn conversation(&self, user_id: &str) -> Result<Vec<Message>, ClientError> {
        self.fetch(self.request(Method::GET, &format!("/api/messages/{user_id}")), "messages")
            .await
    }

    pub async fn conversations(&self) -> Result<Vec<Conversation>, ClientError> {
        self.fetch(self.request(Method::GET, "/api/messages"), "conversations")
            .await
    }

    // Reviews

    pub async fn review(&self, job_id: &str, rating: u8, text: &str) -> Result<Review, ClientError> {
        let request = ReviewRequest {
            rating: Some(i64::from(rating)),
            text: Some(text.to_string()),
        };
        self.post_json(&format!("/api/jobs/{job_id}/reviews"), &request, "review")
            .await
    }

    pub async fn reviews(&self, job_id: &str) -> Result<ReviewList, ClientError> {
        let body = self
            .send(self.request(Method::GET, &format!("/api/jobs/{job_id}/reviews")))
            .await?;
        Ok(serde_json::from_value(body)?)
    }

    // Resumes

    pub async fn upload_resume(
        &self,
        file_name: &str,
        contents: Vec<u8>,
        parsed_data: Option<&Value>,
    ) -> Result<Resume, ClientError> {
        let mut form = Form::new().part("resume", Part::bytes(contents).file_name(file_name.to_string()));
        if let Some(data) = parsed_data {
            form = form.text("parsedData", data.to_string());
        }
        self.fetch(self.request(Method::POST, "/api/resume/upload").multipart(form), "resume")
            .await
    }

    pub async fn latest_resume(&self) -> Result<Resume, ClientError> {
        self.fetch(self.request(Method::GET, "/api/resume"), "resume").await
    }
}
