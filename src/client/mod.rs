//! Client side of the portal: a typed HTTP wrapper that carries the stored
//! bearer token, plus the reactive session and job list a UI renders from.

mod api;
mod jobs;
mod session;
mod store;

pub use api::{AuthResponse, NotificationFeed, PortalClient, ReviewList};
pub use jobs::JobCache;
pub use session::{Session, SessionState};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Http { status: u16, message: String },

    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Token storage failed: {0}")]
    Storage(#[from] std::io::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}
