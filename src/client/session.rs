use tokio::sync::watch;
use tracing::{info, warn};

use super::{ClientError, PortalClient};
use crate::data::users::User;
use crate::utils::enums::Role;

/// Snapshot of who is signed in. `loading` is set while a call that may
/// change the user is in flight.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub user: Option<User>,
    pub loading: bool,
}

impl Session {
    /// Where a UI should send this session.
    pub fn landing_route(&self) -> &'static str {
        match self.user.as_ref().map(|u| u.role) {
            None => "/login",
            Some(Role::Student) => "/student/dashboard",
            Some(Role::Recruiter) => "/recruiter/dashboard",
            Some(Role::Admin) => "/admin/dashboard",
        }
    }
}

/// Process-wide session container. Subscribers see every change and can
/// redirect on it.
#[derive(Debug)]
pub struct SessionState {
    tx: watch::Sender<Session>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// Starts in the loading state until [`SessionState::restore`] runs.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Session {
            user: None,
            loading: true,
        });
        Self { tx }
    }

    pub fn current(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.tx.borrow().user.clone()
    }

    pub fn landing_route(&self) -> &'static str {
        self.tx.borrow().landing_route()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    fn set_loading(&self) {
        self.tx.send_modify(|session| session.loading = true);
    }

    fn set_user(&self, user: Option<User>) {
        self.tx.send_replace(Session { user, loading: false });
    }

    /// Loads the profile behind a stored token. A token the server rejects
    /// with 401 is dropped; other failures leave it for a later retry.
    pub async fn restore(&self, client: &PortalClient) -> Result<Option<User>, ClientError> {
        if !client.has_token() {
            self.set_user(None);
            return Ok(None);
        }

        self.set_loading();
        match client.profile().await {
            Ok(user) => {
                self.set_user(Some(user.clone()));
                Ok(Some(user))
            }
            Err(e) if e.is_unauthorized() => {
                info!("Stored token rejected, clearing session");
                client.clear_token()?;
                self.set_user(None);
                Ok(None)
            }
            Err(e) => {
                warn!("Failed to restore session: {}", e);
                self.set_user(None);
                Err(e)
            }
        }
    }

    pub async fn login(&self, client: &PortalClient, email: &str, password: &str) -> Result<User, ClientError> {
        self.set_loading();
        match client.login(email, password).await {
            Ok(user) => {
                self.set_user(Some(user.clone()));
                Ok(user)
            }
            Err(e) => {
                self.set_user(None);
                Err(e)
            }
        }
    }

    /// Always ends signed out; the server error, if any, is still reported.
    pub async fn logout(&self, client: &PortalClient) -> Result<(), ClientError> {
        self.set_loading();
        let result = client.logout().await;
        self.set_user(None);
        result
    }
}
