use tokio::sync::watch;
use tracing::debug;

use super::{ClientError, PortalClient};
use crate::data::jobs::Job;
use crate::utils::enums::Role;
use crate::utils::structures::JobQuery;

/// Reactive job list. There is no server push: callers refetch on mount or
/// after a change of their own, and stale entries are tolerated until then.
#[derive(Debug)]
pub struct JobCache {
    tx: watch::Sender<Vec<Job>>,
}

impl Default for JobCache {
    fn default() -> Self {
        Self::new()
    }
}

impl JobCache {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Vec::new());
        Self { tx }
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Job>> {
        self.tx.subscribe()
    }

    /// Replaces the whole list: a recruiter sees their own postings, anyone
    /// else sees every posting.
    pub async fn refresh(&self, client: &PortalClient, role: Option<Role>) -> Result<usize, ClientError> {
        let jobs = match role {
            Some(Role::Recruiter) => client.my_jobs().await?,
            _ => client.list_jobs(&JobQuery::default()).await?,
        };
        let count = jobs.len();
        self.tx.send_replace(jobs);
        debug!("Job cache refreshed with {} jobs", count);
        Ok(count)
    }

    pub fn clear(&self) {
        self.tx.send_replace(Vec::new());
    }
}
