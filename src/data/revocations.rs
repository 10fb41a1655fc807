use chrono::{DateTime, Utc};
use rusqlite::params;

use super::database::Database;

impl Database {
    /// Records a logged-out token id until the token would have expired anyway.
    pub fn revoke_token(&self, token_id: &str, expires_at: DateTime<Utc>) -> rusqlite::Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO revoked_tokens (token_id, expires_at) VALUES (?1, ?2)",
            params![token_id, expires_at],
        )?;
        Ok(())
    }

    pub fn is_token_revoked(&self, token_id: &str) -> rusqlite::Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM revoked_tokens WHERE token_id = ?1",
            [token_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn purge_expired_revocations(&self, now: DateTime<Utc>) -> rusqlite::Result<usize> {
        self.conn()
            .execute("DELETE FROM revoked_tokens WHERE expires_at <= ?1", params![now])
    }
}
