use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::database::{new_id, Database};

/// Metadata of an uploaded resume file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resume {
    pub id: String,
    pub user_id: String,
    pub file_url: String,
    pub original_name: String,
    pub parsed_data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl Database {
    pub fn create_resume(
        &self,
        user_id: &str,
        file_url: &str,
        original_name: &str,
        parsed_data: Option<serde_json::Value>,
    ) -> rusqlite::Result<Resume> {
        let resume = Resume {
            id: new_id(),
            user_id: user_id.to_string(),
            file_url: file_url.to_string(),
            original_name: original_name.to_string(),
            parsed_data,
            created_at: Utc::now(),
        };

        self.conn().execute(
            "INSERT INTO resumes (id, user_id, file_url, original_name, parsed_data, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                resume.id,
                resume.user_id,
                resume.file_url,
                resume.original_name,
                resume.parsed_data,
                resume.created_at
            ],
        )?;
        Ok(resume)
    }

    /// Most recent upload of the user.
    pub fn latest_resume(&self, user_id: &str) -> rusqlite::Result<Option<Resume>> {
        self.conn()
            .query_row(
                "SELECT id, user_id, file_url, original_name, parsed_data, created_at
                 FROM resumes WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC LIMIT 1",
                [user_id],
                |row| {
                    Ok(Resume {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        file_url: row.get(2)?,
                        original_name: row.get(3)?,
                        parsed_data: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                },
            )
            .optional()
    }
}
