use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};

use super::database::{new_id, Database};

/// A student's rating of a job and its recruiter. Written once, never edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub job_id: String,
    pub recruiter_id: String,
    pub author_id: String,
    pub author_name: String,
    pub rating: u8,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Database {
    pub fn create_review(
        &self,
        job_id: &str,
        recruiter_id: &str,
        author_id: &str,
        rating: u8,
        text: &str,
    ) -> rusqlite::Result<Review> {
        let id = new_id();
        let created_at = Utc::now();
        let conn = self.conn();
        conn.execute(
            "INSERT INTO reviews (id, job_id, recruiter_id, author_id, rating, text, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![id, job_id, recruiter_id, author_id, rating, text, created_at],
        )?;

        let author_name: String =
            conn.query_row("SELECT name FROM users WHERE id = ?1", [author_id], |row| row.get(0))?;

        Ok(Review {
            id,
            job_id: job_id.to_string(),
            recruiter_id: recruiter_id.to_string(),
            author_id: author_id.to_string(),
            author_name,
            rating,
            text: text.to_string(),
            created_at,
        })
    }

    /// Newest first.
    pub fn reviews_for_job(&self, job_id: &str) -> rusqlite::Result<Vec<Review>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT r.id, r.job_id, r.recruiter_id, r.author_id, u.name, r.rating, r.text, r.created_at
             FROM reviews r JOIN users u ON u.id = r.author_id
             WHERE r.job_id = ?1
             ORDER BY r.created_at DESC, r.rowid DESC",
        )?;

        let reviews = stmt.query_map([job_id], |row| {
            Ok(Review {
                id: row.get(0)?,
                job_id: row.get(1)?,
                recruiter_id: row.get(2)?,
                author_id: row.get(3)?,
                author_name: row.get(4)?,
                rating: row.get(5)?,
                text: row.get(6)?,
                created_at: row.get(7)?,
            })
        })?;
        reviews.collect()
    }
}

/// Mean rating rounded to one decimal, `None` without reviews.
pub fn average_rating(reviews: &[Review]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let total: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
    let mean = f64::from(total) / reviews.len() as f64;
    Some((mean * 10.0).round() / 10.0)
}
