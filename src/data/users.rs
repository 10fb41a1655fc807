use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::database::{json_column, new_id, to_json_text, Database};
use crate::utils::enums::Role;

/// An account. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub role: Role,
    pub company_name: Option<String>,
    pub university: Option<String>,
    pub skills: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public fields of a user embedded in another entity (job owner, applicant).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub company_name: Option<String>,
}

/// Applicant details shown to recruiters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub university: Option<String>,
    pub skills: Vec<String>,
}

pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Profile edits; `None` leaves the stored value alone.
#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    /// `Some(None)` clears the stored value
    pub company_name: Option<Option<String>>,
    pub university: Option<Option<String>>,
    pub skills: Option<Vec<String>>,
}

const USER_COLUMNS: &str =
    "id, name, email, password, role, company_name, university, skills, created_at, updated_at";

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            company_name: self.company_name.clone(),
        }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            password: row.get(3)?,
            role: row.get(4)?,
            company_name: row.get(5)?,
            university: row.get(6)?,
            skills: json_column(row, 7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}

impl Database {
    pub fn create_user(&self, new: &NewUser) -> rusqlite::Result<User> {
        let now = Utc::now();
        let user = User {
            id: new_id(),
            name: new.name.clone(),
            email: new.email.clone(),
            password: new.password_hash.clone(),
            role: new.role,
            company_name: None,
            university: None,
            skills: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.conn().execute(
            &format!("INSERT INTO users ({USER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"),
            params![
                user.id,
                user.name,
                user.email,
                user.password,
                user.role,
                user.company_name,
                user.university,
                to_json_text(&user.skills)?,
                user.created_at,
                user.updated_at
            ],
        )?;
        Ok(user)
    }

    pub fn user_by_id(&self, id: &str) -> rusqlite::Result<Option<User>> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                [id],
                User::from_row,
            )
            .optional()
    }

    pub fn user_by_email(&self, email: &str) -> rusqlite::Result<Option<User>> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                [email],
                User::from_row,
            )
            .optional()
    }

    pub fn list_users(&self) -> rusqlite::Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, rowid DESC"
        ))?;
        let users = stmt.query_map([], User::from_row)?;
        users.collect()
    }

    pub fn update_profile(&self, id: &str, changes: &ProfileChanges) -> rusqlite::Result<Option<User>> {
        let skills = changes.skills.as_ref().map(to_json_text).transpose()?;
        let updated = self.conn().execute(
            "UPDATE users SET
                name = COALESCE(?1, name),
                email = COALESCE(?2, email),
                company_name = CASE WHEN ?8 THEN ?3 ELSE company_name END,
                university = CASE WHEN ?9 THEN ?4 ELSE university END,
                skills = COALESCE(?5, skills),
                updated_at = ?6
             WHERE id = ?7",
            params![
                changes.name,
                changes.email,
                changes.company_name.as_ref().and_then(|v| v.as_deref()),
                changes.university.as_ref().and_then(|v| v.as_deref()),
                skills,
                Utc::now(),
                id,
                changes.company_name.is_some(),
                changes.university.is_some()
            ],
        )?;

        if updated == 0 {
            return Ok(None);
        }
        self.user_by_id(id)
    }

    pub fn set_password(&self, id: &str, password_hash: &str) -> rusqlite::Result<bool> {
        let updated = self.conn().execute(
            "UPDATE users SET password = ?1, updated_at = ?2 WHERE id = ?3",
            params![password_hash, Utc::now(), id],
        )?;
        Ok(updated > 0)
    }

    /// Removes the account. Foreign keys cascade to the user's jobs (and their
    /// applications), applications, notifications, messages, resumes and reviews.
    pub fn delete_user(&self, id: &str) -> rusqlite::Result<bool> {
        let deleted = self.conn().execute("DELETE FROM users WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }
}
