use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::database::{json_column, new_id, Database};
use super::jobs::{Job, JOB_COLUMNS};
use super::users::StudentSummary;
use crate::utils::enums::ApplicationStatus;

/// A student's submission against one job. At most one per (job, student).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub job_id: String,
    pub student_id: String,
    pub resume_link: String,
    pub cover_letter: Option<String>,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a student sees in their list: the application and the full job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentApplication {
    pub id: String,
    pub status: ApplicationStatus,
    pub resume_link: String,
    pub cover_letter: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub job: Job,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRef {
    pub id: String,
    pub title: String,
}

/// What a recruiter sees: the application, the job title and the applicant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecruiterApplication {
    pub id: String,
    pub status: ApplicationStatus,
    pub resume_link: String,
    pub cover_letter: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub job: JobRef,
    pub student: StudentSummary,
}

pub struct NewApplication {
    pub job_id: String,
    pub student_id: String,
    pub resume_link: String,
    pub cover_letter: Option<String>,
}

const APPLICATION_COLUMNS: &str =
    "id, job_id, student_id, resume_link, cover_letter, status, created_at, updated_at";

impl Application {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Application {
            id: row.get(0)?,
            job_id: row.get(1)?,
            student_id: row.get(2)?,
            resume_link: row.get(3)?,
            cover_letter: row.get(4)?,
            status: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

impl Database {
    /// Inserts a pending application. A second application for the same
    /// (job, student) fails with a unique-constraint violation.
    pub fn create_application(&self, new: &NewApplication) -> rusqlite::Result<Application> {
        let now = Utc::now();
        let application = Application {
            id: new_id(),
            job_id: new.job_id.clone(),
            student_id: new.student_id.clone(),
            resume_link: new.resume_link.clone(),
            cover_letter: new.cover_letter.clone(),
            status: ApplicationStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        self.conn().execute(
            &format!("INSERT INTO applications ({APPLICATION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
            params![
                application.id,
                application.job_id,
                application.student_id,
                application.resume_link,
                application.cover_letter,
                application.status,
                application.created_at,
                application.updated_at
            ],
        )?;
        Ok(application)
    }

    pub fn application_by_id(&self, id: &str) -> rusqlite::Result<Option<Application>> {
        self.conn()
            .query_row(
                &format!("SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = ?1"),
                [id],
                Application::from_row,
            )
            .optional()
    }

    pub fn application_for(&self, job_id: &str, student_id: &str) -> rusqlite::Result<Option<Application>> {
        self.conn()
            .query_row(
                &format!("SELECT {APPLICATION_COLUMNS} FROM applications WHERE job_id = ?1 AND student_id = ?2"),
                [job_id, student_id],
                Application::from_row,
            )
            .optional()
    }

    /// The student's applications with job and recruiter populated, newest first.
    pub fn applications_for_student(&self, student_id: &str) -> rusqlite::Result<Vec<StudentApplication>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT a.id, a.status, a.resume_link, a.cover_letter, a.created_at, a.updated_at, {JOB_COLUMNS}
             FROM applications a
             JOIN jobs j ON j.id = a.job_id
             JOIN users u ON u.id = j.recruiter_id
             WHERE a.student_id = ?1
             ORDER BY a.created_at DESC, a.rowid DESC"
        ))?;

        let applications = stmt.query_map([student_id], |row| {
            Ok(StudentApplication {
                id: row.get(0)?,
                status: row.get(1)?,
                resume_link: row.get(2)?,
                cover_letter: row.get(3)?,
                created_at: row.get(4)?,
                updated_at: row.get(5)?,
                job: Job::from_row_at(row, 6)?,
            })
        })?;
        applications.collect()
    }

    /// Applications to any job owned by the recruiter, optionally narrowed to
    /// one job, newest first.
    pub fn applications_for_recruiter(
        &self,
        recruiter_id: &str,
        job_id: Option<&str>,
    ) -> rusqlite::Result<Vec<RecruiterApplication>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT a.id, a.status, a.resume_link, a.cover_letter, a.created_at, a.updated_at,
                    j.id, j.title,
                    s.id, s.name, s.email, s.university, s.skills
             FROM applications a
             JOIN jobs j ON j.id = a.job_id
             JOIN users s ON s.id = a.student_id
             WHERE j.recruiter_id = ?1 AND (?2 IS NULL OR j.id = ?2)
             ORDER BY a.created_at DESC, a.rowid DESC",
        )?;

        let applications = stmt.query_map(params![recruiter_id, job_id], |row| {
            Ok(RecruiterApplication {
                id: row.get(0)?,
                status: row.get(1)?,
                resume_link: row.get(2)?,
                cover_letter: row.get(3)?,
                created_at: row.get(4)?,
                updated_at: row.get(5)?,
                job: JobRef {
                    id: row.get(6)?,
                    title: row.get(7)?,
                },
                student: StudentSummary {
                    id: row.get(8)?,
                    name: row.get(9)?,
                    email: row.get(10)?,
                    university: row.get(11)?,
                    skills: json_column(row, 12)?,
                },
            })
        })?;
        applications.collect()
    }

    pub fn set_application_status(
        &self,
        id: &str,
        status: ApplicationStatus,
    ) -> rusqlite::Result<Option<Application>> {
        let updated = self.conn().execute(
            "UPDATE applications SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status, Utc::now(), id],
        )?;

        if updated == 0 {
            return Ok(None);
        }
        self.application_by_id(id)
    }

    pub fn delete_application(&self, id: &str) -> rusqlite::Result<bool> {
        let deleted = self.conn().execute("DELETE FROM applications WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::database::is_unique_violation;
    use crate::data::jobs::tests::backend_engineer;
    use crate::data::users::tests::seed_user;
    use crate::utils::enums::Role;

    fn apply(db: &Database, job_id: &str, student_id: &str) -> rusqlite::Result<Application> {
        db.create_application(&NewApplication {
            job_id: job_id.to_string(),
            student_id: student_id.to_string(),
            resume_link: "http://r.example".to_string(),
            cover_letter: Some("Hi".to_string()),
        })
    }

    #[test]
    fn one_application_per_job_and_student() {
        let db = Database::open_in_memory().unwrap();
        let recruiter = seed_user(&db, "r@x.com", Role::Recruiter);
        let student = seed_user(&db, "s@x.com", Role::Student);
        let job = db.create_job(&recruiter.id, &backend_engineer()).unwrap();

        let first = apply(&db, &job.id, &student.id).unwrap();
        assert_eq!(first.status, ApplicationStatus::Pending);

        let err = apply(&db, &job.id, &student.id).unwrap_err();
        assert!(is_unique_violation(&err));
        assert_eq!(db.job_applicants(&job.id).unwrap().len(), 1);
    }

    #[test]
    fn views_populate_related_entities() {
        let db = Database::open_in_memory().unwrap();
        let recruiter = seed_user(&db, "r@x.com", Role::Recruiter);
        let student = seed_user(&db, "s@x.com", Role::Student);
        let job = db.create_job(&recruiter.id, &backend_engineer()).unwrap();
        apply(&db, &job.id, &student.id).unwrap();

        let mine = db.applications_for_student(&student.id).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].job.title, "Backend Engineer");
        assert_eq!(mine[0].job.recruiter.email, "r@x.com");

        let received = db.applications_for_recruiter(&recruiter.id, None).unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].job.title, "Backend Engineer");
        assert_eq!(received[0].student.email, "s@x.com");

        let other = seed_user(&db, "other@x.com", Role::Recruiter);
        assert!(db.applications_for_recruiter(&other.id, None).unwrap().is_empty());
        assert!(db
            .applications_for_recruiter(&recruiter.id, Some("another-job"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn status_updates_and_deletes() {
        let db = Database::open_in_memory().unwrap();
        let recruiter = seed_user(&db, "r@x.com", Role::Recruiter);
        let student = seed_user(&db, "s@x.com", Role::Student);
        let job = db.create_job(&recruiter.id, &backend_engineer()).unwrap();
        let application = apply(&db, &job.id, &student.id).unwrap();

        let accepted = db
            .set_application_status(&application.id, ApplicationStatus::Accepted)
            .unwrap()
            .unwrap();
        assert_eq!(accepted.status, ApplicationStatus::Accepted);

        assert!(db.delete_application(&application.id).unwrap());
        assert!(!db.delete_application(&application.id).unwrap());
        assert!(db.job_applicants(&job.id).unwrap().is_empty());
    }

    #[test]
    fn deleting_job_or_recruiter_cascades() {
        let db = Database::open_in_memory().unwrap();
        let recruiter = seed_user(&db, "r@x.com", Role::Recruiter);
        let student = seed_user(&db, "s@x.com", Role::Student);
        let job = db.create_job(&recruiter.id, &backend_engineer()).unwrap();
        let application = apply(&db, &job.id, &student.id).unwrap();

        assert_eq!(db.delete_job(&job.id).unwrap(), Some(1));
        assert!(db.application_by_id(&application.id).unwrap().is_none());

        let job = db.create_job(&recruiter.id, &backend_engineer()).unwrap();
        let application = apply(&db, &job.id, &student.id).unwrap();
        assert!(db.delete_user(&recruiter.id).unwrap());
        assert!(db.job_by_id(&job.id).unwrap().is_none());
        assert!(db.application_by_id(&application.id).unwrap().is_none());
        assert!(db.user_by_id(&student.id).unwrap().is_some());
    }
}
