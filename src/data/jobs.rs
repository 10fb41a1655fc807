use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::database::{json_column, new_id, to_json_text, Database};
use super::users::UserSummary;
use crate::utils::enums::{JobType, TimePeriod};

/// A posting, with its owning recruiter populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub title: String,
    pub description: String,
    pub company: String,
    pub location: String,
    pub salary: Option<String>,
    pub skills: Vec<String>,
    pub recruiter: UserSummary,
    pub apply_by: NaiveDate,
    pub time_period: TimePeriod,
    pub job_type: JobType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A job together with the users who applied to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDetail {
    #[serde(flatten)]
    pub job: Job,
    pub applicants: Vec<UserSummary>,
}

#[derive(Debug)]
pub struct NewJob {
    pub title: String,
    pub description: String,
    pub company: String,
    pub location: String,
    pub salary: Option<String>,
    pub skills: Vec<String>,
    pub apply_by: NaiveDate,
    pub time_period: TimePeriod,
    pub job_type: JobType,
}

/// Partial update; the owning recruiter is deliberately absent.
#[derive(Debug, Default)]
pub struct JobChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    /// `Some(None)` clears the salary
    pub salary: Option<Option<String>>,
    pub skills: Option<Vec<String>>,
    pub apply_by: Option<NaiveDate>,
    pub time_period: Option<TimePeriod>,
    pub job_type: Option<JobType>,
}

#[derive(Debug, Default)]
pub struct JobFilter {
    /// Substring of title, company or description
    pub search: Option<String>,
    pub location: Option<String>,
    pub job_type: Option<JobType>,
    pub recruiter_id: Option<String>,
}

/// Job columns with the recruiter joined in as `u`; read back with `Job::from_row_at`.
pub(crate) const JOB_COLUMNS: &str = "j.id, j.title, j.description, j.company, j.location, j.salary, j.skills,
        j.apply_by, j.time_period, j.job_type, j.created_at, j.updated_at,
        u.id, u.name, u.email, u.company_name";

const JOB_FROM: &str = "FROM jobs j JOIN users u ON u.id = j.recruiter_id";

/// `%term%` with the LIKE wildcards in `term` escaped for `ESCAPE '\'`.
fn contains_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

impl Job {
    /// Reads the `JOB_COLUMNS` layout starting at `offset`.
    pub(crate) fn from_row_at(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Job {
            id: row.get(offset)?,
            title: row.get(offset + 1)?,
            description: row.get(offset + 2)?,
            company: row.get(offset + 3)?,
            location: row.get(offset + 4)?,
            salary: row.get(offset + 5)?,
            skills: json_column(row, offset + 6)?,
            apply_by: row.get(offset + 7)?,
            time_period: row.get(offset + 8)?,
            job_type: row.get(offset + 9)?,
            created_at: row.get(offset + 10)?,
            updated_at: row.get(offset + 11)?,
            recruiter: UserSummary {
                id: row.get(offset + 12)?,
                name: row.get(offset + 13)?,
                email: row.get(offset + 14)?,
                company_name: row.get(offset + 15)?,
            },
        })
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.recruiter.id == user_id
    }
}

impl Database {
    pub fn create_job(&self, recruiter_id: &str, new: &NewJob) -> rusqlite::Result<Job> {
        let id = new_id();
        let now = Utc::now();
        self.conn().execute(
            "INSERT INTO jobs (id, title, description, company, location, salary, skills, recruiter_id,
                apply_by, time_period, job_type, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
            params![
                id,
                new.title,
                new.description,
                new.company,
                new.location,
                new.salary,
                to_json_text(&new.skills)?,
                recruiter_id,
                new.apply_by,
                new.time_period,
                new.job_type,
                now
            ],
        )?;

        self.job_by_id(&id)?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    pub fn job_by_id(&self, id: &str) -> rusqlite::Result<Option<Job>> {
        self.conn()
            .query_row(&format!("SELECT {JOB_COLUMNS} {JOB_FROM} WHERE j.id = ?1"), [id], |row| {
                Job::from_row_at(row, 0)
            })
            .optional()
    }

    pub fn job_detail(&self, id: &str) -> rusqlite::Result<Option<JobDetail>> {
        let Some(job) = self.job_by_id(id)? else {
            return Ok(None);
        };
        let applicants = self.job_applicants(id)?;
        Ok(Some(JobDetail { job, applicants }))
    }

    /// Jobs matching every given filter, newest first.
    pub fn list_jobs(&self, filter: &JobFilter) -> rusqlite::Result<Vec<Job>> {
        let search = filter.search.as_deref().map(contains_pattern);
        let location = filter.location.as_deref().map(contains_pattern);

        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {JOB_COLUMNS} {JOB_FROM}
             WHERE (?1 IS NULL OR j.title LIKE ?1 ESCAPE '\\'
                    OR j.company LIKE ?1 ESCAPE '\\' OR j.description LIKE ?1 ESCAPE '\\')
               AND (?2 IS NULL OR j.location LIKE ?2 ESCAPE '\\')
               AND (?3 IS NULL OR j.job_type = ?3)
               AND (?4 IS NULL OR j.recruiter_id = ?4)
             ORDER BY j.created_at DESC, j.rowid DESC"
        ))?;

        let jobs = stmt.query_map(
            params![search, location, filter.job_type, filter.recruiter_id],
            |row| Job::from_row_at(row, 0),
        )?;
        jobs.collect()
    }

    pub fn update_job(&self, id: &str, changes: &JobChanges) -> rusqlite::Result<Option<Job>> {
        let skills = changes.skills.as_ref().map(to_json_text).transpose()?;
        let updated = self.conn().execute(
            "UPDATE jobs SET
                title = COALESCE(?1, title),
                description = COALESCE(?2, description),
                company = COALESCE(?3, company),
                location = COALESCE(?4, location),
                salary = CASE WHEN ?12 THEN ?5 ELSE salary END,
                skills = COALESCE(?6, skills),
                apply_by = COALESCE(?7, apply_by),
                time_period = COALESCE(?8, time_period),
                job_type = COALESCE(?9, job_type),
                updated_at = ?10
             WHERE id = ?11",
            params![
                changes.title,
                changes.description,
                changes.company,
                changes.location,
                changes.salary.as_ref().and_then(|s| s.as_deref()),
                skills,
                changes.apply_by,
                changes.time_period,
                changes.job_type,
                Utc::now(),
                id,
                changes.salary.is_some()
            ],
        )?;

        if updated == 0 {
            return Ok(None);
        }
        self.job_by_id(id)
    }

    /// Deletes the job and its applications in one transaction. Returns the
    /// number of applications removed, or `None` if there was no such job.
    pub fn delete_job(&self, id: &str) -> rusqlite::Result<Option<usize>> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let applications = tx.execute("DELETE FROM applications WHERE job_id = ?1", [id])?;
        let deleted = tx.execute("DELETE FROM jobs WHERE id = ?1", [id])?;
        if deleted == 0 {
            tx.rollback()?;
            return Ok(None);
        }

        tx.commit()?;
        Ok(Some(applications))
    }

    /// Users who applied to the job, in application order.
    pub fn job_applicants(&self, job_id: &str) -> rusqlite::Result<Vec<UserSummary>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT u.id, u.name, u.email, u.company_name
             FROM applications a JOIN users u ON u.id = a.student_id
             WHERE a.job_id = ?1
             ORDER BY a.created_at, a.rowid",
        )?;

        let applicants = stmt.query_map([job_id], |row| {
            Ok(UserSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                company_name: row.get(3)?,
            })
        })?;
        applicants.collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::users::tests::seed_user;
    use crate::utils::enums::Role;

    pub(crate) fn backend_engineer() -> NewJob {
        NewJob {
            title: "Backend Engineer".into(),
            description: "Build APIs".into(),
            company: "Acme".into(),
            location: "Remote".into(),
            salary: None,
            skills: vec!["Go".into()],
            apply_by: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            time_period: TimePeriod::FullTime,
            job_type: JobType::Job,
        }
    }

    #[test]
    fn create_populates_recruiter() {
        let db = Database::open_in_memory().unwrap();
        let recruiter = seed_user(&db, "r@x.com", Role::Recruiter);

        let job = db.create_job(&recruiter.id, &backend_engineer()).unwrap();
        assert_eq!(job.recruiter.id, recruiter.id);
        assert_eq!(job.recruiter.email, "r@x.com");
        assert_eq!(job.skills, vec!["Go"]);
        assert!(job.is_owned_by(&recruiter.id));

        let fetched = db.job_by_id(&job.id).unwrap().unwrap();
        assert_eq!(fetched.title, "Backend Engineer");
        assert_eq!(fetched.apply_by, job.apply_by);
    }

    #[test]
    fn filters_combine() {
        let db = Database::open_in_memory().unwrap();
        let first = seed_user(&db, "r1@x.com", Role::Recruiter);
        let second = seed_user(&db, "r2@x.com", Role::Recruiter);

        db.create_job(&first.id, &backend_engineer()).unwrap();
        db.create_job(
            &second.id,
            &NewJob {
                title: "Data Intern".into(),
                location: "Berlin".into(),
                job_type: JobType::Internship,
                time_period: TimePeriod::Internship,
                ..backend_engineer()
            },
        )
        .unwrap();

        assert_eq!(db.list_jobs(&JobFilter::default()).unwrap().len(), 2);

        let interns = db
            .list_jobs(&JobFilter {
                job_type: Some(JobType::Internship),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(interns.len(), 1);
        assert_eq!(interns[0].title, "Data Intern");

        let mine = db
            .list_jobs(&JobFilter {
                recruiter_id: Some(first.id.clone()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].title, "Backend Engineer");

        let searched = db
            .list_jobs(&JobFilter {
                search: Some("backend".into()),
                location: Some("remote".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(searched.len(), 1);
    }

    #[test]
    fn update_keeps_unspecified_fields() {
        let db = Database::open_in_memory().unwrap();
        let recruiter = seed_user(&db, "r@x.com", Role::Recruiter);
        let job = db.create_job(&recruiter.id, &backend_engineer()).unwrap();

        let updated = db
            .update_job(
                &job.id,
                &JobChanges {
                    location: Some("Lisbon".into()),
                    time_period: Some(TimePeriod::PartTime),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(updated.location, "Lisbon");
        assert_eq!(updated.time_period, TimePeriod::PartTime);
        assert_eq!(updated.title, job.title);
        assert_eq!(updated.recruiter.id, recruiter.id);
        assert!(db.update_job("missing", &JobChanges::default()).unwrap().is_none());
    }

    #[test]
    fn salary_can_be_cleared() {
        let db = Database::open_in_memory().unwrap();
        let recruiter = seed_user(&db, "r@x.com", Role::Recruiter);
        let job = db
            .create_job(
                &recruiter.id,
                &NewJob {
                    salary: Some("90k".into()),
                    ..backend_engineer()
                },
            )
            .unwrap();

        let kept = db
            .update_job(&job.id, &JobChanges {
                title: Some("Platform Engineer".into()),
                ..Default::default()
            })
            .unwrap()
            .unwrap();
        assert_eq!(kept.salary.as_deref(), Some("90k"));

        let cleared = db
            .update_job(&job.id, &JobChanges {
                salary: Some(None),
                ..Default::default()
            })
            .unwrap()
            .unwrap();
        assert_eq!(cleared.salary, None);
    }

    #[test]
    fn search_matches_wildcards_literally() {
        let db = Database::open_in_memory().unwrap();
        let recruiter = seed_user(&db, "r@x.com", Role::Recruiter);
        db.create_job(&recruiter.id, &backend_engineer()).unwrap();
        db.create_job(
            &recruiter.id,
            &NewJob {
                title: "Support_Engineer".into(),
                description: "100% remote".into(),
                ..backend_engineer()
            },
        )
        .unwrap();

        let search = |term: &str| {
            db.list_jobs(&JobFilter {
                search: Some(term.into()),
                ..Default::default()
            })
            .unwrap()
        };

        assert_eq!(search("100%").len(), 1);
        assert_eq!(search("%").len(), 1);
        assert_eq!(search("t_E").len(), 1);
        assert_eq!(search("d_E").len(), 0);
    }

    #[test]
    fn delete_reports_missing_job() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.delete_job("missing").unwrap(), None);

        let recruiter = seed_user(&db, "r@x.com", Role::Recruiter);
        let job = db.create_job(&recruiter.id, &backend_engineer()).unwrap();
        assert_eq!(db.delete_job(&job.id).unwrap(), Some(0));
        assert!(db.job_by_id(&job.id).unwrap().is_none());
    }
}
