//! SQLite-backed tracker store: companies, job leads, and applications.

mod records;
mod schema;

pub use records::{
    JobStatus, NewApplication, NewJob, Priority, RemoteType, SentFollowUp, StatusSummary,
};

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use tracing::{debug, warn};

use crate::timestamps::{format_timestamp, parse_timestamp};
use crate::workflows::followup::{
    ApplicationId, ApplicationSnapshot, ApplicationStatus, FollowUpMessage, FollowUpRepository,
    RepositoryError, TransitionError,
};

const SNAPSHOT_SELECT: &str = "SELECT a.id, a.status, a.applied_date, a.response_received,
        a.followup_sent, c.followup_override_days, c.name, j.title
     FROM applications a
     LEFT JOIN jobs j ON j.id = a.job_id
     LEFT JOIN companies c ON c.id = j.company_id";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("store connection mutex poisoned")]
    LockPoisoned,
    #[error("{entity} '{key}' not found")]
    NotFound { entity: &'static str, key: String },
    #[error("{entity} '{key}' already exists")]
    Duplicate { entity: &'static str, key: String },
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("invalid value: {0}")]
    Invalid(String),
}

impl StoreError {
    fn application_not_found(id: ApplicationId) -> Self {
        StoreError::NotFound {
            entity: "application",
            key: id.0.to_string(),
        }
    }
}

impl From<StoreError> for RepositoryError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Transition(err) => err.into(),
            StoreError::NotFound {
                entity: "application",
                key,
            } => match key.parse::<i64>() {
                Ok(id) => RepositoryError::NotFound(ApplicationId(id)),
                Err(_) => RepositoryError::Unavailable(format!("application '{key}' not found")),
            },
            other => RepositoryError::Unavailable(other.to_string()),
        }
    }
}

/// Cloneable handle over one SQLite connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(Self::from_connection(conn))
    }

    pub fn memory() -> Result<Self, StoreError> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    pub fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        schema::init(&conn)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Returns the id of the company with this name, creating it when missing.
    pub fn upsert_company(&self, name: &str, industry: Option<&str>) -> Result<i64, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Invalid("company name is empty".to_string()));
        }

        let conn = self.lock()?;
        let existing = conn
            .query_row(
                "SELECT id FROM companies WHERE name = ?1",
                params![name],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        if let Some(id) = existing {
            if let Some(industry) = industry {
                conn.execute(
                    "UPDATE companies SET industry = COALESCE(industry, ?2) WHERE id = ?1",
                    params![id, industry],
                )?;
            }
            return Ok(id);
        }

        conn.execute(
            "INSERT INTO companies (name, industry) VALUES (?1, ?2)",
            params![name, industry],
        )?;
        let id = conn.last_insert_rowid();
        debug!(company_id = id, name, "created company");
        Ok(id)
    }

    /// Sets or clears the per-company follow-up wait. Values are stored as given;
    /// the evaluator reports non-positive overrides.
    pub fn set_company_override(&self, name: &str, days: Option<i64>) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE companies SET followup_override_days = ?2 WHERE name = ?1",
            params![name.trim(), days],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound {
                entity: "company",
                key: name.trim().to_string(),
            });
        }
        Ok(())
    }

    pub fn insert_job(&self, job: &NewJob) -> Result<i64, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO jobs (company_id, title, url, location, remote_type, salary_min,
                salary_max, job_type, employment_type, status, priority, skills_match, source,
                notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                job.company_id,
                job.title,
                job.url,
                job.location,
                job.remote_type.as_str(),
                job.salary_min,
                job.salary_max,
                job.job_type,
                job.employment_type,
                job.status.as_str(),
                job.priority.as_str(),
                job.skills_match,
                job.source,
                job.notes,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Each job carries at most one application.
    pub fn insert_application(&self, application: &NewApplication) -> Result<i64, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO applications (job_id, status, applied_date, notes)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                application.job_id,
                application.status.label(),
                application.applied_at.map(format_timestamp),
                application.notes,
            ],
        )
        .map_err(|err| duplicate_or(err, "application for job", application.job_id))?;
        Ok(conn.last_insert_rowid())
    }

    /// Moving to `APPLIED` stamps `applied_date` when it has not been set yet.
    pub fn update_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
        at: NaiveDateTime,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE applications
             SET status = ?2,
                 applied_date = CASE
                     WHEN ?2 = 'APPLIED' AND applied_date IS NULL THEN ?3
                     ELSE applied_date
                 END
             WHERE id = ?1",
            params![id.0, status.label(), format_timestamp(at)],
        )?;
        if updated == 0 {
            return Err(StoreError::application_not_found(id));
        }
        Ok(())
    }

    pub fn followup_snapshot(&self) -> Result<Vec<ApplicationSnapshot>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("{SNAPSHOT_SELECT} ORDER BY a.id"))?;
        let rows = stmt.query_map([], read_snapshot)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn fetch_snapshot(
        &self,
        id: ApplicationId,
    ) -> Result<Option<ApplicationSnapshot>, StoreError> {
        let conn = self.lock()?;
        let snapshot = conn
            .query_row(
                &format!("{SNAPSHOT_SELECT} WHERE a.id = ?1"),
                params![id.0],
                read_snapshot,
            )
            .optional()?;
        Ok(snapshot)
    }

    /// Compare-and-set on `followup_sent`; a second writer observes the conflict.
    ///
    /// Only `APPLIED` and `READY` rows can be marked. A delivered `message` is written to
    /// `follow_ups` in the same transaction.
    pub fn mark_followup_sent(
        &self,
        id: ApplicationId,
        at: NaiveDateTime,
        message: Option<&FollowUpMessage>,
    ) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let stamp = format_timestamp(at);
        let updated = tx.execute(
            "UPDATE applications
             SET followup_sent = 1,
                 follow_ups_sent = follow_ups_sent + 1,
                 last_follow_up = ?2
             WHERE id = ?1 AND followup_sent = 0 AND response_received = 0
               AND status IN ('APPLIED', 'READY')",
            params![id.0, stamp],
        )?;

        if updated == 1 {
            if let Some(message) = message {
                tx.execute(
                    "INSERT INTO follow_ups (application_id, scheduled_date, channel, recipient,
                        subject, message, sent, sent_date)
                     VALUES (?1, ?2, 'email', ?3, ?4, ?5, 1, ?2)",
                    params![id.0, stamp, message.recipient, message.subject, message.body],
                )?;
            }
            tx.commit()?;
            return Ok(());
        }

        let snapshot = tx
            .query_row(
                &format!("{SNAPSHOT_SELECT} WHERE a.id = ?1"),
                params![id.0],
                read_snapshot,
            )
            .optional()?;
        match snapshot {
            None => Err(StoreError::application_not_found(id)),
            Some(snapshot) => match snapshot.check_followup_mark() {
                Err(err) => Err(err.into()),
                Ok(()) => Err(TransitionError::AlreadyFollowedUp(id).into()),
            },
        }
    }

    /// Sets the response flag; the first recorded response date is kept.
    pub fn record_response(&self, id: ApplicationId, at: NaiveDateTime) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE applications
             SET response_received = 1,
                 response_date = COALESCE(response_date, ?2)
             WHERE id = ?1",
            params![id.0, format_timestamp(at)],
        )?;
        if updated == 0 {
            return Err(StoreError::application_not_found(id));
        }
        Ok(())
    }

    pub fn follow_ups_sent(&self, id: ApplicationId) -> Result<i64, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT follow_ups_sent FROM applications WHERE id = ?1",
            params![id.0],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .ok_or_else(|| StoreError::application_not_found(id))
    }

    /// Stored follow-up messages for one application, oldest first.
    pub fn follow_up_history(&self, id: ApplicationId) -> Result<Vec<SentFollowUp>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, application_id, channel, recipient, subject, message, sent_date
             FROM follow_ups
             WHERE application_id = ?1
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![id.0], |row| {
            let sent_raw: Option<String> = row.get(6)?;
            Ok(SentFollowUp {
                id: row.get(0)?,
                application_id: row.get(1)?,
                channel: row.get(2)?,
                recipient: row.get(3)?,
                subject: row.get(4)?,
                message: row.get(5)?,
                sent_at: sent_raw.and_then(|raw| parse_timestamp(&raw).ok()),
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn status_summary(&self) -> Result<StatusSummary, StoreError> {
        let conn = self.lock()?;
        let mut summary = StatusSummary::default();
        for (table, target) in [
            ("applications", &mut summary.applications),
            ("jobs", &mut summary.jobs),
        ] {
            let mut stmt =
                conn.prepare(&format!("SELECT status, COUNT(*) FROM {table} GROUP BY status"))?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (status, count) = row?;
                target.insert(status, count);
            }
        }
        Ok(summary)
    }
}

fn read_snapshot(row: &Row<'_>) -> rusqlite::Result<ApplicationSnapshot> {
    let id = ApplicationId(row.get(0)?);
    let applied_raw: Option<String> = row.get(2)?;
    let applied_at = applied_raw.and_then(|raw| match parse_timestamp(&raw) {
        Ok(value) => Some(value),
        Err(reason) => {
            warn!(application_id = id.0, raw = %raw, %reason, "unreadable applied_date");
            None
        }
    });

    Ok(ApplicationSnapshot {
        id,
        status: row.get(1)?,
        applied_at,
        response_received: row.get(3)?,
        followup_sent: row.get(4)?,
        followup_override_days: row.get(5)?,
        company_name: row.get(6)?,
        job_title: row.get(7)?,
    })
}

fn duplicate_or(err: rusqlite::Error, entity: &'static str, key: i64) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
                && failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            StoreError::Duplicate {
                entity,
                key: key.to_string(),
            }
        }
        _ => StoreError::Sqlite(err),
    }
}

impl FollowUpRepository for SqliteStore {
    fn snapshot(&self) -> Result<Vec<ApplicationSnapshot>, RepositoryError> {
        Ok(self.followup_snapshot()?)
    }

    fn fetch(&self, id: ApplicationId) -> Result<Option<ApplicationSnapshot>, RepositoryError> {
        Ok(self.fetch_snapshot(id)?)
    }

    fn mark_followup_sent(
        &self,
        id: ApplicationId,
        at: NaiveDateTime,
        message: Option<&FollowUpMessage>,
    ) -> Result<(), RepositoryError> {
        Ok(SqliteStore::mark_followup_sent(self, id, at, message)?)
    }

    fn record_response(&self, id: ApplicationId, at: NaiveDateTime) -> Result<(), RepositoryError> {
        Ok(SqliteStore::record_response(self, id, at)?)
    }
}
