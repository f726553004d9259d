use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{
    CreateTranslationJob, TranslationError, TranslationFilter, TranslationJob, TranslationStatus,
    TranslationStore,
};

const TRANSLATION_COLUMNS: &str = "id, project_id, source_draft_id, target_language, status, \
     progress, provider, preserve_formatting, error, result_draft_id, \
     created_at, started_at, completed_at, degraded_units";

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS translation_jobs (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    source_draft_id TEXT NOT NULL,
    target_language TEXT NOT NULL,
    status TEXT NOT NULL,
    progress INTEGER NOT NULL DEFAULT 0,
    provider TEXT,
    preserve_formatting INTEGER NOT NULL DEFAULT 1,
    error TEXT,
    result_draft_id TEXT,
    created_at TEXT NOT NULL,
    started_at TEXT,
    completed_at TEXT,
    degraded_units INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_translation_jobs_project_id ON translation_jobs(project_id);
CREATE INDEX IF NOT EXISTS idx_translation_jobs_status ON translation_jobs(status);
CREATE INDEX IF NOT EXISTS idx_translation_jobs_source ON translation_jobs(source_draft_id, target_language);
"#;

/// SQLite-backed translation job store
pub struct SqliteTranslationStore {
    conn: Mutex<Connection>,
}

impl SqliteTranslationStore {
    pub fn new(path: &Path) -> Result<Self, TranslationError> {
        let conn =
            Connection::open(path).map_err(|e| TranslationError::Database(e.to_string()))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| TranslationError::Database(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests
    pub fn in_memory() -> Result<Self, TranslationError> {
        let conn =
            Connection::open_in_memory().map_err(|e| TranslationError::Database(e.to_string()))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| TranslationError::Database(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn row_to_job(row: &rusqlite::Row) -> Result<TranslationJob, rusqlite::Error> {
        let parse_ts = |idx: usize, value: Option<String>| -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
            value
                .map(|s| {
                    DateTime::parse_from_rfc3339(&s)
                        .map(|dt| dt.with_timezone(&Utc))
                        .map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(
                                idx,
                                rusqlite::types::Type::Text,
                                Box::new(e),
                            )
                        })
                })
                .transpose()
        };

        let status_str: String = row.get(4)?;
        let status = TranslationStatus::parse_str(&status_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                format!("unknown translation status: {}", status_str).into(),
            )
        })?;

        let created_at: String = row.get(10)?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    10,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

        Ok(TranslationJob {
            id: row.get(0)?,
            project_id: row.get(1)?,
            source_draft_id: row.get(2)?,
            target_language: row.get(3)?,
            status,
            progress: row.get::<_, i64>(5)? as u8,
            provider: row.get(6)?,
            preserve_formatting: row.get::<_, i64>(7)? != 0,
            error: row.get(8)?,
            result_draft_id: row.get(9)?,
            created_at,
            started_at: parse_ts(11, row.get(11)?)?,
            completed_at: parse_ts(12, row.get(12)?)?,
            degraded_units: row.get::<_, i64>(13)? as u32,
        })
    }

    fn get_locked(
        conn: &MutexGuard<'_, Connection>,
        id: &str,
    ) -> Result<Option<TranslationJob>, TranslationError> {
        let sql = format!(
            "SELECT {} FROM translation_jobs WHERE id = ?",
            TRANSLATION_COLUMNS
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| TranslationError::Database(e.to_string()))?;

        let mut rows = stmt
            .query_map(params![id], Self::row_to_job)
            .map_err(|e| TranslationError::Database(e.to_string()))?;

        match rows.next() {
            Some(row) => Ok(Some(
                row.map_err(|e| TranslationError::Database(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    fn require_locked(
        conn: &MutexGuard<'_, Connection>,
        id: &str,
    ) -> Result<TranslationJob, TranslationError> {
        Self::get_locked(conn, id)?.ok_or_else(|| TranslationError::JobNotFound(id.to_string()))
    }

    fn build_where_clause(filter: &TranslationFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref project_id) = filter.project_id {
            conditions.push("project_id = ?");
            params.push(Box::new(project_id.clone()));
        }

        if let Some(ref source_draft_id) = filter.source_draft_id {
            conditions.push("source_draft_id = ?");
            params.push(Box::new(source_draft_id.clone()));
        }

        if let Some(status) = filter.status {
            conditions.push("status = ?");
            params.push(Box::new(status.as_str().to_string()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }
}

impl TranslationStore for SqliteTranslationStore {
    fn create(&self, request: CreateTranslationJob) -> Result<TranslationJob, TranslationError> {
        let conn = self.conn.lock().unwrap();

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO translation_jobs (id, project_id, source_draft_id, target_language, status, progress, provider, preserve_formatting, created_at) \
             VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?)",
            params![
                id,
                request.project_id,
                request.source_draft_id,
                request.target_language,
                TranslationStatus::Pending.as_str(),
                request.provider,
                request.preserve_formatting as i64,
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| TranslationError::Database(e.to_string()))?;

        Self::require_locked(&conn, &id)
    }

    fn get(&self, id: &str) -> Result<Option<TranslationJob>, TranslationError> {
        let conn = self.conn.lock().unwrap();
        Self::get_locked(&conn, id)
    }

    fn list(&self, filter: &TranslationFilter) -> Result<Vec<TranslationJob>, TranslationError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!(
            "SELECT {} FROM translation_jobs {} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            TRANSLATION_COLUMNS, where_clause
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| TranslationError::Database(e.to_string()))?;

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));

        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_job)
            .map_err(|e| TranslationError::Database(e.to_string()))?;

        let mut jobs = Vec::new();
        for row in rows {
            jobs.push(row.map_err(|e| TranslationError::Database(e.to_string()))?);
        }

        Ok(jobs)
    }

    fn count(&self, filter: &TranslationFilter) -> Result<i64, TranslationError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM translation_jobs {}", where_clause);

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(|e| TranslationError::Database(e.to_string()))
    }

    fn has_active(
        &self,
        project_id: &str,
        source_draft_id: &str,
        target_language: &str,
    ) -> Result<bool, TranslationError> {
        let conn = self.conn.lock().unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM translation_jobs \
                 WHERE project_id = ? AND source_draft_id = ? AND target_language = ? \
                 AND status IN ('pending', 'running')",
                params![project_id, source_draft_id, target_language],
                |row| row.get(0),
            )
            .map_err(|e| TranslationError::Database(e.to_string()))?;

        Ok(count > 0)
    }

    fn mark_running(&self, id: &str) -> Result<TranslationJob, TranslationError> {
        let conn = self.conn.lock().unwrap();

        let job = Self::require_locked(&conn, id)?;
        if job.status != TranslationStatus::Pending {
            return Err(TranslationError::InvalidState {
                job_id: id.to_string(),
                status: job.status,
                operation: "start",
            });
        }

        conn.execute(
            "UPDATE translation_jobs SET status = 'running', started_at = ? WHERE id = ?",
            params![Utc::now().to_rfc3339(), id],
        )
        .map_err(|e| TranslationError::Database(e.to_string()))?;

        Self::require_locked(&conn, id)
    }

    fn set_progress(&self, id: &str, progress: u8) -> Result<TranslationJob, TranslationError> {
        let conn = self.conn.lock().unwrap();

        let job = Self::require_locked(&conn, id)?;
        if job.status != TranslationStatus::Running {
            return Err(TranslationError::InvalidState {
                job_id: id.to_string(),
                status: job.status,
                operation: "set progress",
            });
        }

        conn.execute(
            "UPDATE translation_jobs SET progress = ? WHERE id = ?",
            params![progress.min(100) as i64, id],
        )
        .map_err(|e| TranslationError::Database(e.to_string()))?;

        Self::require_locked(&conn, id)
    }

    fn complete(
        &self,
        id: &str,
        result_draft_id: &str,
        degraded_units: u32,
    ) -> Result<TranslationJob, TranslationError> {
        let conn = self.conn.lock().unwrap();

        let job = Self::require_locked(&conn, id)?;
        if job.status != TranslationStatus::Running {
            return Err(TranslationError::InvalidState {
                job_id: id.to_string(),
                status: job.status,
                operation: "complete",
            });
        }

        conn.execute(
            "UPDATE translation_jobs SET status = 'completed', progress = 100, result_draft_id = ?, degraded_units = ?, completed_at = ? WHERE id = ?",
            params![result_draft_id, degraded_units as i64, Utc::now().to_rfc3339(), id],
        )
        .map_err(|e| TranslationError::Database(e.to_string()))?;

        Self::require_locked(&conn, id)
    }

    fn fail(&self, id: &str, error: &str) -> Result<TranslationJob, TranslationError> {
        let conn = self.conn.lock().unwrap();

        let job = Self::require_locked(&conn, id)?;
        if job.status != TranslationStatus::Running {
            return Err(TranslationError::InvalidState {
                job_id: id.to_string(),
                status: job.status,
                operation: "fail",
            });
        }

        conn.execute(
            "UPDATE translation_jobs SET status = 'failed', error = ?, completed_at = ? WHERE id = ?",
            params![error, Utc::now().to_rfc3339(), id],
        )
        .map_err(|e| TranslationError::Database(e.to_string()))?;

        Self::require_locked(&conn, id)
    }

    fn cancel(&self, id: &str) -> Result<TranslationJob, TranslationError> {
        let conn = self.conn.lock().unwrap();

        let job = Self::require_locked(&conn, id)?;
        if !job.status.can_cancel() {
            return Err(TranslationError::InvalidState {
                job_id: id.to_string(),
                status: job.status,
                operation: "cancel",
            });
        }

        conn.execute(
            "UPDATE translation_jobs SET status = 'cancelled', completed_at = ? WHERE id = ?",
            params![Utc::now().to_rfc3339(), id],
        )
        .map_err(|e| TranslationError::Database(e.to_string()))?;

        Self::require_locked(&conn, id)
    }

    fn delete(&self, id: &str) -> Result<TranslationJob, TranslationError> {
        let conn = self.conn.lock().unwrap();

        let job = Self::require_locked(&conn, id)?;
        if job.status == TranslationStatus::Running {
            return Err(TranslationError::InvalidState {
                job_id: id.to_string(),
                status: job.status,
                operation: "delete",
            });
        }

        conn.execute("DELETE FROM translation_jobs WHERE id = ?", params![id])
            .map_err(|e| TranslationError::Database(e.to_string()))?;

        Ok(job)
    }

    fn delete_by_project(&self, project_id: &str) -> Result<usize, TranslationError> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "DELETE FROM translation_jobs WHERE project_id = ?",
            params![project_id],
        )
        .map_err(|e| TranslationError::Database(e.to_string()))
    }
}
