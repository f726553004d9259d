//! SQLite-backed task store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{
    CreateTaskRequest, StageKind, StageResult, Task, TaskError, TaskFilter, TaskStatus, TaskStore,
    DEFAULT_MAX_RETRIES,
};

const TASK_COLUMNS: &str = "id, project_id, stage, status, progress, message, created_at, \
     started_at, completed_at, error, result, retry_count, max_retries, last_heartbeat, checkpoint";

/// SQLite-backed task store.
pub struct SqliteTaskStore {
    conn: Mutex<Connection>,
}

impl SqliteTaskStore {
    /// Create a new SQLite task store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, TaskError> {
        let conn = Connection::open(path).map_err(|e| TaskError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite task store (useful for testing).
    pub fn in_memory() -> Result<Self, TaskError> {
        let conn = Connection::open_in_memory().map_err(|e| TaskError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), TaskError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL,
                stage TEXT NOT NULL,
                status TEXT NOT NULL,
                progress INTEGER NOT NULL DEFAULT 0,
                message TEXT,
                created_at TEXT NOT NULL,
                started_at TEXT,
                completed_at TEXT,
                error TEXT,
                result TEXT,
                retry_count INTEGER NOT NULL DEFAULT 0,
                max_retries INTEGER NOT NULL DEFAULT 3,
                last_heartbeat TEXT,
                checkpoint TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_project_id ON tasks(project_id);
            CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
            CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks(created_at);
            "#,
        )
        .map_err(|e| TaskError::Database(e.to_string()))?;

        // Migration: add checkpoint column if it doesn't exist
        let _ = conn.execute("ALTER TABLE tasks ADD COLUMN checkpoint TEXT", []);

        Ok(())
    }

    fn build_where_clause(filter: &TaskFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref project_id) = filter.project_id {
            conditions.push("project_id = ?");
            params.push(Box::new(project_id.clone()));
        }

        if let Some(status) = filter.status {
            conditions.push("status = ?");
            params.push(Box::new(status.as_str()));
        }

        if let Some(stage) = filter.stage {
            conditions.push("stage = ?");
            params.push(Box::new(stage.as_str()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
        let id: String = row.get(0)?;
        let project_id: String = row.get(1)?;
        let stage_str: String = row.get(2)?;
        let status_str: String = row.get(3)?;
        let progress: u8 = row.get(4)?;
        let message: Option<String> = row.get(5)?;
        let created_at_str: String = row.get(6)?;
        let started_at_str: Option<String> = row.get(7)?;
        let completed_at_str: Option<String> = row.get(8)?;
        let error: Option<String> = row.get(9)?;
        let result_json: Option<String> = row.get(10)?;
        let retry_count: u32 = row.get(11)?;
        let max_retries: u32 = row.get(12)?;
        let last_heartbeat_str: Option<String> = row.get(13)?;
        let checkpoint_json: Option<String> = row.get(14)?;

        let stage = StageKind::parse_str(&stage_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                format!("unknown stage: {}", stage_str).into(),
            )
        })?;
        let status = TaskStatus::parse_str(&status_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("unknown status: {}", status_str).into(),
            )
        })?;

        let parse_ts = |s: &str| {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now())
        };

        let created_at = parse_ts(&created_at_str);
        let started_at = started_at_str.as_deref().map(parse_ts);
        let completed_at = completed_at_str.as_deref().map(parse_ts);
        let last_heartbeat = last_heartbeat_str.as_deref().map(parse_ts);

        let result: Option<StageResult> =
            result_json.and_then(|json| serde_json::from_str(&json).ok());
        let checkpoint: Option<serde_json::Value> =
            checkpoint_json.and_then(|json| serde_json::from_str(&json).ok());

        Ok(Task {
            id,
            project_id,
            stage,
            status,
            progress,
            message,
            created_at,
            started_at,
            completed_at,
            error,
            result,
            retry_count,
            max_retries,
            last_heartbeat,
            checkpoint,
        })
    }

    fn get_locked(conn: &Connection, id: &str) -> Result<Task, TaskError> {
        let sql = format!("SELECT {} FROM tasks WHERE id = ?", TASK_COLUMNS);
        match conn.query_row(&sql, params![id], Self::row_to_task) {
            Ok(task) => Ok(task),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(TaskError::NotFound(id.to_string())),
            Err(e) => Err(TaskError::Database(e.to_string())),
        }
    }
}

impl TaskStore for SqliteTaskStore {
    fn create(&self, request: CreateTaskRequest) -> Result<Task, TaskError> {
        let conn = self.conn.lock().unwrap();

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let max_retries = request.max_retries.unwrap_or(DEFAULT_MAX_RETRIES);

        conn.execute(
            "INSERT INTO tasks (id, project_id, stage, status, progress, created_at, retry_count, max_retries) \
             VALUES (?, ?, ?, ?, 0, ?, 0, ?)",
            params![
                id,
                request.project_id,
                request.stage.as_str(),
                TaskStatus::Pending.as_str(),
                now.to_rfc3339(),
                max_retries,
            ],
        )
        .map_err(|e| TaskError::Database(e.to_string()))?;

        Ok(Task {
            id,
            project_id: request.project_id,
            stage: request.stage,
            status: TaskStatus::Pending,
            progress: 0,
            message: None,
            created_at: now,
            started_at: None,
            completed_at: None,
            error: None,
            result: None,
            retry_count: 0,
            max_retries,
            last_heartbeat: None,
            checkpoint: None,
        })
    }

    fn get(&self, id: &str) -> Result<Option<Task>, TaskError> {
        let conn = self.conn.lock().unwrap();

        match Self::get_locked(&conn, id) {
            Ok(task) => Ok(Some(task)),
            Err(TaskError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, TaskError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!(
            "SELECT {} FROM tasks {} ORDER BY created_at DESC LIMIT ? OFFSET ?",
            TASK_COLUMNS, where_clause
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| TaskError::Database(e.to_string()))?;

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));

        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_task)
            .map_err(|e| TaskError::Database(e.to_string()))?;

        let mut tasks = Vec::new();
        for row_result in rows {
            let task = row_result.map_err(|e| TaskError::Database(e.to_string()))?;
            tasks.push(task);
        }

        Ok(tasks)
    }

    fn count(&self, filter: &TaskFilter) -> Result<i64, TaskError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!("SELECT COUNT(*) FROM tasks {}", where_clause);

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let count: i64 = conn
            .query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(|e| TaskError::Database(e.to_string()))?;

        Ok(count)
    }

    fn update_status(&self, id: &str, status: TaskStatus) -> Result<Task, TaskError> {
        let conn = self.conn.lock().unwrap();

        let current = Self::get_locked(&conn, id)?;

        if !current.status.can_transition_to(status) {
            return Err(TaskError::InvalidTransition {
                task_id: id.to_string(),
                from: current.status,
                to: status,
            });
        }

        let now = Utc::now();
        let started_at = if status == TaskStatus::Running {
            Some(now)
        } else {
            current.started_at
        };
        let completed_at = if status.is_terminal() {
            Some(now)
        } else {
            current.completed_at
        };
        // Entering running also primes the heartbeat so a crash right after
        // claiming is still detected by staleness, not by a null forever.
        let last_heartbeat = if status == TaskStatus::Running {
            Some(now)
        } else {
            current.last_heartbeat
        };

        conn.execute(
            "UPDATE tasks SET status = ?, started_at = ?, completed_at = ?, last_heartbeat = ? WHERE id = ?",
            params![
                status.as_str(),
                started_at.map(|t| t.to_rfc3339()),
                completed_at.map(|t| t.to_rfc3339()),
                last_heartbeat.map(|t| t.to_rfc3339()),
                id,
            ],
        )
        .map_err(|e| TaskError::Database(e.to_string()))?;

        Ok(Task {
            status,
            started_at,
            completed_at,
            last_heartbeat,
            ..current
        })
    }

    fn complete(&self, id: &str, result: StageResult) -> Result<Task, TaskError> {
        let conn = self.conn.lock().unwrap();

        let current = Self::get_locked(&conn, id)?;

        if !current.status.can_transition_to(TaskStatus::Completed) {
            return Err(TaskError::InvalidTransition {
                task_id: id.to_string(),
                from: current.status,
                to: TaskStatus::Completed,
            });
        }

        let now = Utc::now();
        let result_json =
            serde_json::to_string(&result).map_err(|e| TaskError::Database(e.to_string()))?;

        conn.execute(
            "UPDATE tasks SET status = ?, progress = 100, result = ?, completed_at = ? WHERE id = ?",
            params![
                TaskStatus::Completed.as_str(),
                result_json,
                now.to_rfc3339(),
                id,
            ],
        )
        .map_err(|e| TaskError::Database(e.to_string()))?;

        Ok(Task {
            status: TaskStatus::Completed,
            progress: 100,
            result: Some(result),
            completed_at: Some(now),
            ..current
        })
    }

    fn fail(&self, id: &str, error: &str) -> Result<Task, TaskError> {
        let conn = self.conn.lock().unwrap();

        let current = Self::get_locked(&conn, id)?;

        if !current.status.can_transition_to(TaskStatus::Failed) {
            return Err(TaskError::InvalidTransition {
                task_id: id.to_string(),
                from: current.status,
                to: TaskStatus::Failed,
            });
        }

        let now = Utc::now();

        conn.execute(
            "UPDATE tasks SET status = ?, error = ?, completed_at = ? WHERE id = ?",
            params![TaskStatus::Failed.as_str(), error, now.to_rfc3339(), id],
        )
        .map_err(|e| TaskError::Database(e.to_string()))?;

        Ok(Task {
            status: TaskStatus::Failed,
            error: Some(error.to_string()),
            completed_at: Some(now),
            ..current
        })
    }

    fn set_progress(
        &self,
        id: &str,
        progress: u8,
        message: Option<&str>,
    ) -> Result<(), TaskError> {
        let conn = self.conn.lock().unwrap();

        let progress = progress.min(100);
        let now = Utc::now();

        let changed = if let Some(message) = message {
            conn.execute(
                "UPDATE tasks SET progress = ?, message = ?, last_heartbeat = ? WHERE id = ?",
                params![progress, message, now.to_rfc3339(), id],
            )
        } else {
            conn.execute(
                "UPDATE tasks SET progress = ?, last_heartbeat = ? WHERE id = ?",
                params![progress, now.to_rfc3339(), id],
            )
        }
        .map_err(|e| TaskError::Database(e.to_string()))?;

        if changed == 0 {
            return Err(TaskError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn touch_heartbeat(&self, id: &str) -> Result<(), TaskError> {
        let conn = self.conn.lock().unwrap();

        // The heartbeat is a running-task liveness signal only.
        let changed = conn
            .execute(
                "UPDATE tasks SET last_heartbeat = ? WHERE id = ? AND status = ?",
                params![
                    Utc::now().to_rfc3339(),
                    id,
                    TaskStatus::Running.as_str()
                ],
            )
            .map_err(|e| TaskError::Database(e.to_string()))?;

        if changed == 0 {
            let current = Self::get_locked(&conn, id)?;
            return Err(TaskError::InvalidState {
                task_id: id.to_string(),
                status: current.status,
                operation: "heartbeat".to_string(),
            });
        }
        Ok(())
    }

    fn reset_for_retry(&self, id: &str) -> Result<Task, TaskError> {
        let conn = self.conn.lock().unwrap();

        let current = Self::get_locked(&conn, id)?;

        if !current.status.can_retry() {
            return Err(TaskError::InvalidState {
                task_id: id.to_string(),
                status: current.status,
                operation: "retry".to_string(),
            });
        }

        let retry_count = current.retry_count + 1;
        let message = format!("manual retry ({})", retry_count);

        conn.execute(
            "UPDATE tasks SET status = ?, progress = 0, message = ?, error = NULL, result = NULL, \
             started_at = NULL, completed_at = NULL, last_heartbeat = NULL, retry_count = ? \
             WHERE id = ?",
            params![TaskStatus::Pending.as_str(), message, retry_count, id],
        )
        .map_err(|e| TaskError::Database(e.to_string()))?;

        Ok(Task {
            status: TaskStatus::Pending,
            progress: 0,
            message: Some(message),
            error: None,
            result: None,
            started_at: None,
            completed_at: None,
            last_heartbeat: None,
            retry_count,
            ..current
        })
    }

    fn requeue_interrupted(&self, id: &str) -> Result<Task, TaskError> {
        let conn = self.conn.lock().unwrap();

        let current = Self::get_locked(&conn, id)?;

        if current.status != TaskStatus::Running {
            return Err(TaskError::InvalidState {
                task_id: id.to_string(),
                status: current.status,
                operation: "requeue".to_string(),
            });
        }

        let retry_count = current.retry_count + 1;
        let message = format!(
            "re-queued after interruption (retry {}/{})",
            retry_count, current.max_retries
        );

        conn.execute(
            "UPDATE tasks SET status = ?, progress = 0, message = ?, error = NULL, result = NULL, \
             started_at = NULL, completed_at = NULL, last_heartbeat = NULL, retry_count = ? \
             WHERE id = ?",
            params![TaskStatus::Pending.as_str(), message, retry_count, id],
        )
        .map_err(|e| TaskError::Database(e.to_string()))?;

        Ok(Task {
            status: TaskStatus::Pending,
            progress: 0,
            message: Some(message),
            error: None,
            result: None,
            started_at: None,
            completed_at: None,
            last_heartbeat: None,
            retry_count,
            ..current
        })
    }

    fn stale_running(&self, cutoff: DateTime<Utc>) -> Result<Vec<Task>, TaskError> {
        let conn = self.conn.lock().unwrap();

        let sql = format!(
            "SELECT {} FROM tasks WHERE status = ? AND (last_heartbeat IS NULL OR last_heartbeat < ?) \
             ORDER BY created_at ASC",
            TASK_COLUMNS
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| TaskError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(
                params![TaskStatus::Running.as_str(), cutoff.to_rfc3339()],
                Self::row_to_task,
            )
            .map_err(|e| TaskError::Database(e.to_string()))?;

        let mut tasks = Vec::new();
        for row_result in rows {
            let task = row_result.map_err(|e| TaskError::Database(e.to_string()))?;
            tasks.push(task);
        }

        Ok(tasks)
    }

    fn delete(&self, id: &str) -> Result<Task, TaskError> {
        let conn = self.conn.lock().unwrap();

        let task = Self::get_locked(&conn, id)?;

        if task.status == TaskStatus::Running {
            return Err(TaskError::InvalidState {
                task_id: id.to_string(),
                status: task.status,
                operation: "delete".to_string(),
            });
        }

        conn.execute("DELETE FROM tasks WHERE id = ?", params![id])
            .map_err(|e| TaskError::Database(e.to_string()))?;

        Ok(task)
    }

    fn delete_by_project(&self, project_id: &str) -> Result<usize, TaskError> {
        let conn = self.conn.lock().unwrap();

        conn.execute("DELETE FROM tasks WHERE project_id = ?", params![project_id])
            .map_err(|e| TaskError::Database(e.to_string()))
    }
}
