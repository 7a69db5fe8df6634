//! SQLite-backed run store — runs and step checkpoints survive restarts.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use signalist_core::error::{Result, SignalistError};

use crate::run::{RunStatus, StepRecord, Trigger, WorkflowRun};
use crate::store::RunStore;

/// SQLite persistence for workflow runs.
pub struct SqliteRunStore {
    conn: Mutex<rusqlite::Connection>,
}

fn db_err(context: &str) -> impl Fn(rusqlite::Error) -> SignalistError + '_ {
    move |e| SignalistError::Store(format!("{context}: {e}"))
}

fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| SignalistError::Store(format!("Bad timestamp '{s}': {e}")))
}

impl SqliteRunStore {
    /// Open or create the runs database.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = rusqlite::Connection::open(path).map_err(db_err("DB open"))?;
        Self::with_connection(conn)
    }

    /// Private in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory().map_err(db_err("DB open"))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: rusqlite::Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    fn conn(&self) -> MutexGuard<'_, rusqlite::Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run migrations to create tables.
    fn migrate(&self) -> Result<()> {
        self.conn()
            .execute_batch(
                "
            PRAGMA foreign_keys = ON;

            -- One row per workflow execution
            CREATE TABLE IF NOT EXISTS workflow_runs (
                id TEXT PRIMARY KEY,
                workflow_id TEXT NOT NULL,
                trigger_data TEXT NOT NULL,      -- JSON Trigger
                status TEXT NOT NULL DEFAULT 'pending',
                attempts INTEGER NOT NULL DEFAULT 0,
                error TEXT,
                output TEXT,                     -- JSON terminal output
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Append-only step checkpoints
            CREATE TABLE IF NOT EXISTS step_results (
                run_id TEXT NOT NULL,
                seq INTEGER NOT NULL,
                name TEXT NOT NULL,
                output TEXT NOT NULL,            -- JSON step output
                completed_at TEXT NOT NULL,
                PRIMARY KEY (run_id, name),
                FOREIGN KEY (run_id) REFERENCES workflow_runs(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_runs_created ON workflow_runs(created_at);
         ",
            )
            .map_err(db_err("Migration"))
    }

    fn load_steps(conn: &rusqlite::Connection, run_id: &str) -> Result<Vec<StepRecord>> {
        let mut stmt = conn
            .prepare(
                "SELECT name, output, completed_at FROM step_results
                 WHERE run_id = ?1 ORDER BY seq",
            )
            .map_err(db_err("Load steps"))?;
        let rows = stmt
            .query_map([run_id], |row| {
                let name: String = row.get(0)?;
                let output: String = row.get(1)?;
                let completed_at: String = row.get(2)?;
                Ok((name, output, completed_at))
            })
            .map_err(db_err("Load steps"))?;

        let mut steps = Vec::new();
        for row in rows {
            let (name, output, completed_at) = row.map_err(db_err("Load steps"))?;
            steps.push(StepRecord {
                name,
                output: serde_json::from_str(&output)?,
                completed_at: parse_time(&completed_at)?,
            });
        }
        Ok(steps)
    }

    fn row_to_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRow> {
        Ok(RunRow {
            id: row.get(0)?,
            workflow_id: row.get(1)?,
            trigger_data: row.get(2)?,
            status: row.get(3)?,
            attempts: row.get(4)?,
            error: row.get(5)?,
            output: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn hydrate(conn: &rusqlite::Connection, row: RunRow) -> Result<WorkflowRun> {
        let trigger: Trigger = serde_json::from_str(&row.trigger_data)?;
        let output = match row.output {
            Some(s) => Some(serde_json::from_str(&s)?),
            None => None,
        };
        Ok(WorkflowRun {
            steps: Self::load_steps(conn, &row.id)?,
            id: row.id,
            workflow_id: row.workflow_id,
            trigger,
            status: RunStatus::parse(&row.status)?,
            attempts: row.attempts,
            error: row.error,
            output,
            created_at: parse_time(&row.created_at)?,
            updated_at: parse_time(&row.updated_at)?,
        })
    }
}

struct RunRow {
    id: String,
    workflow_id: String,
    trigger_data: String,
    status: String,
    attempts: u32,
    error: Option<String>,
    output: Option<String>,
    created_at: String,
    updated_at: String,
}

const RUN_COLUMNS: &str =
    "id, workflow_id, trigger_data, status, attempts, error, output, created_at, updated_at";

impl RunStore for SqliteRunStore {
    fn create_run(&self, run: &WorkflowRun) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO workflow_runs
             (id, workflow_id, trigger_data, status, attempts, error, output, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            rusqlite::params![
                run.id,
                run.workflow_id,
                serde_json::to_string(&run.trigger)?,
                run.status.as_str(),
                run.attempts,
                run.error,
                run.output.as_ref().map(|v| v.to_string()),
                run.created_at.to_rfc3339(),
                run.updated_at.to_rfc3339(),
            ],
        )
        .map_err(db_err("Create run"))?;

        for step in &run.steps {
            insert_step(&conn, &run.id, step)?;
        }
        Ok(())
    }

    fn load_run(&self, run_id: &str) -> Result<Option<WorkflowRun>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                &format!("SELECT {RUN_COLUMNS} FROM workflow_runs WHERE id = ?1"),
                [run_id],
                Self::row_to_run,
            )
            .optional()
            .map_err(db_err("Load run"))?;
        match row {
            Some(row) => Ok(Some(Self::hydrate(&conn, row)?)),
            None => Ok(None),
        }
    }

    fn record_step(&self, run_id: &str, record: &StepRecord) -> Result<()> {
        let conn = self.conn();
        let exists: bool = conn
            .query_row(
                "SELECT COUNT(*) FROM workflow_runs WHERE id = ?1",
                [run_id],
                |row| row.get::<_, i64>(0),
            )
            .map_err(db_err("Record step"))?
            > 0;
        if !exists {
            return Err(SignalistError::RunNotFound(run_id.to_string()));
        }
        insert_step(&conn, run_id, record)?;
        conn.execute(
            "UPDATE workflow_runs SET updated_at = ?2 WHERE id = ?1",
            rusqlite::params![run_id, Utc::now().to_rfc3339()],
        )
        .map_err(db_err("Record step"))?;
        Ok(())
    }

    fn update_run(
        &self,
        run_id: &str,
        status: RunStatus,
        attempts: u32,
        output: Option<&serde_json::Value>,
        error: Option<&str>,
    ) -> Result<()> {
        let changed = self
            .conn()
            .execute(
                "UPDATE workflow_runs
                 SET status = ?2, attempts = ?3, output = ?4, error = ?5, updated_at = ?6
                 WHERE id = ?1",
                rusqlite::params![
                    run_id,
                    status.as_str(),
                    attempts,
                    output.map(|v| v.to_string()),
                    error,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(db_err("Update run"))?;
        if changed == 0 {
            return Err(SignalistError::RunNotFound(run_id.to_string()));
        }
        Ok(())
    }

    fn list_runs(&self, limit: usize) -> Result<Vec<WorkflowRun>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {RUN_COLUMNS} FROM workflow_runs ORDER BY created_at DESC LIMIT ?1"
            ))
            .map_err(db_err("List runs"))?;
        let rows: Vec<RunRow> = stmt
            .query_map([limit as i64], Self::row_to_run)
            .map_err(db_err("List runs"))?
            .collect::<rusqlite::Result<_>>()
            .map_err(db_err("List runs"))?;

        rows.into_iter()
            .map(|row| Self::hydrate(&conn, row))
            .collect()
    }
}

/// Insert one step checkpoint, keeping completion order in `seq`.
fn insert_step(conn: &rusqlite::Connection, run_id: &str, record: &StepRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO step_results (run_id, seq, name, output, completed_at)
         VALUES (?1, (SELECT COUNT(*) FROM step_results WHERE run_id = ?1), ?2, ?3, ?4)",
        rusqlite::params![
            run_id,
            record.name,
            record.output.to_string(),
            record.completed_at.to_rfc3339(),
        ],
    )
    .map_err(|e| {
        SignalistError::Store(format!(
            "Record step '{}' for run {run_id}: {e}",
            record.name
        ))
    })?;
    Ok(())
}
