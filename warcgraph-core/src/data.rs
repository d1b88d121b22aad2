use crate::job::JobKind;
use crate::output::TableRow;
use rusqlite::{Connection, OptionalExtension, Result, params};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub struct Database {
    conn: Connection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "running" => Some(RunStatus::Running),
            "completed" => Some(RunStatus::Completed),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub id: String,
    pub kind: String,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub status: String,
    pub inputs: String,           // JSON array
    pub counters: Option<String>, // JSON object
}

fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

impl Database {
    /// Removes the database file along with its `-wal` and `-shm` files.
    pub fn drop(path: &Path) -> std::io::Result<()> {
        fs::remove_file(path)?;
        for suffix in ["-wal", "-shm"] {
            let mut sidecar = path.as_os_str().to_owned();
            sidecar.push(suffix);
            match fs::remove_file(&sidecar) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e),
                _ => {}
            }
        }
        Ok(())
    }

    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Bulk inserts from a single writer
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;  -- 64MB cache
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            ",
        )?;

        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            -- One row per job run
            CREATE TABLE IF NOT EXISTS runs (
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL CHECK(kind IN ('vertices', 'edges')),
    start_time INTEGER NOT NULL,
    end_time INTEGER,
    status TEXT NOT NULL CHECK(status IN ('running', 'completed', 'failed')),
    inputs TEXT NOT NULL,     -- JSON array of shard paths
    counters TEXT             -- JSON object, set on completion
);

CREATE TABLE IF NOT EXISTS vertices (
    run_id TEXT NOT NULL,
    id TEXT NOT NULL,
    url TEXT NOT NULL,
    PRIMARY KEY(run_id, id),
    FOREIGN KEY(run_id) REFERENCES runs(id) ON DELETE CASCADE
);

-- Parallel edges are kept, so no uniqueness here
CREATE TABLE IF NOT EXISTS edges (
    run_id TEXT NOT NULL,
    source_id TEXT NOT NULL,
    dest_id TEXT NOT NULL,
    FOREIGN KEY(run_id) REFERENCES runs(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(run_id, source_id);
CREATE INDEX IF NOT EXISTS idx_edges_dest ON edges(run_id, dest_id);
            ",
        )?;
        Ok(())
    }

    // Run management
    pub fn create_run(&self, kind: &str, inputs: &str, start_time: i64) -> Result<String> {
        let run_id = uuid::Uuid::new_v4().to_string();

        self.conn.execute(
            "INSERT INTO runs (id, kind, start_time, status, inputs) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &run_id,
                kind,
                start_time,
                RunStatus::Running.as_str(),
                inputs
            ],
        )?;

        Ok(run_id)
    }

    pub fn complete_run(&self, run_id: &str, counters: &str) -> Result<()> {
        let timestamp = current_timestamp();
        self.conn.execute(
            "UPDATE runs SET status = ?1, end_time = ?2, counters = ?3 WHERE id = ?4",
            params![RunStatus::Completed.as_str(), timestamp, counters, run_id],
        )?;
        Ok(())
    }

    pub fn fail_run(&self, run_id: &str) -> Result<()> {
        let timestamp = current_timestamp();
        self.conn.execute(
            "UPDATE runs SET status = ?1, end_time = ?2 WHERE id = ?3",
            params![RunStatus::Failed.as_str(), timestamp, run_id],
        )?;
        Ok(())
    }

    pub fn get_run(&self, run_id: &str) -> Result<Option<RunInfo>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, start_time, end_time, status, inputs, counters FROM runs WHERE id = ?1",
        )?;

        stmt.query_row(params![run_id], |row| {
            Ok(RunInfo {
                id: row.get(0)?,
                kind: row.get(1)?,
                start_time: row.get(2)?,
                end_time: row.get(3)?,
                status: row.get(4)?,
                inputs: row.get(5)?,
                counters: row.get(6)?,
            })
        })
        .optional()
    }

    /// Inserts every row in one transaction; returns how many were written.
    pub fn insert_rows<'a, R, I>(&self, run_id: &str, kind: JobKind, rows: I) -> Result<usize>
    where
        R: TableRow + 'a,
        I: IntoIterator<Item = &'a R>,
    {
        let sql = match kind {
            JobKind::Vertices => "INSERT INTO vertices (run_id, id, url) VALUES (?1, ?2, ?3)",
            JobKind::Edges => "INSERT INTO edges (run_id, source_id, dest_id) VALUES (?1, ?2, ?3)",
        };

        let tx = self.conn.unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(sql)?;
            for row in rows {
                stmt.execute(params![run_id, row.key(), row.value()])?;
                count += 1;
            }
        }
        tx.commit()?;

        Ok(count)
    }

    // Query methods
    pub fn get_vertices(&self, run_id: &str) -> Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, url FROM vertices WHERE run_id = ?1 ORDER BY id")?;

        let vertices = stmt
            .query_map(params![run_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>>>()?;

        Ok(vertices)
    }

    pub fn get_edges(&self, run_id: &str) -> Result<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT source_id, dest_id FROM edges WHERE run_id = ?1 ORDER BY source_id, rowid",
        )?;

        let edges = stmt
            .query_map(params![run_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>>>()?;

        Ok(edges)
    }
}
