use super::{ResponseRecord, ResponseSink, SinkError};
use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

const SELECT_COLUMNS: &str =
    "created_at, user_id, survey_version, path_id, q_idx, answers, finished, result";

/// Local append-only table of response records. Clones share one connection.
#[derive(Debug, Clone)]
pub struct SqliteResponseStore {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteResponseStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SinkError> {
        let connection = Connection::open(path)?;
        let _mode: String =
            connection.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        connection.pragma_update(None, "synchronous", "NORMAL")?;
        Self::with_connection(connection)
    }

    pub fn open_in_memory() -> Result<Self, SinkError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(connection: Connection) -> Result<Self, SinkError> {
        ensure_schema(&connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    pub fn append(&self, record: &ResponseRecord) -> Result<(), SinkError> {
        let answers = serde_json::to_string(&record.answers)?;
        let result = record
            .result
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let connection = self.lock()?;
        connection.execute(
            "INSERT INTO responses
               (created_at, user_id, survey_version, path_id, q_idx, answers, finished, result)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.created_at,
                record.user_id,
                record.survey_version,
                record.path_id,
                record.q_idx as i64,
                answers,
                record.finished,
                result,
            ],
        )?;
        Ok(())
    }

    /// Newest records first.
    pub fn recent(&self, limit: usize) -> Result<Vec<ResponseRecord>, SinkError> {
        let connection = self.lock()?;
        let mut statement = connection.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM responses ORDER BY id DESC LIMIT ?1"
        ))?;
        let rows = statement.query_map(params![limit as i64], record_from_row)?;
        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Every record of one session in insertion order.
    pub fn for_user(&self, user_id: &str) -> Result<Vec<ResponseRecord>, SinkError> {
        let connection = self.lock()?;
        let mut statement = connection.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM responses WHERE user_id = ?1 ORDER BY id ASC"
        ))?;
        let rows = statement.query_map(params![user_id], record_from_row)?;
        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn count(&self) -> Result<u64, SinkError> {
        let connection = self.lock()?;
        let count: i64 =
            connection.query_row("SELECT COUNT(*) FROM responses", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SinkError> {
        self.connection
            .lock()
            .map_err(|_| SinkError::Unavailable("sqlite connection mutex poisoned".to_string()))
    }
}

#[async_trait]
impl ResponseSink for SqliteResponseStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    /// Runs the insert on the blocking pool.
    async fn record(&self, record: &ResponseRecord) -> Result<(), SinkError> {
        let store = self.clone();
        let record = record.clone();
        tokio::task::spawn_blocking(move || store.append(&record))
            .await
            .map_err(|err| SinkError::Unavailable(format!("sqlite insert task failed: {err}")))?
    }
}

fn ensure_schema(connection: &Connection) -> Result<(), SinkError> {
    connection.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS responses (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          created_at TEXT NOT NULL,
          user_id TEXT NOT NULL,
          survey_version TEXT NOT NULL,
          path_id TEXT NOT NULL,
          q_idx INTEGER NOT NULL,
          answers TEXT NOT NULL,
          finished INTEGER NOT NULL,
          result TEXT
        );

        CREATE INDEX IF NOT EXISTS responses_user_id_idx ON responses(user_id, id);
        ",
    )?;
    Ok(())
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ResponseRecord> {
    let answers: String = row.get(5)?;
    let result: Option<String> = row.get(7)?;
    let q_idx: i64 = row.get(4)?;

    Ok(ResponseRecord {
        created_at: row.get(0)?,
        user_id: row.get(1)?,
        survey_version: row.get(2)?,
        path_id: row.get(3)?,
        q_idx: q_idx.max(0) as usize,
        answers: serde_json::from_str(&answers)
            .map_err(|err| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(err)))?,
        finished: row.get(6)?,
        result: result
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(|err| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(err)))?,
    })
}
