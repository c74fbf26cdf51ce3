use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, Row};

use crate::error::Result;
use crate::migration;

pub(crate) struct Database {
    pub(crate) conn: Connection,
}

impl Database {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        prepare_db_file(path)?;

        let mut conn = Connection::open(path)?;
        configure_connection(&conn)?;
        migration::apply(&mut conn)?;
        tracing::debug!(path = %path.display(), "opened database");

        Ok(Self { conn })
    }

    pub(crate) fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        configure_connection(&conn)?;
        migration::apply(&mut conn)?;

        Ok(Self { conn })
    }
}

fn prepare_db_file(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(())
}

pub(crate) fn collect_rows<T, F>(iter: rusqlite::MappedRows<'_, F>) -> Result<Vec<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut rows = Vec::new();
    for row in iter {
        rows.push(row?);
    }
    Ok(rows)
}

pub(crate) fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
