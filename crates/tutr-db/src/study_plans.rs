use rusqlite::{OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};

use crate::database::{Database, collect_rows, now_ms};
use crate::error::{Error, Result};

/// A saved study plan. `id` and `created_at_ms` are assigned by the store
/// and never change; there is no update path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyPlan {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at_ms: i64,
}

pub struct StudyPlans<'db> {
    pub(crate) db: &'db mut Database,
}

impl StudyPlans<'_> {
    /// Every plan, most recent first.
    pub fn list_all(&self) -> Result<Vec<StudyPlan>> {
        let mut stmt = self.db.conn.prepare(
            "SELECT id, title, content, created_at_ms
             FROM study_plans
             ORDER BY created_at_ms DESC, id DESC",
        )?;
        let iter = stmt.query_map([], row_to_plan)?;
        collect_rows(iter)
    }

    /// Insert a plan and return its id.
    pub fn create(&mut self, title: &str, content: &str) -> Result<i64> {
        let now = now_ms();
        self.db.conn.execute(
            "INSERT INTO study_plans (title, content, created_at_ms)
             VALUES (?1, ?2, ?3)",
            params![title, content, now],
        )?;
        let id = self.db.conn.last_insert_rowid();
        tracing::debug!(id, title, "study plan created");
        Ok(id)
    }

    pub fn get(&self, id: i64) -> Result<Option<StudyPlan>> {
        self.db
            .conn
            .query_row(
                "SELECT id, title, content, created_at_ms
                 FROM study_plans
                 WHERE id = ?1",
                params![id],
                row_to_plan,
            )
            .optional()
            .map_err(Error::from)
    }
}

fn row_to_plan(row: &Row<'_>) -> rusqlite::Result<StudyPlan> {
    Ok(StudyPlan {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        created_at_ms: row.get(3)?,
    })
}
