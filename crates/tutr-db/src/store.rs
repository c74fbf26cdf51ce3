use std::path::Path;

use crate::chats::Chats;
use crate::database::Database;
use crate::error::Result;
use crate::study_plans::StudyPlans;

/// Handle to the app database. Table groups are reached through short-lived
/// borrowed accessors.
pub struct Store {
    db: Database,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            db: Database::open(path.as_ref())?,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            db: Database::open_in_memory()?,
        })
    }

    pub fn study_plans(&mut self) -> StudyPlans<'_> {
        StudyPlans { db: &mut self.db }
    }

    pub fn chats(&mut self) -> Chats<'_> {
        Chats { db: &mut self.db }
    }
}
