use rusqlite::types::Type;
use rusqlite::{OptionalExtension, Row, Transaction, params};
use serde::{Deserialize, Serialize};

use crate::database::{Database, collect_rows, now_ms};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub name: String,
    pub created_at_ms: i64,
}

/// One message in a chat. `swipes` holds every candidate response; `swipe_id`
/// is the one the student kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub id: i64,
    pub chat_id: i64,
    pub speaker_name: String,
    pub position: i64,
    pub swipe_id: i64,
    pub swipes: Vec<String>,
    pub sent_at_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChatEntry {
    pub speaker_name: String,
    pub swipes: Vec<String>,
    #[serde(default)]
    pub swipe_id: i64,
    /// Defaults to the insert time.
    #[serde(default)]
    pub sent_at_ms: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatWithEntries {
    pub chat: Chat,
    pub entries: Vec<ChatEntry>,
}

pub struct Chats<'db> {
    pub(crate) db: &'db mut Database,
}

impl Chats<'_> {
    pub fn create_chat(&mut self, name: &str) -> Result<Chat> {
        let now = now_ms();
        self.db.conn.execute(
            "INSERT INTO chats (name, created_at_ms) VALUES (?1, ?2)",
            params![name, now],
        )?;
        Ok(Chat {
            id: self.db.conn.last_insert_rowid(),
            name: name.to_string(),
            created_at_ms: now,
        })
    }

    pub fn get_chat(&self, chat_id: i64) -> Result<Option<Chat>> {
        self.db
            .conn
            .query_row(
                "SELECT id, name, created_at_ms FROM chats WHERE id = ?1",
                params![chat_id],
                row_to_chat,
            )
            .optional()
            .map_err(Error::from)
    }

    pub fn list_chats(&self) -> Result<Vec<Chat>> {
        let mut stmt = self.db.conn.prepare(
            "SELECT id, name, created_at_ms
             FROM chats
             ORDER BY created_at_ms DESC, id DESC",
        )?;
        let iter = stmt.query_map([], row_to_chat)?;
        collect_rows(iter)
    }

    /// Append an entry at the end of the chat.
    pub fn append_entry(&mut self, chat_id: i64, input: NewChatEntry) -> Result<ChatEntry> {
        let tx = self.db.conn.transaction()?;
        ensure_chat_exists(&tx, chat_id)?;

        let position: i64 = tx.query_row(
            "SELECT COALESCE(MAX(position), -1) + 1 FROM chat_entries WHERE chat_id = ?1",
            params![chat_id],
            |row| row.get(0),
        )?;
        let sent_at_ms = input.sent_at_ms.unwrap_or_else(now_ms);
        let swipes_json = serde_json::to_string(&input.swipes)?;

        tx.execute(
            "INSERT INTO chat_entries (
                chat_id, speaker_name, position, swipe_id, swipes_json, sent_at_ms
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                chat_id,
                input.speaker_name,
                position,
                input.swipe_id,
                swipes_json,
                sent_at_ms
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(ChatEntry {
            id,
            chat_id,
            speaker_name: input.speaker_name,
            position,
            swipe_id: input.swipe_id,
            swipes: input.swipes,
            sent_at_ms,
        })
    }

    pub fn entries(&self, chat_id: i64) -> Result<Vec<ChatEntry>> {
        let mut stmt = self.db.conn.prepare(
            "SELECT id, chat_id, speaker_name, position, swipe_id, swipes_json, sent_at_ms
             FROM chat_entries
             WHERE chat_id = ?1
             ORDER BY position ASC",
        )?;
        let iter = stmt.query_map(params![chat_id], row_to_entry)?;
        collect_rows(iter)
    }

    /// Chats with at least one entry sent within `[start_ms, end_ms]`.
    ///
    /// Each chat carries only its in-range entries, in conversation order.
    /// Chats are ordered by id (creation order).
    pub fn chats_between(&self, start_ms: i64, end_ms: i64) -> Result<Vec<ChatWithEntries>> {
        let mut stmt = self.db.conn.prepare(
            "SELECT
                c.id, c.name, c.created_at_ms,
                e.id, e.chat_id, e.speaker_name, e.position, e.swipe_id, e.swipes_json, e.sent_at_ms
             FROM chat_entries e
             JOIN chats c ON c.id = e.chat_id
             WHERE e.sent_at_ms BETWEEN ?1 AND ?2
             ORDER BY c.id ASC, e.position ASC",
        )?;
        let iter = stmt.query_map(params![start_ms, end_ms], |row| {
            let chat = row_to_chat(row)?;
            let entry = entry_from_offset(row, 3)?;
            Ok((chat, entry))
        })?;

        let mut grouped: Vec<ChatWithEntries> = Vec::new();
        for (chat, entry) in collect_rows(iter)? {
            match grouped.last_mut() {
                Some(last) if last.chat.id == chat.id => last.entries.push(entry),
                _ => grouped.push(ChatWithEntries {
                    chat,
                    entries: vec![entry],
                }),
            }
        }
        Ok(grouped)
    }
}

fn ensure_chat_exists(tx: &Transaction<'_>, chat_id: i64) -> Result<()> {
    let exists = tx
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM chats WHERE id = ?1)",
            params![chat_id],
            |row| row.get::<_, i64>(0),
        )
        .map(|n| n != 0)?;
    if exists {
        Ok(())
    } else {
        Err(Error::ChatNotFound(chat_id))
    }
}

fn row_to_chat(row: &Row<'_>) -> rusqlite::Result<Chat> {
    Ok(Chat {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at_ms: row.get(2)?,
    })
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<ChatEntry> {
    entry_from_offset(row, 0)
}

fn entry_from_offset(row: &Row<'_>, at: usize) -> rusqlite::Result<ChatEntry> {
    let swipes_idx = at + 5;
    let raw: String = row.get(swipes_idx)?;
    let swipes = serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(swipes_idx, Type::Text, Box::new(e))
    })?;
    Ok(ChatEntry {
        id: row.get(at)?,
        chat_id: row.get(at + 1)?,
        speaker_name: row.get(at + 2)?,
        position: row.get(at + 3)?,
        swipe_id: row.get(at + 4)?,
        swipes,
        sent_at_ms: row.get(at + 6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;

    fn entry(speaker: &str, text: &str, sent_at_ms: i64) -> NewChatEntry {
        NewChatEntry {
            speaker_name: speaker.into(),
            swipes: vec![text.into()],
            swipe_id: 0,
            sent_at_ms: Some(sent_at_ms),
        }
    }

    #[test]
    fn append_assigns_sequential_positions() {
        let mut store = Store::open_in_memory().unwrap();
        let chat = store.chats().create_chat("Matemáticas").unwrap();

        let a = store.chats().append_entry(chat.id, entry("user", "hola", 10)).unwrap();
        let b = store
            .chats()
            .append_entry(
                chat.id,
                NewChatEntry {
                    speaker_name: "Tutor".into(),
                    swipes: vec!["uno".into(), "dos".into()],
                    swipe_id: 1,
                    sent_at_ms: Some(11),
                },
            )
            .unwrap();
        assert_eq!((a.position, b.position), (0, 1));

        let entries = store.chats().entries(chat.id).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].swipes, vec!["uno", "dos"]);
        assert_eq!(entries[1].swipe_id, 1);
    }

    #[test]
    fn append_to_missing_chat_fails() {
        let mut store = Store::open_in_memory().unwrap();
        let err = store.chats().append_entry(7, entry("user", "x", 1)).unwrap_err();
        assert!(matches!(err, Error::ChatNotFound(7)));
    }

    #[test]
    fn chats_between_filters_entries_and_groups_by_chat() {
        let mut store = Store::open_in_memory().unwrap();
        let algebra = store.chats().create_chat("Álgebra").unwrap();
        let history = store.chats().create_chat("Historia").unwrap();
        let old = store.chats().create_chat("Viejo").unwrap();

        let mut chats = store.chats();
        chats.append_entry(algebra.id, entry("user", "a0", 100)).unwrap();
        chats.append_entry(algebra.id, entry("Tutor", "a1", 150)).unwrap();
        chats.append_entry(algebra.id, entry("user", "a2", 900)).unwrap();
        chats.append_entry(history.id, entry("user", "h0", 200)).unwrap();
        chats.append_entry(old.id, entry("user", "o0", 5)).unwrap();

        let found = chats.chats_between(100, 200).unwrap();
        let names: Vec<&str> = found.iter().map(|c| c.chat.name.as_str()).collect();
        assert_eq!(names, ["Álgebra", "Historia"]);

        let algebra_texts: Vec<&str> = found[0]
            .entries
            .iter()
            .map(|e| e.swipes[0].as_str())
            .collect();
        assert_eq!(algebra_texts, ["a0", "a1"]);
        assert_eq!(found[1].entries.len(), 1);
    }

    #[test]
    fn chats_between_empty_range_is_empty() {
        let mut store = Store::open_in_memory().unwrap();
        let chat = store.chats().create_chat("x").unwrap();
        store.chats().append_entry(chat.id, entry("user", "x", 50)).unwrap();
        assert!(store.chats().chats_between(60, 70).unwrap().is_empty());
    }
}
