use std::path::Path;

use serde::Deserialize;
use tutr_db::{NewChatEntry, Store};

#[derive(Debug, Deserialize)]
pub struct ChatImport {
    pub name: String,
    pub entries: Vec<NewChatEntry>,
}

/// An import file holds one chat or an array of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum ImportFile {
    Many(Vec<ChatImport>),
    One(ChatImport),
}

pub fn parse_import(raw: &str) -> Result<Vec<ChatImport>, serde_json::Error> {
    Ok(match serde_json::from_str(raw)? {
        ImportFile::Many(chats) => chats,
        ImportFile::One(chat) => vec![chat],
    })
}

pub fn import_chats(store: &mut Store, file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(file)?;
    let imports = parse_import(&raw)?;

    let mut chats = store.chats();
    let mut entries = 0;
    for import in &imports {
        let chat = chats.create_chat(&import.name)?;
        for entry in &import.entries {
            chats.append_entry(chat.id, entry.clone())?;
            entries += 1;
        }
    }
    tracing::info!(chats = imports.len(), entries, file = %file.display(), "imported chats");
    eprintln!("imported {} chats ({entries} entries)", imports.len());
    Ok(())
}

pub fn list_chats(store: &mut Store) -> Result<(), Box<dyn std::error::Error>> {
    let chats = store.chats().list_chats()?;
    if chats.is_empty() {
        eprintln!("no chats yet; add some with `tutr chats import`");
    }
    for chat in chats {
        println!("{:>5}  {}  {}", chat.id, format_ms(chat.created_at_ms), chat.name);
    }
    Ok(())
}

pub fn list_plans(store: &mut Store) -> Result<(), Box<dyn std::error::Error>> {
    let plans = store.study_plans().list_all()?;
    if plans.is_empty() {
        eprintln!("no saved plans");
    }
    for plan in plans {
        println!("{:>5}  {}  {}", plan.id, format_ms(plan.created_at_ms), plan.title);
    }
    Ok(())
}

pub fn show_plan(store: &mut Store, id: i64) -> Result<(), Box<dyn std::error::Error>> {
    let plan = store
        .study_plans()
        .get(id)?
        .ok_or_else(|| format!("no plan with id {id}"))?;
    println!("{}", plan.content);
    Ok(())
}

fn format_ms(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_chat_and_array_both_parse() {
        let one = parse_import(
            r#"{"name":"Física","entries":[{"speaker_name":"user","swipes":["¿Qué es la inercia?"]}]}"#,
        )
        .unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].entries[0].swipe_id, 0);
        assert!(one[0].entries[0].sent_at_ms.is_none());

        let many = parse_import(
            r#"[{"name":"a","entries":[]},{"name":"b","entries":[{"speaker_name":"Tutor","swipes":["x","y"],"swipe_id":1,"sent_at_ms":1700000000000}]}]"#,
        )
        .unwrap();
        assert_eq!(many.len(), 2);
        assert_eq!(many[1].entries[0].sent_at_ms, Some(1_700_000_000_000));
    }

    #[test]
    fn import_writes_chats_to_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("chats.json");
        std::fs::write(
            &file,
            r#"{"name":"Física","entries":[
                {"speaker_name":"user","swipes":["hola"],"sent_at_ms":1000},
                {"speaker_name":"Tutor","swipes":["buenas"],"sent_at_ms":2000}
            ]}"#,
        )
        .unwrap();

        let mut store = Store::open_in_memory().unwrap();
        import_chats(&mut store, &file).unwrap();

        let found = store.chats().chats_between(0, 5000).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].chat.name, "Física");
        assert_eq!(found[0].entries.len(), 2);
    }

    #[test]
    fn timestamps_render_in_utc() {
        assert_eq!(format_ms(0), "1970-01-01 00:00");
    }
}
