//! Flatten stored chat sessions into the canonical message list every
//! backend consumes.

use tutr_llm::{Message, Role};

use crate::chat::{ChatSession, ChatTurn};
use crate::error::{Error, Result};

/// Build `[system, turns of session 1, turns of session 2, ...]`.
///
/// Each turn contributes its selected alternative. A speaker named `user`
/// becomes a [`Role::User`] message; every other speaker is the assistant.
/// Consecutive turns with the same role, including across session
/// boundaries, are coalesced into one message joined by `\n`. An empty
/// `system_prompt` adds no system message.
pub fn normalize(sessions: &[ChatSession], system_prompt: &str) -> Result<Vec<Message>> {
    let turns: usize = sessions.iter().map(|s| s.turns.len()).sum();
    let mut messages = Vec::with_capacity(turns + 1);

    if !system_prompt.is_empty() {
        messages.push(Message::system(system_prompt));
    }

    for session in sessions {
        for (index, turn) in session.turns.iter().enumerate() {
            let message = turn_message(session, index, turn)?;
            match messages.last_mut() {
                Some(last) if last.role == message.role => {
                    last.content.push('\n');
                    last.content.push_str(&message.content);
                }
                _ => messages.push(message),
            }
        }
    }

    Ok(messages)
}

fn turn_message(session: &ChatSession, index: usize, turn: &ChatTurn) -> Result<Message> {
    let text = turn
        .selected_text()
        .ok_or_else(|| Error::InvalidTurnIndex {
            session: session.name.clone(),
            turn: index,
            index: turn.selected,
            available: turn.alternatives.len(),
        })?;
    let role = if turn.is_user() {
        Role::User
    } else {
        Role::Assistant
    };
    Ok(Message::new(role, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pick(speaker: &str, alternatives: &[&str], selected: usize) -> ChatTurn {
        ChatTurn {
            speaker_name: speaker.into(),
            alternatives: alternatives.iter().map(|s| s.to_string()).collect(),
            selected,
        }
    }

    #[test]
    fn selected_alternatives_follow_the_system_prompt() {
        let sessions = vec![ChatSession::new(
            "Álgebra",
            vec![
                pick("user", &["What is 2+2?"], 0),
                pick("Tutor", &["4", "Four"], 1),
            ],
        )];

        let messages = normalize(&sessions, "S").unwrap();
        assert_eq!(
            messages,
            vec![
                Message::system("S"),
                Message::user("What is 2+2?"),
                Message::assistant("Four"),
            ]
        );
    }

    #[test]
    fn consecutive_same_role_turns_are_merged() {
        let sessions = vec![ChatSession::new(
            "x",
            vec![
                ChatTurn::new("user", "first"),
                ChatTurn::new("user", "second"),
                ChatTurn::new("Tutor", "answer"),
            ],
        )];

        let messages = normalize(&sessions, "").unwrap();
        assert_eq!(
            messages,
            vec![
                Message::user("first\nsecond"),
                Message::assistant("answer"),
            ]
        );
    }

    #[test]
    fn merging_spans_session_boundaries_but_not_the_system_prompt() {
        let sessions = vec![
            ChatSession::new("A", vec![ChatTurn::new("Tutor", "a")]),
            ChatSession::new("B", vec![ChatTurn::new("Tutor", "b"), ChatTurn::new("user", "c")]),
        ];

        let messages = normalize(&sessions, "S").unwrap();
        assert_eq!(
            messages,
            vec![
                Message::system("S"),
                Message::assistant("a\nb"),
                Message::user("c"),
            ]
        );
    }

    #[test]
    fn empty_history_yields_only_the_system_prompt() {
        assert_eq!(normalize(&[], "S").unwrap(), vec![Message::system("S")]);
        assert!(normalize(&[], "").unwrap().is_empty());
    }

    #[test]
    fn any_non_user_speaker_is_the_assistant() {
        let sessions = vec![ChatSession::new(
            "x",
            vec![ChatTurn::new("User", "caps"), ChatTurn::new("Profesora", "hola")],
        )];
        assert_eq!(
            normalize(&sessions, "").unwrap(),
            vec![Message::assistant("caps\nhola")]
        );
    }

    #[test]
    fn out_of_range_selection_is_rejected() {
        let sessions = vec![ChatSession::new(
            "Historia",
            vec![ChatTurn::new("user", "ok"), pick("Tutor", &["only"], 3)],
        )];

        let err = normalize(&sessions, "S").unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTurnIndex {
                ref session,
                turn: 1,
                index: 3,
                available: 1,
            } if session == "Historia"
        ));
    }
}
