use serde::{Deserialize, Serialize};

/// Speaker name that marks a turn as written by the student.
pub const USER_SPEAKER: &str = "user";

/// One message from a prior conversation, with every candidate response
/// ("swipe") and the index of the one that was kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub speaker_name: String,
    pub alternatives: Vec<String>,
    #[serde(default)]
    pub selected: usize,
}

impl ChatTurn {
    /// A turn with a single alternative.
    pub fn new(speaker_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker_name: speaker_name.into(),
            alternatives: vec![text.into()],
            selected: 0,
        }
    }

    pub fn is_user(&self) -> bool {
        self.speaker_name == USER_SPEAKER
    }

    pub fn selected_text(&self) -> Option<&str> {
        self.alternatives.get(self.selected).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub name: String,
    pub turns: Vec<ChatTurn>,
}

impl ChatSession {
    pub fn new(name: impl Into<String>, turns: Vec<ChatTurn>) -> Self {
        Self {
            name: name.into(),
            turns,
        }
    }
}
