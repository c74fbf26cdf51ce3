use serde::{Deserialize, Serialize};

/// Instruction sent as the system message when none is configured.
pub const DEFAULT_INSTRUCTIONS: &str = "Basado en las siguientes preguntas y conversaciones de un estudiante, genera un plan de estudios estructurado. Identifica los temas principales, sugiere un orden de estudio, y proporciona recursos o conceptos clave a reforzar. El plan debe ser claro, conciso y motivador.";

/// Title used when the plan text has no usable first line.
pub const UNTITLED_PLAN: &str = "Plan de estudios";

/// A completed plan, ready to be saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishedPlan {
    pub title: String,
    pub content: String,
}

impl FinishedPlan {
    pub fn from_content(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            title: derive_title(&content),
            content,
        }
    }
}

/// The first line of `content` with markdown heading markers stripped.
pub fn derive_title(content: &str) -> String {
    let title = content
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .trim_start_matches('#')
        .trim();
    if title.is_empty() {
        UNTITLED_PLAN.to_string()
    } else {
        title.to_string()
    }
}
