//! Instruct templates: how a local model expects a conversation to be laid
//! out as one flat prompt.

use serde::{Deserialize, Serialize};
use tutr_llm::{Message, Role};

/// Per-role wrappers applied around each message, plus the stop sequences
/// that mark the end of the model's turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstructFormat {
    pub name: String,
    pub system_prefix: String,
    pub system_suffix: String,
    pub input_prefix: String,
    pub input_suffix: String,
    pub output_prefix: String,
    pub output_suffix: String,
    pub stop_sequences: Vec<String>,
}

impl Default for InstructFormat {
    fn default() -> Self {
        Self::chatml()
    }
}

impl InstructFormat {
    pub fn chatml() -> Self {
        Self {
            name: "ChatML".into(),
            system_prefix: "<|im_start|>system\n".into(),
            system_suffix: "<|im_end|>\n".into(),
            input_prefix: "<|im_start|>user\n".into(),
            input_suffix: "<|im_end|>\n".into(),
            output_prefix: "<|im_start|>assistant\n".into(),
            output_suffix: "<|im_end|>\n".into(),
            stop_sequences: vec!["<|im_end|>".into()],
        }
    }

    pub fn llama3() -> Self {
        Self {
            name: "Llama 3".into(),
            system_prefix: "<|start_header_id|>system<|end_header_id|>\n\n".into(),
            system_suffix: "<|eot_id|>".into(),
            input_prefix: "<|start_header_id|>user<|end_header_id|>\n\n".into(),
            input_suffix: "<|eot_id|>".into(),
            output_prefix: "<|start_header_id|>assistant<|end_header_id|>\n\n".into(),
            output_suffix: "<|eot_id|>".into(),
            stop_sequences: vec!["<|eot_id|>".into()],
        }
    }

    /// Flatten `messages` into a prompt that ends with an open assistant turn.
    pub fn format_prompt(&self, messages: &[Message]) -> String {
        let mut prompt = String::new();
        for message in messages {
            let (prefix, suffix) = self.wrappers(message.role);
            prompt.push_str(prefix);
            prompt.push_str(&message.content);
            prompt.push_str(suffix);
        }
        prompt.push_str(&self.output_prefix);
        prompt
    }

    fn wrappers(&self, role: Role) -> (&str, &str) {
        match role {
            Role::System => (&self.system_prefix, &self.system_suffix),
            Role::User => (&self.input_prefix, &self.input_suffix),
            Role::Assistant => (&self.output_prefix, &self.output_suffix),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chatml_prompt_ends_with_open_assistant_turn() {
        let prompt = InstructFormat::chatml().format_prompt(&[
            Message::system("Eres un tutor."),
            Message::user("Hola"),
        ]);
        assert_eq!(
            prompt,
            "<|im_start|>system\nEres un tutor.<|im_end|>\n\
             <|im_start|>user\nHola<|im_end|>\n\
             <|im_start|>assistant\n"
        );
    }

    #[test]
    fn partial_format_falls_back_to_chatml_fields() {
        let format: InstructFormat =
            serde_json::from_str(r####"{"name":"custom","input_prefix":"### User:\n"}"####)
                .unwrap();
        assert_eq!(format.name, "custom");
        assert_eq!(format.input_prefix, "### User:\n");
        assert_eq!(format.output_prefix, "<|im_start|>assistant\n");
    }

    #[test]
    fn empty_conversation_is_just_the_output_prefix() {
        let format = InstructFormat::llama3();
        assert_eq!(format.format_prompt(&[]), format.output_prefix);
    }
}
