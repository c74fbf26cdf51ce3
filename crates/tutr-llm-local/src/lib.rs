//! # tutr-llm-local
//!
//! On-device completion backend. A local model takes one flat prompt rather
//! than a role-tagged conversation, so this crate:
//!
//! - flattens canonical messages with an [`InstructFormat`],
//! - merges the format's stop sequences into the sampler options,
//! - hands the result to a [`LocalEngine`], the opaque inference runtime.
//!
//! ```ignore
//! let engine = tutr_llm_local::LlamaServerEngine::new("http://127.0.0.1:8080");
//! let model = tutr_llm_local::model(engine, InstructFormat::chatml(), "qwen2.5-3b");
//! let response = model.generate(request);
//! ```

pub mod instruct;
pub mod llama_server;

use tutr_llm::request::{GenerateOptions, GenerateRequest};
use tutr_llm::response::Response;
use tutr_llm::{LanguageModel, LanguageModelBackend};

pub use instruct::InstructFormat;
pub use llama_server::LlamaServerEngine;

/// A formatted text-completion request for the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub options: GenerateOptions,
}

/// The on-device inference runtime. Implementations stream raw text
/// completions for an already-formatted prompt.
pub trait LocalEngine: Send + Sync {
    fn name(&self) -> &str;
    fn complete(&self, request: CompletionRequest) -> Response;
}

/// Wrap `engine` into a model handle that speaks canonical messages.
pub fn model(
    engine: impl LocalEngine + 'static,
    format: InstructFormat,
    model_id: impl Into<String>,
) -> LanguageModel {
    LanguageModel::new(LocalModel {
        model_id: model_id.into(),
        format,
        engine: Box::new(engine),
    })
}

struct LocalModel {
    model_id: String,
    format: InstructFormat,
    engine: Box<dyn LocalEngine>,
}

impl LocalModel {
    fn completion_request(&self, request: GenerateRequest) -> CompletionRequest {
        let prompt = self.format.format_prompt(&request.messages);
        let mut options = request.options;

        let mut stop = options.stop.take().unwrap_or_default();
        for sequence in &self.format.stop_sequences {
            if !sequence.is_empty() && !stop.contains(sequence) {
                stop.push(sequence.clone());
            }
        }
        options.stop = (!stop.is_empty()).then_some(stop);

        CompletionRequest { prompt, options }
    }
}

impl LanguageModelBackend for LocalModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn provider(&self) -> &str {
        "local"
    }

    fn generate(&self, request: GenerateRequest) -> Response {
        let completion = self.completion_request(request);
        tracing::debug!(
            engine = self.engine.name(),
            prompt_chars = completion.prompt.len(),
            "local completion"
        );
        self.engine.complete(completion)
    }
}
