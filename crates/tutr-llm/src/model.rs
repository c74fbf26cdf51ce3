use crate::request::GenerateRequest;
use crate::response::Response;

/// A concrete, type-erased completion backend handle.
///
/// Wraps a [`LanguageModelBackend`] so callers never need generics. Both the
/// on-device and the remote backend end up behind this type.
pub struct LanguageModel {
    inner: Box<dyn LanguageModelBackend>,
}

impl LanguageModel {
    /// Wrap any backend implementation into a model.
    pub fn new(backend: impl LanguageModelBackend + 'static) -> Self {
        Self {
            inner: Box::new(backend),
        }
    }

    /// The model identifier (e.g. `"gpt-4.1-mini"`, `"qwen2.5-3b-instruct"`).
    pub fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    /// The backend name this model belongs to (e.g. `"openai"`, `"local"`).
    pub fn provider(&self) -> &str {
        self.inner.provider()
    }

    /// Start a streaming completion.
    pub fn generate(&self, request: impl Into<GenerateRequest>) -> Response {
        self.inner.generate(request.into())
    }
}

impl std::fmt::Debug for LanguageModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageModel")
            .field("provider", &self.provider())
            .field("model_id", &self.model_id())
            .finish()
    }
}

/// Trait that backend crates implement for a specific model.
pub trait LanguageModelBackend: Send + Sync {
    fn model_id(&self) -> &str;
    fn provider(&self) -> &str;
    fn generate(&self, request: GenerateRequest) -> Response;
}
