//! Remote completion backend for OpenAI-compatible HTTP endpoints.

mod convert;
mod stream;
mod types;

use std::sync::Arc;

use tutr_llm::request::GenerateRequest;
use tutr_llm::response::Response;
use tutr_llm::{LanguageModel, LanguageModelBackend};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Which request/stream shape the endpoint speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    /// `POST /responses` with typed SSE events.
    Responses,
    /// `POST /chat/completions` with `data:` chunks terminated by `[DONE]`.
    #[default]
    ChatCompletions,
}

impl WireFormat {
    fn default_path(self) -> &'static str {
        match self {
            WireFormat::Responses => "/responses",
            WireFormat::ChatCompletions => "/chat/completions",
        }
    }
}

/// Configuration for one remote endpoint.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub base_url: String,
    pub format: WireFormat,
    /// Overrides the format's default request path.
    pub path: Option<String>,
    pub extra_headers: Vec<(String, String)>,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.into(),
            format: WireFormat::default(),
            path: None,
            extra_headers: Vec::new(),
        }
    }
}

impl OpenAIConfig {
    pub fn url(&self) -> String {
        let path = self
            .path
            .as_deref()
            .unwrap_or_else(|| self.format.default_path());
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Create a model handle for `model_id` served by the configured endpoint.
pub fn model(config: OpenAIConfig, model_id: impl Into<String>) -> LanguageModel {
    LanguageModel::new(OpenAIModel {
        model_id: model_id.into(),
        state: Arc::new(ProviderState {
            client: reqwest::Client::new(),
            config,
        }),
    })
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

struct ProviderState {
    client: reqwest::Client,
    config: OpenAIConfig,
}

struct OpenAIModel {
    model_id: String,
    state: Arc<ProviderState>,
}

impl LanguageModelBackend for OpenAIModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn provider(&self) -> &str {
        "openai"
    }

    fn generate(&self, request: GenerateRequest) -> Response {
        let body = convert::to_request_body(self.state.config.format, &self.model_id, &request);
        let state = Arc::clone(&self.state);
        Response::new(stream::open(state, body))
    }
}
