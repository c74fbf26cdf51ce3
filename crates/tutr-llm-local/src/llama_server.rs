//! Engine that streams from a llama.cpp-compatible server running on the
//! device (`llama-server`, koboldcpp in llama mode, etc.).

use eventsource_stream::Eventsource;
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;
use tutr_llm::error::Error;
use tutr_llm::response::Response;
use tutr_llm::stream::{FinishReason, StreamEvent, Usage};

use crate::{CompletionRequest, LocalEngine};

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080";

pub struct LlamaServerEngine {
    client: reqwest::Client,
    endpoint: String,
}

impl LlamaServerEngine {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    fn url(&self) -> String {
        format!("{}/completion", self.endpoint.trim_end_matches('/'))
    }
}

impl Default for LlamaServerEngine {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

impl LocalEngine for LlamaServerEngine {
    fn name(&self) -> &str {
        "llama-server"
    }

    fn complete(&self, request: CompletionRequest) -> Response {
        let client = self.client.clone();
        let url = self.url();
        let body = CompletionBody::from(request);

        Response::new(async_stream::try_stream! {
            tracing::debug!(%url, "opening local completion stream");
            let resp = client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| Error::Http(Box::new(e)))?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body_text = resp.text().await.unwrap_or_default();
                Err(Error::Api {
                    code: status.as_str().to_string(),
                    message: body_text,
                })?;
                unreachable!();
            }

            let mut sse = resp.bytes_stream().eventsource();
            let mut finished = false;
            while let Some(event) = sse.next().await {
                let event = event.map_err(|e| Error::Sse(e.to_string()))?;
                for stream_event in map_chunk(&event.data)? {
                    finished |= !matches!(stream_event, StreamEvent::TextDelta(_));
                    yield stream_event;
                }
                if finished {
                    break;
                }
            }

            if !finished {
                yield StreamEvent::Finish {
                    reason: FinishReason::Stop,
                    usage: None,
                };
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct CompletionBody {
    prompt: String,
    stream: bool,
    cache_prompt: bool,
    /// `-1` lets the server generate until a stop condition.
    n_predict: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    repeat_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
}

impl From<CompletionRequest> for CompletionBody {
    fn from(request: CompletionRequest) -> Self {
        let options = request.options;
        Self {
            prompt: request.prompt,
            stream: true,
            cache_prompt: true,
            n_predict: options.max_tokens.map(i64::from).unwrap_or(-1),
            temperature: options.temperature,
            top_p: options.top_p,
            top_k: options.top_k,
            min_p: options.min_p,
            repeat_penalty: options.repetition_penalty,
            seed: options.seed,
            stop: options.stop.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    content: String,
    #[serde(default)]
    stop: bool,
    #[serde(default)]
    stopped_limit: bool,
    #[serde(default)]
    tokens_predicted: Option<u32>,
    #[serde(default)]
    tokens_evaluated: Option<u32>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

fn map_chunk(data: &str) -> Result<Vec<StreamEvent>, Error> {
    let data = data.trim();
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let chunk: CompletionChunk = serde_json::from_str(data)?;
    if let Some(error) = chunk.error {
        return Ok(vec![StreamEvent::Error(error.to_string())]);
    }

    let mut events = Vec::new();
    if !chunk.content.is_empty() {
        events.push(StreamEvent::TextDelta(chunk.content));
    }
    if chunk.stop {
        let usage = match (chunk.tokens_evaluated, chunk.tokens_predicted) {
            (None, None) => None,
            (input, output) => Some(Usage {
                input_tokens: input.unwrap_or_default(),
                output_tokens: output.unwrap_or_default(),
                cached_tokens: None,
            }),
        };
        events.push(StreamEvent::Finish {
            reason: if chunk.stopped_limit {
                FinishReason::Length
            } else {
                FinishReason::Stop
            },
            usage,
        });
    }
    Ok(events)
}
