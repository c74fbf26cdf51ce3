//! Opens an SSE connection to an OpenAI-compatible endpoint and maps events
//! to the tutr-llm `StreamEvent` type.

use crate::types::{ChatCompletionChunk, OutputTextDelta, RequestBody, ResponseCompleted};
use crate::{ProviderState, WireFormat};
use eventsource_stream::Eventsource;
use futures::Stream;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tutr_llm::error::Error;
use tutr_llm::stream::{FinishReason, StreamEvent, Usage};

pub fn open(
    state: Arc<ProviderState>,
    body: RequestBody,
) -> impl Stream<Item = Result<StreamEvent, Error>> + Send {
    async_stream::try_stream! {
        let url = state.config.url();
        tracing::debug!(%url, format = ?state.config.format, "opening completion stream");

        let mut req = state.client.post(&url);
        if !state.config.api_key.is_empty() {
            req = req.header("Authorization", format!("Bearer {}", state.config.api_key));
        }
        for (k, v) in &state.config.extra_headers {
            req = req.header(k, v);
        }

        let resp = req
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
        let mut mapper = EventMapper::new(state.config.format);

        while let Some(event) = sse.next().await {
            match event {
                Ok(event) => {
                    for stream_event in mapper.map_event(&event.event, &event.data)? {
                        yield stream_event;
                    }
                    if mapper.is_done() {
                        break;
                    }
                }
                Err(e) => {
                    Err(Error::Sse(e.to_string()))?;
                }
            }
        }

        if let Some(finish) = mapper.finish() {
            yield finish;
        }
    }
}

// ---------------------------------------------------------------------------
// Event mapper
// ---------------------------------------------------------------------------

/// Stateful translation of raw SSE events into [`StreamEvent`]s.
///
/// Chat Completions spreads the finish reason and usage across several
/// chunks before `[DONE]`, so both are buffered until the stream ends.
pub(crate) struct EventMapper {
    format: WireFormat,
    finish_reason: Option<FinishReason>,
    usage: Option<Usage>,
    finished: bool,
}

impl EventMapper {
    pub(crate) fn new(format: WireFormat) -> Self {
        Self {
            format,
            finish_reason: None,
            usage: None,
            finished: false,
        }
    }

    pub(crate) fn is_done(&self) -> bool {
        self.finished
    }

    pub(crate) fn map_event(
        &mut self,
        event_type: &str,
        data: &str,
    ) -> Result<Vec<StreamEvent>, Error> {
        if self.finished {
            return Ok(Vec::new());
        }
        match self.format {
            WireFormat::Responses => self.map_responses_event(event_type, data),
            WireFormat::ChatCompletions => self.map_chat_chunk(data),
        }
    }

    /// Emit the terminal `Finish` event if the stream ended without one.
    pub(crate) fn finish(&mut self) -> Option<StreamEvent> {
        if self.finished {
            return None;
        }
        self.finished = true;
        Some(StreamEvent::Finish {
            reason: self.finish_reason.take().unwrap_or(FinishReason::Stop),
            usage: self.usage.take(),
        })
    }

    fn map_responses_event(
        &mut self,
        event_type: &str,
        data: &str,
    ) -> Result<Vec<StreamEvent>, Error> {
        match event_type {
            "response.output_text.delta" => {
                let parsed: OutputTextDelta = serde_json::from_str(data)?;
                Ok(vec![StreamEvent::TextDelta(parsed.delta)])
            }

            "response.completed" | "response.incomplete" => {
                let parsed: ResponseCompleted = serde_json::from_str(data)?;
                let response = parsed.response;
                self.usage = response.usage.map(|u| Usage {
                    input_tokens: u.input_tokens,
                    output_tokens: u.output_tokens,
                    cached_tokens: u.input_tokens_details.and_then(|d| d.cached_tokens),
                });
                let incomplete_reason = response
                    .incomplete_details
                    .and_then(|d| d.reason)
                    .filter(|_| response.status.as_deref() == Some("incomplete"));
                self.finish_reason = Some(match incomplete_reason.as_deref() {
                    None => FinishReason::Stop,
                    Some("max_output_tokens") => FinishReason::Length,
                    Some("content_filter") => FinishReason::ContentFilter,
                    Some(other) => FinishReason::Other(other.to_string()),
                });
                Ok(self.finish().into_iter().collect())
            }

            "response.failed" | "error" => {
                self.finished = true;
                Ok(vec![StreamEvent::Error(data.to_string())])
            }

            // Events we don't need: response.created, response.in_progress,
            // response.output_item.added/done, response.content_part.*, etc.
            _ => Ok(Vec::new()),
        }
    }

    fn map_chat_chunk(&mut self, data: &str) -> Result<Vec<StreamEvent>, Error> {
        let data = data.trim();
        if data.is_empty() {
            return Ok(Vec::new());
        }
        if data == "[DONE]" {
            return Ok(self.finish().into_iter().collect());
        }

        let chunk: ChatCompletionChunk = serde_json::from_str(data)?;
        if let Some(error) = chunk.error {
            self.finished = true;
            return Ok(vec![StreamEvent::Error(error.to_string())]);
        }

        if let Some(u) = chunk.usage {
            self.usage = Some(Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
                cached_tokens: None,
            });
        }

        let mut events = Vec::new();
        for choice in chunk.choices {
            if let Some(content) = choice.delta.content
                && !content.is_empty()
            {
                events.push(StreamEvent::TextDelta(content));
            }
            if let Some(reason) = choice.finish_reason {
                self.finish_reason = Some(match reason.as_str() {
                    "stop" => FinishReason::Stop,
                    "length" => FinishReason::Length,
                    "content_filter" => FinishReason::ContentFilter,
                    other => FinishReason::Other(other.to_string()),
                });
            }
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn responses_events_map_to_deltas_and_finish() {
        let mut mapper = EventMapper::new(WireFormat::Responses);

        let ignored = mapper
            .map_event("response.created", r#"{"response":{}}"#)
            .unwrap();
        assert!(ignored.is_empty());

        let delta = mapper
            .map_event("response.output_text.delta", r##"{"delta":"# Semana 1"}"##)
            .unwrap();
        assert_eq!(delta, vec![StreamEvent::TextDelta("# Semana 1".into())]);

        let done = mapper
            .map_event(
                "response.completed",
                r#"{"response":{"status":"completed","usage":{"input_tokens":12,"output_tokens":3}}}"#,
            )
            .unwrap();
        assert_eq!(
            done,
            vec![StreamEvent::Finish {
                reason: FinishReason::Stop,
                usage: Some(Usage {
                    input_tokens: 12,
                    output_tokens: 3,
                    cached_tokens: None,
                }),
            }]
        );
        assert!(mapper.is_done());
        assert_eq!(mapper.finish(), None);
    }

    #[test]
    fn responses_incomplete_maps_to_length() {
        let mut mapper = EventMapper::new(WireFormat::Responses);
        let done = mapper
            .map_event(
                "response.incomplete",
                r#"{"response":{"status":"incomplete","incomplete_details":{"reason":"max_output_tokens"},"usage":null}}"#,
            )
            .unwrap();
        assert!(matches!(
            done.as_slice(),
            [StreamEvent::Finish {
                reason: FinishReason::Length,
                usage: None
            }]
        ));
    }

    #[test]
    fn responses_error_event_is_surfaced() {
        let mut mapper = EventMapper::new(WireFormat::Responses);
        let events = mapper
            .map_event("error", r#"{"message":"rate limited"}"#)
            .unwrap();
        assert!(matches!(events.as_slice(), [StreamEvent::Error(m)] if m.contains("rate limited")));
        assert!(mapper.is_done());
    }

    #[test]
    fn chat_chunks_buffer_finish_until_done() {
        let mut mapper = EventMapper::new(WireFormat::ChatCompletions);

        let first = mapper
            .map_event("message", r#"{"choices":[{"delta":{"role":"assistant"}}]}"#)
            .unwrap();
        assert!(first.is_empty());

        let text = mapper
            .map_event("message", r#"{"choices":[{"delta":{"content":"Hola"}}]}"#)
            .unwrap();
        assert_eq!(text, vec![StreamEvent::TextDelta("Hola".into())]);

        let last = mapper
            .map_event(
                "message",
                r#"{"choices":[{"delta":{},"finish_reason":"length"}]}"#,
            )
            .unwrap();
        assert!(last.is_empty());

        let usage = mapper
            .map_event(
                "message",
                r#"{"choices":[],"usage":{"prompt_tokens":9,"completion_tokens":2}}"#,
            )
            .unwrap();
        assert!(usage.is_empty());

        let done = mapper.map_event("message", "[DONE]").unwrap();
        assert_eq!(
            done,
            vec![StreamEvent::Finish {
                reason: FinishReason::Length,
                usage: Some(Usage {
                    input_tokens: 9,
                    output_tokens: 2,
                    cached_tokens: None,
                }),
            }]
        );
        assert!(mapper.is_done());
    }

    #[test]
    fn chat_stream_without_done_still_finishes() {
        let mut mapper = EventMapper::new(WireFormat::ChatCompletions);
        mapper
            .map_event("message", r#"{"choices":[{"delta":{"content":"x"}}]}"#)
            .unwrap();
        assert!(matches!(
            mapper.finish(),
            Some(StreamEvent::Finish {
                reason: FinishReason::Stop,
                ..
            })
        ));
    }

    #[test]
    fn chat_error_payload_is_surfaced() {
        let mut mapper = EventMapper::new(WireFormat::ChatCompletions);
        let events = mapper
            .map_event("message", r#"{"error":{"message":"model not loaded"}}"#)
            .unwrap();
        assert!(matches!(events.as_slice(), [StreamEvent::Error(m)] if m.contains("model not loaded")));
    }
}
