use crate::error::Error;
use crate::stream::{FinishReason, StreamEvent, Usage};
use futures::Stream;
use std::pin::Pin;
use tokio_stream::StreamExt;

pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, Error>> + Send>>;

/// A live streaming response from a completion backend.
///
/// Consume it event-by-event via [`events()`](Response::events), or collect
/// the full result with [`into_result()`](Response::into_result). Dropping
/// it abandons the in-flight request.
pub struct Response {
    inner: EventStream,
}

impl Response {
    pub fn new(stream: impl Stream<Item = Result<StreamEvent, Error>> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(stream),
        }
    }

    /// A response that fails immediately with `error`.
    pub fn failed(error: Error) -> Self {
        Self::new(futures::stream::once(async move { Err(error) }))
    }

    /// Consume the response as an async stream of events.
    pub fn events(self) -> EventStream {
        self.inner
    }

    /// Collect the full streamed response into a single result.
    pub async fn into_result(self) -> Result<GenerateResult, Error> {
        let mut text = String::new();
        let mut finish_reason = None;
        let mut usage = None;

        let mut stream = self.inner;
        while let Some(event) = stream.next().await {
            match event? {
                StreamEvent::TextDelta(delta) => text.push_str(&delta),
                StreamEvent::Finish { reason, usage: u } => {
                    finish_reason = Some(reason);
                    usage = u;
                }
                StreamEvent::Error(message) => return Err(Error::Other(message)),
            }
        }

        Ok(GenerateResult {
            text,
            finish_reason: finish_reason.unwrap_or(FinishReason::Stop),
            usage: usage.unwrap_or_default(),
        })
    }
}

/// The collected result of a completion.
#[derive(Debug, Clone)]
pub struct GenerateResult {
    pub text: String,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}
