//! The study-plan generation state machine.
//!
//! ```text
//! Idle ──start──▶ Generating ──▶ Completed | Cancelled | Failed
//!                     ▲                       │
//!                     └─────────start─────────┘
//! ```
//!
//! The session owns the in-flight backend stream and is driven from a
//! single task: [`GenerationSession::next_event`] pulls the next backend
//! event and applies it, so chunk delivery interleaves with
//! [`GenerationSession::cancel`] instead of racing it.

use tokio::sync::watch;
use tokio_stream::StreamExt;
use tutr_llm::Message;
use tutr_llm::response::EventStream;
use tutr_llm::stream::{FinishReason, StreamEvent, Usage};

use crate::backend::{BackendHandle, BackendSelector};
use crate::chat::ChatSession;
use crate::error::{Error, Result};
use crate::event::GenerationEvent;
use crate::normalize::normalize;
use crate::plan::{DEFAULT_INSTRUCTIONS, FinishedPlan};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GenerationState {
    #[default]
    Idle,
    Generating,
    Completed,
    Cancelled,
    Failed,
}

impl GenerationState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            GenerationState::Completed | GenerationState::Cancelled | GenerationState::Failed
        )
    }
}

/// What a generation is built from.
#[derive(Debug, Clone)]
pub enum GenerationInput {
    /// Chat history; normalized behind the session's system prompt.
    Sessions(Vec<ChatSession>),
    /// Messages sent as-is.
    Messages(Vec<Message>),
}

impl From<Vec<ChatSession>> for GenerationInput {
    fn from(sessions: Vec<ChatSession>) -> Self {
        GenerationInput::Sessions(sessions)
    }
}

impl From<Vec<Message>> for GenerationInput {
    fn from(messages: Vec<Message>) -> Self {
        GenerationInput::Messages(messages)
    }
}

/// Point-in-time view of a session, published to subscribers on every
/// change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationSnapshot {
    pub state: GenerationState,
    pub text: String,
    pub is_active: bool,
    pub error: Option<String>,
}

pub struct GenerationSession {
    selector: BackendSelector,
    system_prompt: String,
    state: GenerationState,
    text: String,
    error: Option<String>,
    usage: Option<Usage>,
    stream: Option<EventStream>,
    updates: watch::Sender<GenerationSnapshot>,
}

impl GenerationSession {
    pub fn new(selector: BackendSelector) -> Self {
        let (updates, _) = watch::channel(GenerationSnapshot::default());
        Self {
            selector,
            system_prompt: DEFAULT_INSTRUCTIONS.to_string(),
            state: GenerationState::Idle,
            text: String::new(),
            error: None,
            usage: None,
            stream: None,
            updates,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn state(&self) -> GenerationState {
        self.state
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_active(&self) -> bool {
        self.state == GenerationState::Generating
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Token usage reported by the last completed generation, if any.
    pub fn usage(&self) -> Option<&Usage> {
        self.usage.as_ref()
    }

    pub fn snapshot(&self) -> GenerationSnapshot {
        GenerationSnapshot {
            state: self.state,
            text: self.text.clone(),
            is_active: self.is_active(),
            error: self.error.clone(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<GenerationSnapshot> {
        self.updates.subscribe()
    }

    /// Begin a new generation.
    ///
    /// Rejected with [`Error::AlreadyGenerating`] while one is in flight,
    /// leaving the session untouched. A normalization or backend selection
    /// error moves the session to `Failed` and is returned; the previous
    /// text is kept and no backend is contacted.
    pub fn start(&mut self, input: impl Into<GenerationInput>) -> Result<()> {
        if self.is_active() {
            return Err(Error::AlreadyGenerating);
        }

        let prepared = self.prepare(input.into());
        let (backend, messages) = match prepared {
            Ok(prepared) => prepared,
            Err(err) => {
                tracing::warn!(error = %err, "study plan generation could not start");
                self.state = GenerationState::Failed;
                self.error = Some(err.to_string());
                self.publish();
                return Err(err);
            }
        };

        tracing::info!(
            mode = %backend.mode(),
            model = backend.model().model_id(),
            messages = messages.len(),
            "generating study plan"
        );
        self.text.clear();
        self.error = None;
        self.usage = None;
        self.stream = Some(backend.stream_completion(messages).events());
        self.state = GenerationState::Generating;
        self.publish();
        Ok(())
    }

    fn prepare(&self, input: GenerationInput) -> Result<(BackendHandle, Vec<Message>)> {
        let messages = match input {
            GenerationInput::Sessions(sessions) => normalize(&sessions, &self.system_prompt)?,
            GenerationInput::Messages(messages) => messages,
        };
        let backend = self.selector.select()?;
        Ok((backend, messages))
    }

    /// Append a chunk of plan text. Ignored unless generating.
    pub fn on_chunk(&mut self, delta: &str) {
        if !self.is_active() {
            tracing::debug!(state = ?self.state, "discarding late chunk");
            return;
        }
        self.text.push_str(delta);
        self.updates.send_modify(|snapshot| snapshot.text.push_str(delta));
    }

    pub fn on_complete(&mut self) {
        if !self.is_active() {
            return;
        }
        self.finish(GenerationState::Completed);
        tracing::info!(chars = self.text.len(), "study plan generated");
    }

    /// The backend failed. Text received so far is kept.
    pub fn on_error(&mut self, message: impl Into<String>) {
        if !self.is_active() {
            return;
        }
        let message = message.into();
        tracing::warn!(error = %message, "study plan generation failed");
        self.error = Some(message);
        self.finish(GenerationState::Failed);
    }

    /// Stop the in-flight generation. Does nothing unless generating.
    pub fn cancel(&mut self) {
        if !self.is_active() {
            return;
        }
        self.finish(GenerationState::Cancelled);
        tracing::info!("study plan generation cancelled");
    }

    /// Pull the next backend event and apply it.
    ///
    /// Returns `None` once the session is no longer generating.
    pub async fn next_event(&mut self) -> Option<GenerationEvent> {
        if !self.is_active() {
            return None;
        }
        let stream = self.stream.as_mut()?;
        let next = stream.next().await;

        let event = match next {
            Some(Ok(StreamEvent::TextDelta(delta))) => {
                self.on_chunk(&delta);
                GenerationEvent::Chunk { delta }
            }
            Some(Ok(StreamEvent::Finish { reason, usage })) => {
                self.usage = usage.clone();
                self.on_complete();
                GenerationEvent::Completed { reason, usage }
            }
            Some(Ok(StreamEvent::Error(error))) => {
                self.on_error(error.clone());
                GenerationEvent::Failed { error }
            }
            Some(Err(err)) => {
                let error = err.to_string();
                self.on_error(error.clone());
                GenerationEvent::Failed { error }
            }
            None => {
                self.on_complete();
                GenerationEvent::Completed {
                    reason: FinishReason::Stop,
                    usage: None,
                }
            }
        };
        Some(event)
    }

    /// Drive the stream until the session leaves `Generating` and return
    /// the final text.
    pub async fn run_to_end(&mut self) -> Result<&str> {
        while self.next_event().await.is_some() {}
        match self.state {
            GenerationState::Failed => Err(Error::BackendStream(
                self.error.clone().unwrap_or_default(),
            )),
            _ => Ok(&self.text),
        }
    }

    /// The finished plan, available only after a completed generation.
    pub fn finished_plan(&self) -> Option<FinishedPlan> {
        (self.state == GenerationState::Completed).then(|| FinishedPlan::from_content(&self.text))
    }

    fn finish(&mut self, state: GenerationState) {
        self.stream = None;
        self.state = state;
        self.publish();
    }

    fn publish(&self) {
        self.updates.send_replace(self.snapshot());
    }
}
