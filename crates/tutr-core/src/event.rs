use tutr_llm::stream::{FinishReason, Usage};

/// Events emitted while a study plan streams in.
///
/// A frontend consumes these to update its view. The events form a protocol:
///
/// ```text
/// (Chunk)*
/// Completed | Failed
/// ```
///
/// A cancelled session emits nothing further.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    /// A chunk of plan text arrived and was appended.
    Chunk { delta: String },

    /// The backend finished; the accumulated text is the plan.
    Completed {
        reason: FinishReason,
        usage: Option<Usage>,
    },

    /// The backend reported an error. Text received so far is kept.
    Failed { error: String },
}
