//! # tutr-core
//!
//! Turns a student's chat history into a streamed study plan:
//!
//! - [`normalize`] flattens chats into canonical messages,
//! - [`BackendSelector`] resolves the local or remote model,
//! - [`GenerationSession`] owns one streaming generation and its state.
//!
//! ```ignore
//! let selector = BackendSelector::new(config).with_local_model(model);
//! let mut session = GenerationSession::new(selector);
//! session.start(chats)?;
//! while let Some(event) = session.next_event().await {
//!     // render event
//! }
//! let plan = session.finished_plan();
//! ```

pub mod backend;
pub mod chat;
pub mod error;
pub mod event;
pub mod generation;
pub mod normalize;
pub mod plan;
pub mod profile;
pub mod range;
pub mod sampler;

pub use backend::{BackendConfig, BackendHandle, BackendMode, BackendSelector, RemoteFactory};
pub use chat::{ChatSession, ChatTurn, USER_SPEAKER};
pub use error::{Error, Result};
pub use event::GenerationEvent;
pub use generation::{GenerationInput, GenerationSession, GenerationSnapshot, GenerationState};
pub use normalize::normalize;
pub use plan::{DEFAULT_INSTRUCTIONS, FinishedPlan, UNTITLED_PLAN, derive_title};
pub use profile::{ApiFormat, ApiTemplate, ConnectionProfile};
pub use range::{DateRange, RangePreset};
pub use sampler::{SamplerConfig, SamplerField, SamplerPreset};
