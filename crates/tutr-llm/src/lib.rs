pub mod error;
pub mod model;
pub mod request;
pub mod response;
pub mod stream;

pub use error::Error;
pub use model::{LanguageModel, LanguageModelBackend};
pub use request::{GenerateOptions, GenerateRequest, Message, RequestBuilder, Role, request};
pub use response::{GenerateResult, Response};
pub use stream::{FinishReason, StreamEvent, Usage};
