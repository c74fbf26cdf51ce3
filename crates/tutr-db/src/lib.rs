mod database;
pub mod chats;
pub mod error;
mod migration;
pub mod study_plans;
pub mod store;

pub use chats::{Chat, ChatEntry, ChatWithEntries, Chats, NewChatEntry};
pub use error::{Error, Result};
pub use store::Store;
pub use study_plans::{StudyPlan, StudyPlans};
