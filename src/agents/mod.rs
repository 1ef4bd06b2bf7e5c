pub mod insight;
pub mod intent;
pub mod prompts;
pub mod sql;

pub use insight::{ChartKind, Insight, InsightAgent};
pub use intent::IntentAgent;
pub use prompts::{PromptName, PromptStore};
pub use sql::SqlAgent;
