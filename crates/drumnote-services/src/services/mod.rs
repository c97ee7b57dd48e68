pub mod insights;
pub mod openai;
pub mod pattern;

pub use insights::{DrumInsightService, Insight};
pub use openai::{ChatProvider, OpenAiService};
pub use pattern::{PatternContext, PatternEvent};
