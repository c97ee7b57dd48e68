//! Drumnote Services
//!
//! External integrations used by the API layer. Currently this is the OpenAI
//! chat-completions client and the drum-pattern insight service built on top of
//! it, which degrades to deterministic payloads when the integration is disabled.

pub mod services;

pub use services::{
    ChatProvider, DrumInsightService, Insight, OpenAiService, PatternContext, PatternEvent,
};
