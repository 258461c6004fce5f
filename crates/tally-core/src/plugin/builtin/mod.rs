//! Built-in audience plugins shipped with the engine.

pub mod json;
pub mod markdown;

pub use json::JsonAudience;
pub use markdown::MarkdownAudience;
