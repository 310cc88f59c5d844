pub mod assistant;
pub mod prompts;

#[cfg(feature = "gemini")]
pub mod client;
#[cfg(feature = "gemini")]
pub mod types;

pub use assistant::*;
pub use prompts::{build_insight_prompt, build_question_prompt};

#[cfg(feature = "gemini")]
pub use client::GeminiClient;
