//! Chat-completion provider client for chat-relay
//!
//! The gateway talks to its upstream through the [`LLMProvider`] trait.
//! [`OpenAICompatClient`] implements it for any OpenAI-compatible
//! `/chat/completions` endpoint (Groq by default).

pub mod base;
pub mod openai;

pub use base::{LLMProvider, LLMResponse, Message, ProviderError, ProviderResult, Usage};
pub use openai::OpenAICompatClient;
