//! Generative model access.

pub mod chat;
pub mod client;

pub use chat::{ChatCompletionsClient, ChatCompletionsConfig};
pub use client::GenerationClient;
