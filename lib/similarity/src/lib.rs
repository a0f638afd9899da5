//! # vialert Similarity
//!
//! Embedding-based accident similarity: ranking, ingestion and LLM alerts.
//!
//! The engine depends on two opaque capabilities, [`EmbeddingClient`] and
//! [`CompletionClient`], so it can run against OpenAI-compatible services
//! ([`openai`]) or deterministic stand-ins in tests.

pub mod client;
pub mod engine;
pub mod openai;
pub mod prompt;

pub use client::{CompletionClient, CompletionOptions, EmbeddingClient};
pub use engine::{
    require_text, AccidentReport, EngineConfig, IngestOutcome, SimilarityEngine, TOP_K,
};
pub use openai::{OpenAiChatClient, OpenAiConfig, OpenAiEmbeddingClient};
pub use prompt::NO_NEARBY_ACCIDENTS;
