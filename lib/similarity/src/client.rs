//! Model capabilities the engine depends on.
//!
//! Both are opaque request/response services. Implementations must be
//! `Send + Sync` so the engine can share them as `Arc<dyn ...>`.

use async_trait::async_trait;
use vialert_core::{Result, Vector};

/// Turns a batch of texts into embedding vectors.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed every text, returning one vector per input in the same order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vector>>;
}

/// Turns a prompt into a natural-language answer.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String>;
}

/// Sampling parameters sent with a completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub modalities: Vec<String>,
}

impl CompletionOptions {
    /// Near-deterministic, short, text-only output.
    pub fn advisory(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.001,
            max_tokens: 300,
            modalities: vec!["text".to_string()],
        }
    }
}
