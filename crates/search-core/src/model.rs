//! The `ModelClient` contract: embedding and summarization, unified
//! across providers.
//!
//! Implementations live in `search-app` (OpenAI-style HTTPS, Vertex-style
//! HTTPS, and a deterministic in-process stub for tests/offline use).
//! This trait only fixes the shape; retry/backoff policy and transport
//! are provider concerns.

use async_trait::async_trait;

use crate::error::ModelError;

/// Produces summaries and embeddings for chunk content.
///
/// `dim()` must be stable for the lifetime of a client instance — the
/// `Store` uses it once, at schema init time, to size the vector column.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Dimensionality of vectors returned by `embed`.
    fn dim(&self) -> usize;

    /// Produce a short natural-language summary of `content`. `path` and
    /// `language` are provided as context for providers that want to
    /// mention them in the prompt; neither is required to appear in the
    /// summary itself.
    async fn summarize(&self, path: &str, language: &str, content: &str) -> Result<String, ModelError>;

    /// Embed `text` (typically a chunk's summary) into a dense vector of
    /// length `dim()`.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError>;
}
