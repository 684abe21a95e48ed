//! Embedder trait abstraction.
//!
//! The harness consumes embeddings through this seam; how they are produced
//! (local ONNX model, remote API, precomputed store) is a backend detail.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Identity of an embedder backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedderInfo {
    /// Human-readable model name, recorded in reports.
    pub name: String,
    /// Vector dimensionality.
    pub dimensions: usize,
}

/// Unified interface for embedding backends.
///
/// Implementations must return vectors of the advertised dimensionality for
/// every input text.
#[async_trait::async_trait]
pub trait EmbedderBackend: Send + Sync {
    /// Backend identity.
    fn info(&self) -> &EmbedderInfo;

    fn name(&self) -> &str {
        &self.info().name
    }

    fn dimensions(&self) -> usize {
        self.info().dimensions
    }

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts. The default embeds sequentially; backends
    /// with native batching should override.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }
}
