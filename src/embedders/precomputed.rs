//! Precomputed embedding store.
//!
//! Serves vectors produced offline by a real model, keyed by the exact text.
//! The store file is JSON:
//!
//! ```json
//! {
//!   "model": "bge-small-en-v1.5",
//!   "dimensions": 384,
//!   "vectors": { "some text": [0.1, 0.2, ...] }
//! }
//! ```
//!
//! Lookups are exact; a text missing from the store is an error, not a zero
//! vector, so a mismatched store and dataset fail loudly.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::traits::{EmbedderBackend, EmbedderInfo};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EmbeddingsFile {
    model: String,
    dimensions: usize,
    vectors: HashMap<String, Vec<f32>>,
}

/// Backend serving precomputed vectors from memory.
pub struct PrecomputedBackend {
    info: EmbedderInfo,
    vectors: HashMap<String, Vec<f32>>,
}

impl PrecomputedBackend {
    /// Load a store file and check every vector against the declared
    /// dimensionality.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read embeddings file: {:?}", path))?;
        let file: EmbeddingsFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse embeddings file: {:?}", path))?;
        Self::from_vectors(file.model, file.dimensions, file.vectors)
    }

    pub fn from_vectors(
        model: String,
        dimensions: usize,
        vectors: HashMap<String, Vec<f32>>,
    ) -> Result<Self> {
        if dimensions == 0 {
            bail!("embedding dimensionality must be positive");
        }
        for (text, vector) in &vectors {
            if vector.len() != dimensions {
                bail!(
                    "vector for {:?} has {} dimensions, expected {}",
                    truncate(text),
                    vector.len(),
                    dimensions
                );
            }
        }
        Ok(Self {
            info: EmbedderInfo {
                name: model,
                dimensions,
            },
            vectors,
        })
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

#[async_trait::async_trait]
impl EmbedderBackend for PrecomputedBackend {
    fn info(&self) -> &EmbedderInfo {
        &self.info
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        match self.vectors.get(text) {
            Some(vector) => Ok(vector.clone()),
            None => bail!(
                "no precomputed embedding for {:?}; regenerate the store for this dataset",
                truncate(text)
            ),
        }
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() > 60 {
        let head: String = text.chars().take(60).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
