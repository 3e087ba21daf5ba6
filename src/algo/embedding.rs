//! Document embeddings for similarity grouping.
//!
//! Every planning level embeds all of its documents in a single batch call,
//! so model cost is O(n) while the pairwise comparison stays in memory.

use std::hash::Hasher;

use rayon::prelude::*;
use siphasher::sip::SipHasher13;

use crate::algo::tokenizer;
use crate::error::Result;

/// Produces one dense vector per input text.
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts. The output has the same length and order as `texts`.
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Short human-readable model name, used in logs.
    fn name(&self) -> &str;
}

/// Feature-hashed term-frequency embeddings.
///
/// Each token is hashed into one of `dim` buckets. Texts sharing vocabulary
/// point in similar directions; texts with no tokens embed to the zero vector.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim];
        for token in tokenizer::tokenize(text) {
            let mut hasher = SipHasher13::new_with_keys(0, 0);
            hasher.write(token.as_bytes());
            let bucket = (hasher.finish() % self.dim as u64) as usize;
            vector[bucket] += 1.0;
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.par_iter().map(|t| self.embed_one(t)).collect())
    }

    fn name(&self) -> &str {
        "feature-hashing"
    }
}

/// Sentence-transformer embeddings (paraphrase-MiniLM-L6-v2) via fastembed.
#[cfg(feature = "fastembed")]
pub struct FastEmbedder {
    model: fastembed::TextEmbedding,
}

#[cfg(feature = "fastembed")]
impl FastEmbedder {
    /// Load the model, downloading it into the fastembed cache on first use.
    pub fn new() -> Result<Self> {
        use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

        let options = InitOptions::new(EmbeddingModel::ParaphraseMLMiniLML6V2)
            .with_show_download_progress(false);
        let model = TextEmbedding::try_new(options).map_err(|e| {
            crate::error::FoldersError::Embedding(format!("Failed to initialize embedding model: {e}"))
        })?;
        tracing::info!("sentence-transformer embedding model loaded");
        Ok(Self { model })
    }
}

#[cfg(feature = "fastembed")]
impl Embedder for FastEmbedder {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        self.model.embed(texts.to_vec(), None).map_err(|e| {
            crate::error::FoldersError::Embedding(format!("Failed to generate batch embeddings: {e}"))
        })
    }

    fn name(&self) -> &str {
        "paraphrase-MiniLM-L6-v2"
    }
}
