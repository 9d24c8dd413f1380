//! Extension point for per-image feature embeddings

use rdm_core::{Frame, Result};

/// Consumer of newly ingested images, e.g. a feature-embedding cache
///
/// The data manager only forwards ingested frames; what the provider
/// computes from them is its own concern.
pub trait EmbeddingProvider: Send {
    fn add_image(&mut self, index: usize, frame: &Frame) -> Result<()>;
}
