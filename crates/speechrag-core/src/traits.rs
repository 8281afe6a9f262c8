use async_trait::async_trait;

use crate::error::Result;
use crate::types::RetrievalResult;

/// Text → vector capability. Implementations may be slow; callers in async
/// code run them on the blocking pool.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the model (e.g. `hash:d384`).
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed_text(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

/// Prompt → free text capability.
#[async_trait]
pub trait Answerer: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;

    /// Checked once during initialization, before the service reports ready.
    async fn ready(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Nearest-neighbour lookup over stored chunk vectors.
pub trait VectorSearch: Send + Sync {
    fn dim(&self) -> usize;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn search_vec(&self, query_vec: &[f32], k: usize) -> Result<RetrievalResult>;
}
