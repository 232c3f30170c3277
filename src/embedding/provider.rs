use async_trait::async_trait;

use crate::error::{AppError, AppResult};

/// Turns text into fixed-length vectors.
///
/// Implementations must return exactly one vector per input, each of
/// length [`dimensions`](EmbeddingProvider::dimensions).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    fn dimensions(&self) -> usize;

    /// Batch-encode `texts`, preserving order.
    async fn embed(&self, texts: &[&str]) -> AppResult<Vec<Vec<f32>>>;

    /// Encode a single query string the same way as a batch entry.
    async fn embed_one(&self, text: &str) -> AppResult<Vec<f32>> {
        self.embed(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::embedding(format!("{} returned no embedding", self.name())))
    }
}
