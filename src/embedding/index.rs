use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::provider::EmbeddingProvider;
use crate::error::{AppError, AppResult};
use crate::models::SchemaFragment;

/// Fragments returned per lookup unless the caller asks otherwise.
pub const DEFAULT_TOP_K: usize = 5;

/// A fragment paired with its embedding.
#[derive(Debug, Clone)]
pub struct EmbeddingRecord {
    pub fragment: SchemaFragment,
    pub vector: Vec<f32>,
}

/// A retrieved fragment with its similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredFragment {
    pub fragment: SchemaFragment,
    pub score: f32,
}

/// In-memory nearest-neighbour index over schema fragments.
///
/// Built once per connection; never updated in place.
pub struct EmbeddingIndex {
    provider: Arc<dyn EmbeddingProvider>,
    records: Vec<EmbeddingRecord>,
    fingerprint: String,
}

impl std::fmt::Debug for EmbeddingIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingIndex")
            .field("provider", &self.provider.name())
            .field("records", &self.records.len())
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

impl EmbeddingIndex {
    /// Embed every fragment with `provider`.
    pub async fn build(
        provider: Arc<dyn EmbeddingProvider>,
        fragments: Vec<SchemaFragment>,
    ) -> AppResult<Self> {
        let dimensions = provider.dimensions();
        if dimensions == 0 {
            return Err(AppError::embedding(format!(
                "Embedding model '{}' reports zero dimensions",
                provider.name()
            )));
        }

        let fingerprint = fingerprint(&fragments);

        let vectors = if fragments.is_empty() {
            Vec::new()
        } else {
            let texts: Vec<&str> = fragments.iter().map(|f| f.text.as_str()).collect();
            provider.embed(&texts).await?
        };

        if vectors.len() != fragments.len() {
            return Err(AppError::embedding(format!(
                "Embedding model '{}' returned {} vectors for {} fragments",
                provider.name(),
                vectors.len(),
                fragments.len()
            )));
        }
        for vector in &vectors {
            check_dimensions(vector, dimensions)?;
        }

        let records: Vec<EmbeddingRecord> = fragments
            .into_iter()
            .zip(vectors)
            .map(|(fragment, vector)| EmbeddingRecord { fragment, vector })
            .collect();

        info!(
            provider = provider.name(),
            fragments = records.len(),
            dimensions = dimensions,
            "Built embedding index"
        );

        Ok(Self {
            provider,
            records,
            fingerprint,
        })
    }

    /// The `k` fragments most similar to `text`, nearest first.
    pub async fn query(&self, text: &str, k: usize) -> AppResult<Vec<SchemaFragment>> {
        Ok(self
            .query_scored(text, k)
            .await?
            .into_iter()
            .map(|s| s.fragment)
            .collect())
    }

    /// Like [`query`](Self::query), keeping similarity scores.
    pub async fn query_scored(&self, text: &str, k: usize) -> AppResult<Vec<ScoredFragment>> {
        if k == 0 || self.records.is_empty() {
            return Ok(Vec::new());
        }
        let vector = self.provider.embed_one(text).await?;
        let results = self.search(&vector, k)?;
        debug!(k = k, returned = results.len(), "Similarity lookup");
        Ok(results)
    }

    /// Rank stored fragments against a query vector.
    ///
    /// Ties keep insertion order.
    pub fn search(&self, vector: &[f32], k: usize) -> AppResult<Vec<ScoredFragment>> {
        check_dimensions(vector, self.dimensions())?;

        let mut scored: Vec<(usize, f32)> = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (i, cosine_similarity(vector, &r.vector)))
            .collect();
        // Stable sort
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, score)| ScoredFragment {
                fragment: self.records[i].fragment.clone(),
                score,
            })
            .collect())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    pub fn records(&self) -> &[EmbeddingRecord] {
        &self.records
    }

    /// SHA-256 of the fragment texts the index was built from.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn check_dimensions(vector: &[f32], expected: usize) -> AppResult<()> {
    if vector.len() != expected {
        return Err(AppError::embedding(format!(
            "Vector has {} dimensions, index expects {}",
            vector.len(),
            expected
        )));
    }
    Ok(())
}

/// Cosine similarity; zero when either vector has no magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Hex SHA-256 over fragment texts, newline separated.
pub fn fingerprint(fragments: &[SchemaFragment]) -> String {
    let mut hasher = Sha256::new();
    for fragment in fragments {
        hasher.update(fragment.text.as_bytes());
        hasher.update(b"\n");
    }
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;
    use async_trait::async_trait;

    /// Embeds known words onto fixed axes.
    struct AxisEmbedder;

    #[async_trait]
    impl EmbeddingProvider for AxisEmbedder {
        fn name(&self) -> &str {
            "axis"
        }

        fn dimensions(&self) -> usize {
            3
        }

        async fn embed(&self, texts: &[&str]) -> AppResult<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    if t.contains("orders") {
                        vec![1.0, 0.0, 0.0]
                    } else if t.contains("customers") {
                        vec![0.0, 1.0, 0.0]
                    } else if t.contains("both") {
                        vec![1.0, 1.0, 0.0]
                    } else {
                        vec![0.0, 0.0, 1.0]
                    }
                })
                .collect())
        }
    }

    /// Reports one dimension count but returns another.
    struct BrokenEmbedder;

    #[async_trait]
    impl EmbeddingProvider for BrokenEmbedder {
        fn name(&self) -> &str {
            "broken"
        }

        fn dimensions(&self) -> usize {
            4
        }

        async fn embed(&self, texts: &[&str]) -> AppResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    fn fragments(texts: &[&str]) -> Vec<SchemaFragment> {
        texts
            .iter()
            .map(|t| SchemaFragment::column("t", *t))
            .collect()
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_fingerprint_is_stable_and_sensitive() {
        let a = fingerprint(&fragments(&["x", "y"]));
        let b = fingerprint(&fragments(&["x", "y"]));
        let c = fingerprint(&fragments(&["x", "z"]));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_query_orders_nearest_first() {
        let index = EmbeddingIndex::build(
            Arc::new(AxisEmbedder),
            fragments(&["other", "customers.id", "orders.id"]),
        )
        .await
        .unwrap();

        let results = index.query_scored("orders", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].fragment.text, "orders.id");
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let index = EmbeddingIndex::build(
            Arc::new(AxisEmbedder),
            fragments(&["other", "orders.a", "orders.b", "orders.c"]),
        )
        .await
        .unwrap();

        let results = index.query("orders", 3).await.unwrap();
        let texts: Vec<&str> = results.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["orders.a", "orders.b", "orders.c"]);
    }

    #[tokio::test]
    async fn test_query_never_exceeds_k_or_index_size() {
        let index = EmbeddingIndex::build(
            Arc::new(HashingEmbedder::default()),
            fragments(&["a", "b", "c"]),
        )
        .await
        .unwrap();

        assert_eq!(index.query("a", 2).await.unwrap().len(), 2);
        assert_eq!(index.query("a", 10).await.unwrap().len(), 3);
        assert!(index.query("a", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_index_returns_nothing() {
        let index = EmbeddingIndex::build(Arc::new(AxisEmbedder), Vec::new())
            .await
            .unwrap();
        assert!(index.is_empty());
        assert!(index.query("orders", DEFAULT_TOP_K).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_embedding_error() {
        let result = EmbeddingIndex::build(Arc::new(BrokenEmbedder), fragments(&["x"])).await;
        assert!(matches!(result, Err(AppError::Embedding { .. })));

        let index = EmbeddingIndex::build(Arc::new(AxisEmbedder), fragments(&["x"]))
            .await
            .unwrap();
        assert!(matches!(
            index.search(&[1.0, 0.0], 1),
            Err(AppError::Embedding { .. })
        ));
    }
}
