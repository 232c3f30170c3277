//! In-process embedder based on feature hashing.
//!
//! Each text is split into lower-cased alphanumeric words (underscores and
//! camel-case boundaries separate words). Every word and every character
//! trigram of `#word#` is hashed into a signed bucket; the resulting vector is
//! L2-normalized. Trigrams let `customer` match `customers` or `cust_id`.

use async_trait::async_trait;

use super::provider::EmbeddingProvider;
use crate::error::{AppError, AppResult};

/// Default vector length.
pub const DEFAULT_DIMENSIONS: usize = 384;

const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    /// Fails when `dimensions` is zero.
    pub fn new(dimensions: usize) -> AppResult<Self> {
        if dimensions == 0 {
            return Err(AppError::embedding(
                "Embedding dimensions must be greater than zero",
            ));
        }
        Ok(Self { dimensions })
    }

    /// Embed one text synchronously.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for word in tokenize(text) {
            self.add_feature(&mut vector, word.as_bytes(), WORD_WEIGHT);

            let padded: Vec<char> = format!("#{}#", word).chars().collect();
            for trigram in padded.windows(3) {
                let gram: String = trigram.iter().collect();
                self.add_feature(&mut vector, gram.as_bytes(), TRIGRAM_WEIGHT);
            }
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }

    fn add_feature(&self, vector: &mut [f32], feature: &[u8], weight: f32) {
        let hash = fnv1a(feature);
        let bucket = (hash % self.dimensions as u64) as usize;
        // High bit picks the sign so collisions tend to cancel out
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_DIMENSIONS,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, texts: &[&str]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// Split into lower-cased words on non-alphanumerics and camel-case humps.
fn tokenize(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for ch in text.chars() {
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_numeric();
        current.extend(ch.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    bytes.iter().fold(OFFSET, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(PRIME)
    })
}
