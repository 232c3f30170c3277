//! On-device sentence embeddings through `fastembed` (ONNX Runtime).
//!
//! The model files are downloaded into the cache directory on first use and
//! loaded once per process. Encoding is CPU-bound, so both loading and
//! encoding run on the blocking thread pool.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use ::fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use async_trait::async_trait;
use tracing::{debug, info};

use super::provider::EmbeddingProvider;
use crate::error::{AppError, AppResult};

/// Model used when none is configured.
pub const DEFAULT_LOCAL_MODEL: &str = "all-minilm-l6-v2";

/// Supported model names.
pub const LOCAL_MODELS: &[&str] = &[
    "all-minilm-l6-v2",
    "all-minilm-l12-v2",
    "bge-small-en-v1.5",
    "bge-base-en-v1.5",
];

/// Resolve a configured model name (case-insensitive) to the `fastembed`
/// model and its output length.
pub fn resolve_model(name: &str) -> AppResult<(EmbeddingModel, usize)> {
    match name.trim().to_lowercase().as_str() {
        "all-minilm-l6-v2" => Ok((EmbeddingModel::AllMiniLML6V2, 384)),
        "all-minilm-l12-v2" => Ok((EmbeddingModel::AllMiniLML12V2, 384)),
        "bge-small-en-v1.5" => Ok((EmbeddingModel::BGESmallENV15, 384)),
        "bge-base-en-v1.5" => Ok((EmbeddingModel::BGEBaseENV15, 768)),
        _ => Err(AppError::configuration(format!(
            "Unknown local embedding model '{}' (supported: {})",
            name,
            LOCAL_MODELS.join(", ")
        ))),
    }
}

/// Embedder backed by a `fastembed` [`TextEmbedding`] model.
#[derive(Clone)]
pub struct FastEmbedder {
    name: String,
    dimensions: usize,
    model: Arc<Mutex<TextEmbedding>>,
}

impl std::fmt::Debug for FastEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedder")
            .field("name", &self.name)
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

impl FastEmbedder {
    /// Load (downloading if needed) the named model.
    ///
    /// An unknown name is a configuration error; a model that cannot be
    /// fetched or initialised is an embedding error.
    pub async fn load(model_name: &str, cache_dir: Option<PathBuf>) -> AppResult<Self> {
        let (model, dimensions) = resolve_model(model_name)?;
        let name = model_name.trim().to_lowercase();

        info!(model = %name, "Loading local embedding model");
        let mut options = InitOptions::new(model).with_show_download_progress(false);
        if let Some(dir) = cache_dir {
            options = options.with_cache_dir(dir);
        }

        let embedding = tokio::task::spawn_blocking(move || TextEmbedding::try_new(options))
            .await
            .map_err(|e| AppError::internal(format!("Embedding model loader panicked: {}", e)))?
            .map_err(|e| {
                AppError::embedding(format!(
                    "Failed to initialise local embedding model '{}': {}",
                    name, e
                ))
            })?;

        Ok(Self {
            name,
            dimensions,
            model: Arc::new(Mutex::new(embedding)),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, texts: &[&str]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let inputs: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        let expected = inputs.len();
        let model = Arc::clone(&self.model);

        let vectors = tokio::task::spawn_blocking(move || {
            model
                .lock()
                .map_err(|_| AppError::embedding("Local embedding model lock poisoned"))?
                .embed(inputs, None)
                .map_err(|e| AppError::embedding(format!("Failed to embed text: {}", e)))
        })
        .await
        .map_err(|e| AppError::internal(format!("Embedding task panicked: {}", e)))??;

        if vectors.len() != expected {
            return Err(AppError::embedding(format!(
                "{} returned {} embeddings for {} inputs",
                self.name,
                vectors.len(),
                expected
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimensions) {
            return Err(AppError::embedding(format!(
                "Unexpected embedding dimension: {} (expected {})",
                bad.len(),
                self.dimensions
            )));
        }

        debug!(model = %self.name, count = expected, "Embedded texts");
        Ok(vectors)
    }
}
