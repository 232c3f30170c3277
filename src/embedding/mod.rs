//! Semantic retrieval over schema fragments.
//!
//! - `provider`: the [`EmbeddingProvider`] seam
//! - `local`: on-device `fastembed` models (default)
//! - `hashing`: deterministic feature-hashing embedder for offline use and tests
//! - `openai`: OpenAI-compatible HTTP embedder
//! - `index`: [`EmbeddingIndex`] with cosine-similarity lookup

pub mod hashing;
pub mod index;
pub mod local;
pub mod openai;
pub mod provider;

pub use hashing::HashingEmbedder;
pub use index::{
    DEFAULT_TOP_K, EmbeddingIndex, EmbeddingRecord, ScoredFragment, cosine_similarity, fingerprint,
};
pub use local::{DEFAULT_LOCAL_MODEL, FastEmbedder};
pub use openai::OpenAiEmbedder;
pub use provider::EmbeddingProvider;
