use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::ConversationTurn;

/// A generative model reachable with a single request.
///
/// Implementations make exactly one attempt per call; retrying is the
/// orchestrator's job.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Model identifier, for logs.
    fn model(&self) -> &str;

    /// Replay `history` (oldest first), append `prompt`, return the raw reply.
    async fn generate(&self, history: &[ConversationTurn], prompt: &str) -> AppResult<String>;
}
