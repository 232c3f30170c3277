//! Conversation and attempt data models.
//!
//! A session accumulates [`ConversationTurn`]s; each question produces a
//! [`QueryOutcome`] listing every [`QueryAttempt`] made for it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::query::QueryResult;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Role name as understood by chat-completion APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    /// A question asked by the user.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// SQL produced by the model.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// How a single attempt ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success { row_count: usize },
    ExecutionFailed { message: String },
    GenerationFailed { message: String },
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Error message for failed attempts.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::ExecutionFailed { message } | Self::GenerationFailed { message } => {
                Some(message)
            }
        }
    }
}

/// One iteration of the generate → extract → execute cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAttempt {
    /// 1-based
    pub number: u32,
    /// Absent when generation failed before any text came back
    pub sql: Option<String>,
    pub outcome: AttemptOutcome,
    pub elapsed_ms: u64,
}

/// Everything that happened while answering one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub question: String,
    pub attempts: Vec<QueryAttempt>,
    /// `None` once the attempt budget is spent without success
    pub result: Option<QueryResult>,
}

impl QueryOutcome {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            attempts: Vec::new(),
            result: None,
        }
    }

    /// True when every attempt failed.
    ///
    /// A successful query that returned zero rows is not exhausted.
    pub fn is_exhausted(&self) -> bool {
        self.result.is_none()
    }

    /// SQL of the successful attempt, if any.
    pub fn final_sql(&self) -> Option<&str> {
        self.attempts
            .iter()
            .rev()
            .find(|a| a.outcome.is_success())
            .and_then(|a| a.sql.as_deref())
    }
}
