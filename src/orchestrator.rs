//! The generate → extract → execute loop.
//!
//! Each attempt looks up schema context for the question, composes a prompt
//! with the full conversation history, asks the model for SQL and runs it.
//! A failed statement stays in history as an assistant turn, so the next
//! attempt sees what was already tried. Error text is logged and reported to
//! the observer but never sent back to the model.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::embedding::DEFAULT_TOP_K;
use crate::error::{AppError, AppResult};
use crate::extract::extract_sql;
use crate::llm::GenerationClient;
use crate::models::{AttemptOutcome, QueryAttempt, QueryOutcome, QueryResult};
use crate::prompt::{PromptComposer, PromptContext};
use crate::session::Session;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Receives attempt progress as it happens.
pub trait AttemptObserver: Send + Sync {
    fn attempt_started(&self, _number: u32, _max_attempts: u32) {}

    /// Called once per attempt, after its outcome is known.
    fn attempt_finished(&self, attempt: &QueryAttempt);
}

pub struct RetryOrchestrator {
    generator: Arc<dyn GenerationClient>,
    max_attempts: u32,
    top_k: usize,
    composer: PromptComposer,
    observer: Option<Arc<dyn AttemptObserver>>,
}

impl RetryOrchestrator {
    /// `max_attempts` must be at least 1.
    pub fn new(
        generator: Arc<dyn GenerationClient>,
        max_attempts: u32,
        top_k: usize,
    ) -> AppResult<Self> {
        if max_attempts == 0 {
            return Err(AppError::configuration("max_attempts must be at least 1"));
        }
        Ok(Self {
            generator,
            max_attempts,
            top_k,
            composer: PromptComposer::new(),
            observer: None,
        })
    }

    /// Five attempts, five retrieved fragments.
    pub fn with_defaults(generator: Arc<dyn GenerationClient>) -> Self {
        Self {
            generator,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            top_k: DEFAULT_TOP_K,
            composer: PromptComposer::new(),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn AttemptObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Answer `question` against `session`.
    ///
    /// Returns `Ok` with `result: None` when every attempt failed. Errors are
    /// reserved for failures the loop cannot absorb: retrieval, a lost
    /// connection, misconfiguration.
    pub async fn run(&self, session: &mut Session, question: &str) -> AppResult<QueryOutcome> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::invalid_input("Question is empty"));
        }

        let mut outcome = QueryOutcome::new(question);
        info!(
            session_id = %session.id(),
            question = %question,
            max_attempts = self.max_attempts,
            "Answering question"
        );

        for number in 1..=self.max_attempts {
            if let Some(observer) = &self.observer {
                observer.attempt_started(number, self.max_attempts);
            }

            let (attempt, result) = self.attempt(session, question, number).await?;

            match &attempt.outcome {
                AttemptOutcome::Success { row_count } => {
                    info!(attempt = number, rows = row_count, "Attempt succeeded");
                }
                failed => {
                    warn!(
                        attempt = number,
                        error = failed.error_message().unwrap_or_default(),
                        "Attempt failed"
                    );
                }
            }
            if let Some(observer) = &self.observer {
                observer.attempt_finished(&attempt);
            }
            outcome.attempts.push(attempt);

            if result.is_some() {
                outcome.result = result;
                return Ok(outcome);
            }
        }

        warn!(
            max_attempts = self.max_attempts,
            "Maximum attempts reached without a working query"
        );
        Ok(outcome)
    }

    async fn attempt(
        &self,
        session: &mut Session,
        question: &str,
        number: u32,
    ) -> AppResult<(QueryAttempt, Option<QueryResult>)> {
        let started = Instant::now();
        let elapsed_ms = |started: Instant| started.elapsed().as_millis() as u64;

        let retrieved = session.index().query(question, self.top_k).await?;
        let composed = self.composer.compose(PromptContext {
            question,
            full_schema: session.schema_text(),
            retrieved: &retrieved,
            history: session.history(),
            dialect: session.dialect(),
        });
        debug!(attempt = number, prompt = %composed.prompt, "Composed prompt");

        let raw = match self
            .generator
            .generate(composed.history, &composed.prompt)
            .await
        {
            Ok(raw) => raw,
            Err(e) if e.is_attempt_failure() => {
                let attempt = QueryAttempt {
                    number,
                    sql: None,
                    outcome: AttemptOutcome::GenerationFailed {
                        message: e.attempt_message(),
                    },
                    elapsed_ms: elapsed_ms(started),
                };
                return Ok((attempt, None));
            }
            Err(e) => return Err(e),
        };

        let sql = extract_sql(&raw);
        debug!(attempt = number, sql = %sql, "Extracted SQL");
        session.record_exchange(question, &sql);

        match session.database().execute(&sql).await {
            Ok(result) => {
                let attempt = QueryAttempt {
                    number,
                    sql: Some(sql),
                    outcome: AttemptOutcome::Success {
                        row_count: result.row_count(),
                    },
                    elapsed_ms: elapsed_ms(started),
                };
                Ok((attempt, Some(result)))
            }
            Err(e) if e.is_attempt_failure() => {
                let attempt = QueryAttempt {
                    number,
                    sql: Some(sql),
                    outcome: AttemptOutcome::ExecutionFailed {
                        message: e.attempt_message(),
                    },
                    elapsed_ms: elapsed_ms(started),
                };
                Ok((attempt, None))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::embedding::{EmbeddingProvider, HashingEmbedder};
    use crate::models::Role;
    use crate::testing::{ScriptedGenerator, StaticDatabase};

    async fn session(db: Arc<StaticDatabase>) -> Session {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::default());
        Session::new(db, provider).await.unwrap()
    }

    fn orchestrator(generator: Arc<ScriptedGenerator>) -> RetryOrchestrator {
        RetryOrchestrator::new(generator, 5, 3).unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        started: Mutex<Vec<u32>>,
        finished: Mutex<Vec<u32>>,
    }

    impl AttemptObserver for Recorder {
        fn attempt_started(&self, number: u32, _max_attempts: u32) {
            self.started.lock().unwrap().push(number);
        }

        fn attempt_finished(&self, attempt: &QueryAttempt) {
            self.finished.lock().unwrap().push(attempt.number);
        }
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let generator = Arc::new(ScriptedGenerator::new(vec![]));
        let result = RetryOrchestrator::new(generator, 0, 5);
        assert!(matches!(result, Err(AppError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let db = Arc::new(StaticDatabase::shop());
        let generator = Arc::new(ScriptedGenerator::new(vec![]));
        let mut session = session(Arc::clone(&db)).await;

        let outcome = orchestrator(Arc::clone(&generator))
            .run(&mut session, "How many orders are there?")
            .await
            .unwrap();

        assert_eq!(generator.calls(), 1);
        assert_eq!(db.executed().len(), 1);
        assert!(!outcome.is_exhausted());
        assert_eq!(outcome.attempts.len(), 1);
        assert_eq!(
            outcome.final_sql(),
            Some("SELECT COUNT(*) AS order_count FROM orders")
        );
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history()[0].content, "How many orders are there?");
        assert_eq!(session.history()[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_success_on_fifth_attempt() {
        let db = Arc::new(StaticDatabase::shop().failing_first(4));
        let generator = Arc::new(ScriptedGenerator::new(vec![]));
        let mut session = session(Arc::clone(&db)).await;

        let outcome = orchestrator(Arc::clone(&generator))
            .run(&mut session, "How many orders are there?")
            .await
            .unwrap();

        assert_eq!(generator.calls(), 5);
        assert_eq!(db.executed().len(), 5);
        assert!(outcome.result.is_some());
        assert_eq!(session.history().len(), 10);

        let numbers: Vec<u32> = outcome.attempts.iter().map(|a| a.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        // each retry sees the previous failed statements
        assert_eq!(generator.history_lengths(), vec![0, 2, 4, 6, 8]);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_no_result() {
        let db = Arc::new(StaticDatabase::shop().failing_first(usize::MAX));
        let generator = Arc::new(ScriptedGenerator::new(vec![]));
        let mut session = session(Arc::clone(&db)).await;

        let outcome = orchestrator(Arc::clone(&generator))
            .run(&mut session, "How many orders are there?")
            .await
            .unwrap();

        assert!(outcome.is_exhausted());
        assert!(outcome.result.is_none());
        assert_eq!(outcome.attempts.len(), 5);
        assert_eq!(generator.calls(), 5);
        assert_eq!(session.history().len(), 10);
        assert!(
            outcome
                .attempts
                .iter()
                .all(|a| matches!(a.outcome, AttemptOutcome::ExecutionFailed { .. }))
        );
        assert!(
            outcome.attempts[0]
                .outcome
                .error_message()
                .unwrap()
                .contains("SQLSTATE: 42S22")
        );
    }

    #[tokio::test]
    async fn test_error_text_not_fed_back() {
        let db = Arc::new(StaticDatabase::shop().failing_first(1));
        let generator = Arc::new(ScriptedGenerator::new(vec![]));
        let mut session = session(Arc::clone(&db)).await;

        orchestrator(Arc::clone(&generator))
            .run(&mut session, "How many orders are there?")
            .await
            .unwrap();

        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(!prompts[1].contains("Unknown column"));
        assert!(session.history().iter().all(|t| !t.content.contains("Unknown column")));
    }

    #[tokio::test]
    async fn test_generation_failure_consumes_attempt_without_turns() {
        let db = Arc::new(StaticDatabase::shop());
        let generator = Arc::new(ScriptedGenerator::new(vec![Err(AppError::generation(
            "API error: rate limited",
            Some(429),
        ))]));
        let mut session = session(Arc::clone(&db)).await;

        let outcome = orchestrator(Arc::clone(&generator))
            .run(&mut session, "How many orders are there?")
            .await
            .unwrap();

        assert_eq!(generator.calls(), 2);
        assert_eq!(db.executed().len(), 1);
        assert_eq!(outcome.attempts.len(), 2);
        assert_eq!(outcome.attempts[0].sql, None);
        assert_eq!(
            outcome.attempts[0].outcome,
            AttemptOutcome::GenerationFailed {
                message: "API error: rate limited (HTTP 429)".to_string()
            }
        );
        assert_eq!(session.history().len(), 2);
    }

    #[tokio::test]
    async fn test_non_attempt_error_escapes() {
        let db = Arc::new(StaticDatabase::shop());
        let generator = Arc::new(ScriptedGenerator::new(vec![Err(AppError::configuration(
            "no key",
        ))]));
        let mut session = session(Arc::clone(&db)).await;

        let result = orchestrator(generator)
            .run(&mut session, "How many orders are there?")
            .await;

        assert!(matches!(result, Err(AppError::Configuration { .. })));
        assert!(db.executed().is_empty());
    }

    #[tokio::test]
    async fn test_extracted_sql_is_executed_verbatim() {
        let db = Arc::new(StaticDatabase::shop());
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(
            "Sure:\n```sql\nSELECT name FROM customers;\n```".to_string(),
        )]));
        let mut session = session(Arc::clone(&db)).await;

        orchestrator(generator)
            .run(&mut session, "List customer names")
            .await
            .unwrap();

        assert_eq!(db.executed(), vec!["SELECT name FROM customers;".to_string()]);
    }

    #[tokio::test]
    async fn test_observer_sees_every_attempt() {
        let db = Arc::new(StaticDatabase::shop().failing_first(2));
        let generator = Arc::new(ScriptedGenerator::new(vec![]));
        let recorder = Arc::new(Recorder::default());
        let mut session = session(db).await;

        orchestrator(generator)
            .with_observer(Arc::clone(&recorder) as Arc<dyn AttemptObserver>)
            .run(&mut session, "How many orders are there?")
            .await
            .unwrap();

        assert_eq!(*recorder.started.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(*recorder.finished.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_empty_question_rejected() {
        let db = Arc::new(StaticDatabase::shop());
        let generator = Arc::new(ScriptedGenerator::new(vec![]));
        let mut session = session(db).await;

        let result = orchestrator(Arc::clone(&generator))
            .run(&mut session, "   ")
            .await;

        assert!(matches!(result, Err(AppError::InvalidInput { .. })));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_history_carries_across_questions() {
        let db = Arc::new(StaticDatabase::shop());
        let generator = Arc::new(ScriptedGenerator::new(vec![]));
        let mut session = session(db).await;
        let orchestrator = orchestrator(Arc::clone(&generator));

        orchestrator.run(&mut session, "first").await.unwrap();
        orchestrator.run(&mut session, "second").await.unwrap();

        assert_eq!(session.history().len(), 4);
        assert_eq!(generator.history_lengths(), vec![0, 2]);
    }
}
