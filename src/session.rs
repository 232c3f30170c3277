//! One connected database, its indexed schema and the running conversation.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::db::Database;
use crate::describe::{SchemaDescriber, SchemaDescription};
use crate::embedding::{EmbeddingIndex, EmbeddingProvider};
use crate::error::AppResult;
use crate::models::{ConversationTurn, DatabaseType};

pub struct Session {
    id: Uuid,
    db: Arc<dyn Database>,
    provider: Arc<dyn EmbeddingProvider>,
    schema: SchemaDescription,
    schema_text: String,
    index: EmbeddingIndex,
    history: Vec<ConversationTurn>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("dialect", &self.db.db_type())
            .field("tables", &self.schema.tables.len())
            .field("index", &self.index)
            .field("history", &self.history.len())
            .finish()
    }
}

impl Session {
    /// Describe every table of `db` and embed the result.
    ///
    /// Fails if introspection or the embedding model fails; nothing is retried.
    pub async fn new(
        db: Arc<dyn Database>,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> AppResult<Self> {
        let (schema, schema_text, index) = Self::index_schema(db.as_ref(), &provider).await?;
        let session = Self {
            id: Uuid::new_v4(),
            db,
            provider,
            schema,
            schema_text,
            index,
            history: Vec::new(),
        };

        info!(
            session_id = %session.id,
            dialect = %session.dialect().display_name(),
            tables = session.schema.tables.len(),
            fingerprint = %session.index.fingerprint(),
            "Session ready"
        );
        Ok(session)
    }

    async fn index_schema(
        db: &dyn Database,
        provider: &Arc<dyn EmbeddingProvider>,
    ) -> AppResult<(SchemaDescription, String, EmbeddingIndex)> {
        let schema = SchemaDescriber::describe_all(db).await?;
        let schema_text = schema.render();
        let index = EmbeddingIndex::build(Arc::clone(provider), schema.fragments()).await?;
        Ok((schema, schema_text, index))
    }

    /// Re-describe the database and rebuild the index. History is kept.
    ///
    /// Returns whether the schema changed.
    pub async fn refresh(&mut self) -> AppResult<bool> {
        let (schema, schema_text, index) =
            Self::index_schema(self.db.as_ref(), &self.provider).await?;
        let changed = index.fingerprint() != self.index.fingerprint();
        self.schema = schema;
        self.schema_text = schema_text;
        self.index = index;

        info!(session_id = %self.id, changed = changed, "Schema refreshed");
        Ok(changed)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn database(&self) -> &dyn Database {
        self.db.as_ref()
    }

    /// SQL dialect the model is asked to write.
    pub fn dialect(&self) -> DatabaseType {
        self.db.db_type()
    }

    pub fn schema(&self) -> &SchemaDescription {
        &self.schema
    }

    /// The full schema as prompt text.
    pub fn schema_text(&self) -> &str {
        &self.schema_text
    }

    pub fn index(&self) -> &EmbeddingIndex {
        &self.index
    }

    pub fn fingerprint(&self) -> &str {
        self.index.fingerprint()
    }

    /// Conversation so far, oldest first.
    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    /// Append a question and the SQL produced for it.
    pub fn record_exchange(&mut self, question: &str, sql: &str) {
        self.history.push(ConversationTurn::user(question));
        self.history.push(ConversationTurn::assistant(sql));
    }
}
