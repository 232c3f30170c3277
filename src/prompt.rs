//! Prompt composition.
//!
//! The prompt text carries the schema and the question only. Conversation
//! history travels next to it as a separate ordered list, so the generation
//! client can replay it as chat turns.

use crate::models::{ConversationTurn, DatabaseType, SchemaFragment};

/// Everything a prompt is built from.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub question: &'a str,
    pub full_schema: &'a str,
    pub retrieved: &'a [SchemaFragment],
    pub history: &'a [ConversationTurn],
    pub dialect: DatabaseType,
}

/// A prompt ready for the generation client.
#[derive(Debug, Clone)]
pub struct ComposedPrompt<'a> {
    pub prompt: String,
    /// Full history, oldest first
    pub history: &'a [ConversationTurn],
}

#[derive(Debug, Clone, Default)]
pub struct PromptComposer;

impl PromptComposer {
    pub fn new() -> Self {
        Self
    }

    pub fn compose<'a>(&self, ctx: PromptContext<'a>) -> ComposedPrompt<'a> {
        let mut prompt = String::new();

        prompt.push_str("### Database schema\n");
        prompt.push_str(ctx.full_schema.trim_end());
        prompt.push_str("\n\n");

        prompt.push_str("### Relevant schema context\n");
        if ctx.retrieved.is_empty() {
            prompt.push_str("(none)\n");
        } else {
            for fragment in ctx.retrieved {
                prompt.push_str(&fragment.text);
                prompt.push('\n');
            }
        }
        prompt.push('\n');

        prompt.push_str("### Question\n");
        prompt.push_str(ctx.question.trim());
        prompt.push_str("\n\n");

        prompt.push_str("### Instructions\n");
        prompt.push_str(&format!(
            "Write a single {} SQL statement that answers the question, using only the \
             tables and columns listed above. Respond with the statement inside a ```sql \
             fenced code block.\n",
            ctx.dialect.display_name()
        ));

        ComposedPrompt {
            prompt,
            history: ctx.history,
        }
    }
}
