//! Prompt assembly for grounded question answering

use crate::providers::llm::ChatMessage;
use crate::types::{ConversationTurn, TurnRole};

/// Instruction pinning the model to the retrieved context
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant that answers questions using \
only the document excerpts provided in the conversation. Base every statement on those excerpts. \
If they do not contain the information needed to answer, say so explicitly instead of guessing.";

/// Returned when retrieval finds nothing relevant; generation is skipped
pub const INSUFFICIENT_CONTEXT_ANSWER: &str =
    "I don't have enough information in the uploaded documents to answer that question.";

/// Prompt builder for grounded chat exchanges
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the full exchange: system instruction, prior turns, then the
    /// current question with its retrieved context.
    pub fn messages(
        query: &str,
        context: &str,
        history: &[ConversationTurn],
    ) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(SYSTEM_INSTRUCTION));

        for turn in history {
            messages.push(match turn.role {
                TurnRole::User => ChatMessage::user(&turn.content),
                TurnRole::Assistant => ChatMessage::assistant(&turn.content),
            });
        }

        messages.push(ChatMessage::user(format!(
            "Documents:\n{context}\n\nQuestion: {query}\n\nAnswer:"
        )));
        messages
    }
}
