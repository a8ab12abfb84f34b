//! Answer generation orchestration
//!
//! Combines the assembled context, the fixed system instruction, and the
//! caller-supplied conversation history into a prompt, and returns the
//! model's answer either whole or as a fragment stream with an explicit
//! terminal marker.

pub mod prompt;

use std::sync::Arc;

use futures::future;
use futures::stream::{self, BoxStream, StreamExt};

use crate::error::Result;
use crate::providers::llm::{FragmentStream, LlmProvider};
use crate::retrieval::ContextBundle;
use crate::types::ConversationTurn;

pub use prompt::{PromptBuilder, INSUFFICIENT_CONTEXT_ANSWER, SYSTEM_INSTRUCTION};

/// One element of a streamed answer. `Done` terminates every successful
/// stream and is never followed by further fragments; a stream that errors
/// ends on the `Err` item without a `Done`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Fragment(String),
    Done,
}

/// Streamed answer: fragments, then the terminal marker
pub type AnswerStream = BoxStream<'static, Result<StreamEvent>>;

/// Generation orchestrator
pub struct Generator {
    llm: Arc<dyn LlmProvider>,
}

impl Generator {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Answer a query from the supplied context, blocking until the full
    /// text is available. An empty context short-circuits to the
    /// insufficient-information answer without invoking the model.
    pub async fn answer(
        &self,
        query: &str,
        context: &ContextBundle,
        history: &[ConversationTurn],
    ) -> Result<String> {
        let ContextBundle::Relevant { context, .. } = context else {
            return Ok(INSUFFICIENT_CONTEXT_ANSWER.to_string());
        };
        let messages = PromptBuilder::messages(query, context, history);
        self.llm.complete(&messages).await
    }

    /// Answer a query as a lazy fragment stream terminated by
    /// [`StreamEvent::Done`]. Dropping the stream cancels generation and
    /// releases the model connection.
    pub async fn answer_stream(
        &self,
        query: &str,
        context: &ContextBundle,
        history: &[ConversationTurn],
    ) -> Result<AnswerStream> {
        let ContextBundle::Relevant { context, .. } = context else {
            return Ok(stream::iter([
                Ok(StreamEvent::Fragment(INSUFFICIENT_CONTEXT_ANSWER.to_string())),
                Ok(StreamEvent::Done),
            ])
            .boxed());
        };
        let messages = PromptBuilder::messages(query, context, history);
        let fragments = self.llm.complete_stream(&messages).await?;
        Ok(with_done(fragments))
    }
}

/// Append the terminal marker to a fragment stream. An `Err` item ends the
/// stream immediately, so `Done` only ever follows a complete answer.
fn with_done(fragments: FragmentStream) -> AnswerStream {
    fragments
        .map(|item| item.map(StreamEvent::Fragment))
        .chain(stream::once(future::ready(Ok(StreamEvent::Done))))
        .scan(false, |failed, item| {
            if *failed {
                return future::ready(None);
            }
            *failed = item.is_err();
            future::ready(Some(item))
        })
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::index::{NewRecord, RecordMetadata, VectorIndex};
    use crate::providers::llm::ChatMessage;
    use crate::providers::EmbeddingProvider;
    use crate::retrieval::Retriever;
    use async_trait::async_trait;
    use tempfile::tempdir;
    use uuid::Uuid;

    struct StubLlm {
        fragments: Vec<&'static str>,
        fail_after: Option<usize>,
    }

    impl StubLlm {
        fn scripted(fragments: Vec<&'static str>) -> Self {
            Self {
                fragments,
                fail_after: None,
            }
        }
    }

    #[async_trait]
    impl LlmProvider for StubLlm {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
            Ok(self.fragments.concat())
        }

        async fn complete_stream(&self, _messages: &[ChatMessage]) -> Result<FragmentStream> {
            let mut items: Vec<Result<String>> = self
                .fragments
                .iter()
                .map(|fragment| Ok(fragment.to_string()))
                .collect();
            if let Some(after) = self.fail_after {
                items.truncate(after);
                items.push(Err(Error::GenerationUnavailable("connection reset".into())));
            }
            Ok(stream::iter(items).boxed())
        }

        fn model_id(&self) -> &str {
            "stub-llm"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn relevant_context() -> ContextBundle {
        ContextBundle::Relevant {
            context: "[Document 1]\nsome facts".to_string(),
            chunks: Vec::new(),
        }
    }

    #[tokio::test]
    async fn stream_ends_with_done_and_concatenates_to_the_full_answer() {
        let generator = Generator::new(Arc::new(StubLlm::scripted(vec!["Hello", ", ", "world"])));
        let bundle = relevant_context();

        let events: Vec<_> = generator
            .answer_stream("q", &bundle, &[])
            .await
            .unwrap()
            .collect()
            .await;

        let events: Vec<StreamEvent> = events.into_iter().map(|e| e.unwrap()).collect();
        assert_eq!(events.last(), Some(&StreamEvent::Done));

        let streamed: String = events
            .iter()
            .filter_map(|event| match event {
                StreamEvent::Fragment(text) => Some(text.as_str()),
                StreamEvent::Done => None,
            })
            .collect();
        let whole = generator.answer("q", &bundle, &[]).await.unwrap();
        assert_eq!(streamed, whole);
        assert_eq!(streamed, "Hello, world");
    }

    #[tokio::test]
    async fn transport_failure_ends_the_stream_without_done() {
        let generator = Generator::new(Arc::new(StubLlm {
            fragments: vec!["partial ", "answer"],
            fail_after: Some(1),
        }));

        let events: Vec<_> = generator
            .answer_stream("q", &relevant_context(), &[])
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            Ok(StreamEvent::Fragment(ref text)) if text == "partial "
        ));
        assert!(events[1].is_err());
    }

    /// Always embeds to the same vector, so retrieval is exact.
    struct FixedEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn model_id(&self) -> &str {
            "fixed"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    #[tokio::test]
    async fn streamed_and_blocking_answers_agree_end_to_end() {
        let dir = tempdir().unwrap();
        let index = std::sync::Arc::new(VectorIndex::open(dir.path(), "fixed", 2).unwrap());
        index
            .insert(vec![NewRecord {
                embedding: vec![1.0, 0.0],
                text: "The sky is blue.".to_string(),
                metadata: RecordMetadata {
                    document_id: Uuid::new_v4(),
                    source: "sky.txt".to_string(),
                    chunk_index: 0,
                },
            }])
            .unwrap();

        let retriever = Retriever::new(Arc::new(FixedEmbedder), Arc::clone(&index), 1000);
        let bundle = retriever.retrieve("Summarize", 3, None).await.unwrap();
        assert!(!bundle.is_empty());

        let generator =
            Generator::new(Arc::new(StubLlm::scripted(vec!["The sky ", "is blue."])));

        let events: Vec<StreamEvent> = generator
            .answer_stream("Summarize", &bundle, &[])
            .await
            .unwrap()
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .map(|event| event.unwrap())
            .collect();

        assert!(events.len() >= 2);
        assert_eq!(events.last(), Some(&StreamEvent::Done));

        let streamed: String = events
            .iter()
            .filter_map(|event| match event {
                StreamEvent::Fragment(text) => Some(text.as_str()),
                StreamEvent::Done => None,
            })
            .collect();
        let blocking = generator.answer("Summarize", &bundle, &[]).await.unwrap();
        assert_eq!(streamed, blocking);
    }

    #[tokio::test]
    async fn empty_context_short_circuits_both_modes() {
        let generator = Generator::new(Arc::new(StubLlm::scripted(vec!["SHOULD NOT APPEAR"])));

        let answer = generator.answer("q", &ContextBundle::Empty, &[]).await.unwrap();
        assert_eq!(answer, INSUFFICIENT_CONTEXT_ANSWER);

        let events: Vec<_> = generator
            .answer_stream("q", &ContextBundle::Empty, &[])
            .await
            .unwrap()
            .collect()
            .await;
        let events: Vec<StreamEvent> = events.into_iter().map(|e| e.unwrap()).collect();
        assert_eq!(
            events,
            vec![
                StreamEvent::Fragment(INSUFFICIENT_CONTEXT_ANSWER.to_string()),
                StreamEvent::Done,
            ]
        );
    }
}
