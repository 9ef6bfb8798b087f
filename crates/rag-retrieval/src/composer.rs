//! Grounded answer generation.

use std::sync::Arc;

use tracing::{debug, info};

use rag_llm::{GenerationRequest, TextGenerator};
use rag_types::{Answer, Passage};

use crate::error::RetrievalError;
use crate::gateway::RetrievalGateway;
use crate::prompts::PromptTemplates;

pub const ANSWER_TASK: &str = "answer";

/// Separator between passages in the prompt context.
const CONTEXT_SEPARATOR: &str = "\n\n";

/// What the composer produced for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub answer: Answer,
    /// Passages the gateway returned
    pub retrieved: usize,
    /// True if the fallback sentence cleared the passages
    pub sources_suppressed: bool,
}

/// Exact-prefix check for the fallback sentence. A blank sentence never
/// matches.
pub fn is_fallback_answer(answer: &str, fallback_sentence: &str) -> bool {
    let fallback_sentence = fallback_sentence.trim();
    !fallback_sentence.is_empty() && answer.trim_start().starts_with(fallback_sentence)
}

/// Join passage texts into the prompt context.
pub fn build_context(passages: &[Passage]) -> String {
    passages
        .iter()
        .map(|p| p.content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

pub struct AnswerComposer {
    gateway: Arc<dyn RetrievalGateway>,
    generator: Arc<dyn TextGenerator>,
    prompts: Arc<PromptTemplates>,
    temperature: f32,
}

impl AnswerComposer {
    pub fn new(
        gateway: Arc<dyn RetrievalGateway>,
        generator: Arc<dyn TextGenerator>,
        prompts: Arc<PromptTemplates>,
    ) -> Self {
        Self {
            gateway,
            generator,
            prompts,
            temperature: 0.3,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Retrieve up to `k` passages and generate an answer grounded in them.
    ///
    /// Retrieval and generation failures are returned as errors. An answer
    /// opening with the fallback sentence comes back with no passages.
    pub async fn compose(&self, query: &str, k: usize) -> Result<Composition, RetrievalError> {
        let passages = self.gateway.retrieve(query, k).await?;
        let retrieved = passages.len();
        debug!(gateway = self.gateway.name(), k, retrieved, "Retrieved context");

        let prompt = self
            .prompts
            .render_answer(&build_context(&passages), query);
        let request =
            GenerationRequest::new(ANSWER_TASK, prompt).with_temperature(self.temperature);

        let text = self.generator.generate(&request).await?.trim().to_string();
        if text.is_empty() {
            return Err(RetrievalError::EmptyAnswer);
        }

        let fallback = is_fallback_answer(&text, self.prompts.fallback_sentence());
        let sources_suppressed = fallback && retrieved > 0;
        if sources_suppressed {
            info!(retrieved, "Fallback answer, dropping sources");
        }
        let passages = if fallback { Vec::new() } else { passages };

        Ok(Composition {
            answer: Answer::new(text, passages),
            retrieved,
            sources_suppressed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockRetrievalGateway;
    use rag_llm::MockGenerator;
    use rag_types::{PassageMetadata, DEFAULT_FALLBACK_SENTENCE};

    fn passages() -> Vec<Passage> {
        vec![
            Passage::new(
                "Water boils at 100 C at sea level.",
                PassageMetadata::for_page("docs/physics.pdf", 2),
            ),
            Passage::new(
                "At altitude the boiling point drops.",
                PassageMetadata::for_page("docs/physics.pdf", 3),
            ),
        ]
    }

    fn composer(
        gateway: MockRetrievalGateway,
        generator: MockGenerator,
    ) -> (AnswerComposer, Arc<MockRetrievalGateway>, Arc<MockGenerator>) {
        let gateway = Arc::new(gateway);
        let generator = Arc::new(generator);
        let composer = AnswerComposer::new(
            gateway.clone(),
            generator.clone(),
            Arc::new(PromptTemplates::default()),
        );
        (composer, gateway, generator)
    }

    #[tokio::test]
    async fn test_grounded_answer_keeps_passages() {
        let (composer, gateway, generator) = composer(
            MockRetrievalGateway::default().with_passages(passages()),
            MockGenerator::default().with_response(ANSWER_TASK, "  Water boils at 100 C.\n"),
        );

        let result = composer.compose("When does water boil?", 4).await.unwrap();
        assert_eq!(result.answer.text, "Water boils at 100 C.");
        assert_eq!(result.answer.passages, passages());
        assert!(!result.sources_suppressed);
        assert_eq!(gateway.calls(), vec![("When does water boil?".to_string(), 4)]);

        let prompt = &generator.requests_for(ANSWER_TASK)[0].prompt;
        assert!(prompt.contains(
            "Water boils at 100 C at sea level.\n\nAt altitude the boiling point drops."
        ));
        assert!(prompt.contains("When does water boil?"));
    }

    #[tokio::test]
    async fn test_fallback_answer_clears_passages() {
        let answer = format!("{} In general, water boils at 100 C.", DEFAULT_FALLBACK_SENTENCE);
        let (composer, _, _) = composer(
            MockRetrievalGateway::default().with_passages(passages()),
            MockGenerator::default().with_response(ANSWER_TASK, answer.clone()),
        );

        let result = composer.compose("What is the capital of Peru?", 6).await.unwrap();
        assert_eq!(result.answer.text, answer);
        assert!(result.answer.passages.is_empty());
        assert!(result.sources_suppressed);
        assert_eq!(result.retrieved, 2);
    }

    #[tokio::test]
    async fn test_exact_fallback_clears_passages() {
        let (composer, _, _) = composer(
            MockRetrievalGateway::default().with_passages(passages()),
            MockGenerator::default().with_response(ANSWER_TASK, DEFAULT_FALLBACK_SENTENCE),
        );

        let result = composer.compose("q", 6).await.unwrap();
        assert!(result.answer.is_ungrounded());
    }

    #[tokio::test]
    async fn test_paraphrased_fallback_is_not_matched() {
        let (composer, _, _) = composer(
            MockRetrievalGateway::default().with_passages(passages()),
            MockGenerator::default().with_response(
                ANSWER_TASK,
                "I couldn't find information about that in the documents you provided.",
            ),
        );

        let result = composer.compose("q", 6).await.unwrap();
        assert_eq!(result.answer.passages.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_index_still_answers() {
        let answer = format!("{} Paris is the capital of France.", DEFAULT_FALLBACK_SENTENCE);
        let (composer, _, _) = composer(
            MockRetrievalGateway::default(),
            MockGenerator::default().with_response(ANSWER_TASK, answer),
        );

        let result = composer.compose("Capital of France?", 6).await.unwrap();
        assert!(result.answer.passages.is_empty());
        assert_eq!(result.retrieved, 0);
        assert!(!result.sources_suppressed);
    }

    #[tokio::test]
    async fn test_retrieval_failure_propagates() {
        let (composer, _, generator) = composer(
            MockRetrievalGateway::default().with_failure(),
            MockGenerator::default(),
        );

        let result = composer.compose("q", 3).await;
        assert!(matches!(result, Err(RetrievalError::Retrieval(_))));
        assert!(generator.requests().is_empty());
    }

    #[tokio::test]
    async fn test_generation_failure_propagates() {
        let (composer, _, _) = composer(
            MockRetrievalGateway::default().with_passages(passages()),
            MockGenerator::default().with_failure(ANSWER_TASK),
        );

        let result = composer.compose("q", 3).await;
        assert!(matches!(result, Err(RetrievalError::Generation(_))));
    }

    #[tokio::test]
    async fn test_blank_answer_is_error() {
        let (composer, _, _) = composer(
            MockRetrievalGateway::default().with_passages(passages()),
            MockGenerator::default().with_response(ANSWER_TASK, "  \n "),
        );

        let result = composer.compose("q", 3).await;
        assert!(matches!(result, Err(RetrievalError::EmptyAnswer)));
    }

    #[tokio::test]
    async fn test_custom_fallback_sentence() {
        let settings = rag_types::PromptSettings {
            fallback_sentence: "  Not in the documents.  ".to_string(),
            ..Default::default()
        };
        let prompts = Arc::new(PromptTemplates::from_settings(&settings).unwrap());

        let grounded = AnswerComposer::new(
            Arc::new(MockRetrievalGateway::default().with_passages(passages())),
            Arc::new(MockGenerator::default().with_response(ANSWER_TASK, "Water boils at 100 C.")),
            prompts.clone(),
        );
        let result = grounded.compose("q", 2).await.unwrap();
        assert_eq!(result.answer.passages.len(), 2);
        assert!(!result.sources_suppressed);

        let fallback = AnswerComposer::new(
            Arc::new(MockRetrievalGateway::default().with_passages(passages())),
            Arc::new(
                MockGenerator::default()
                    .with_response(ANSWER_TASK, "Not in the documents. Generally, 100 C."),
            ),
            prompts,
        );
        let result = fallback.compose("q", 2).await.unwrap();
        assert!(result.answer.passages.is_empty());
        assert!(result.sources_suppressed);
    }

    #[test]
    fn test_blank_fallback_sentence_never_matches() {
        assert!(!is_fallback_answer("Water boils at 100 C.", ""));
        assert!(!is_fallback_answer("Water boils at 100 C.", "   "));
        assert!(!is_fallback_answer("", ""));

        let settings = rag_types::PromptSettings {
            fallback_sentence: "   ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            PromptTemplates::from_settings(&settings),
            Err(RetrievalError::InvalidPrompt(_))
        ));
    }

    #[test]
    fn test_is_fallback_answer() {
        assert!(is_fallback_answer(DEFAULT_FALLBACK_SENTENCE, DEFAULT_FALLBACK_SENTENCE));
        assert!(is_fallback_answer(
            &format!("\n{} More text.", DEFAULT_FALLBACK_SENTENCE),
            DEFAULT_FALLBACK_SENTENCE
        ));
        assert!(!is_fallback_answer(
            &format!("Sadly, {}", DEFAULT_FALLBACK_SENTENCE),
            DEFAULT_FALLBACK_SENTENCE
        ));
    }
}
