//! Graceful degradation E2E tests for research-rag.
//!
//! Analysis and rewrite problems degrade to safe defaults and the query still
//! gets answered. Retrieval and answer-generation problems fail the query
//! with a typed error. Nothing panics.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use e2e_tests::{analysis_json, sample_corpus, TestHarness, TEST_DIM};
use rag_llm::{MockEmbedder, MockGenerator};
use rag_retrieval::{
    DepthBounds, RetrievalError, ANALYZE_TASK, ANSWER_TASK, REWRITE_TASK,
};
use rag_types::{QueryAnalysis, DEFAULT_FALLBACK_SENTENCE};

/// Worst case for content: nothing indexed. The question is still answered,
/// with no sources.
#[tokio::test]
async fn test_empty_index_answers_without_sources() {
    // 1. Harness with no passages
    let harness = TestHarness::new();

    // 2. Model answers from general knowledge
    let answer = format!(
        "{} Paris is the capital of France.",
        DEFAULT_FALLBACK_SENTENCE
    );
    let generator = Arc::new(
        MockGenerator::default()
            .with_response(ANALYZE_TASK, analysis_json("factual", "low", false))
            .with_response(ANSWER_TASK, answer.clone()),
    );
    let orchestrator = harness.orchestrator(generator.clone());

    // 3. Ask
    let outcome = orchestrator
        .run("What is the capital of France?")
        .await
        .unwrap();

    // 4. Answer present, no sources, nothing counted as suppressed
    assert_eq!(outcome.answer.text, answer);
    assert!(outcome.answer.passages.is_empty());
    assert_eq!(outcome.trace.retrieved, 0);
    assert!(!outcome.trace.sources_suppressed);

    // 5. The prompt was still built, with an empty context
    assert_eq!(generator.requests_for(ANSWER_TASK).len(), 1);
}

/// A classifier reply that is not JSON falls back to the safe default and
/// its depth.
#[tokio::test]
async fn test_malformed_analysis_uses_safe_default() {
    let harness = TestHarness::with_corpus(sample_corpus()).await;

    let generator = Arc::new(
        MockGenerator::default()
            .with_response(ANALYZE_TASK, "I think this is a factual question!")
            .with_response(ANSWER_TASK, "Answer."),
    );
    let orchestrator = harness.orchestrator(generator.clone());

    let outcome = orchestrator.run("boiling point?").await.unwrap();
    assert!(outcome.trace.analysis_defaulted);
    assert_eq!(outcome.trace.analysis, QueryAnalysis::safe_default());
    assert_eq!(outcome.trace.top_k, 6);
    assert_eq!(outcome.trace.retrieved, 5);
    assert_eq!(generator.call_order(), vec![ANALYZE_TASK, ANSWER_TASK]);
}

/// Labels outside the known sets are treated as malformed.
#[tokio::test]
async fn test_unknown_labels_use_safe_default() {
    let harness = TestHarness::with_corpus(sample_corpus()).await;

    let generator = Arc::new(
        MockGenerator::default()
            .with_response(ANALYZE_TASK, analysis_json("opinion", "extreme", true))
            .with_response(ANSWER_TASK, "Answer."),
    );
    let orchestrator = harness.orchestrator(generator.clone());

    let outcome = orchestrator.run("best physics book?").await.unwrap();
    assert!(outcome.trace.analysis_defaulted);
    assert!(!outcome.trace.rewritten);
    assert!(generator.requests_for(REWRITE_TASK).is_empty());
}

/// The classifier call itself failing is also absorbed.
#[tokio::test]
async fn test_analysis_failure_uses_safe_default() {
    let harness = TestHarness::with_corpus(sample_corpus()).await;

    let generator = Arc::new(
        MockGenerator::default()
            .with_failure(ANALYZE_TASK)
            .with_response(ANSWER_TASK, "Answer."),
    );
    let orchestrator = harness.orchestrator(generator);

    let outcome = orchestrator.run("boiling point?").await.unwrap();
    assert!(outcome.trace.analysis_defaulted);
    assert_eq!(outcome.answer.text, "Answer.");
}

/// A failed rewrite keeps the original question in effect.
#[tokio::test]
async fn test_rewrite_failure_keeps_original_query() {
    let harness = TestHarness::with_corpus(sample_corpus()).await;

    let generator = Arc::new(
        MockGenerator::default()
            .with_response(ANALYZE_TASK, analysis_json("conceptual", "high", true))
            .with_failure(REWRITE_TASK)
            .with_response(ANSWER_TASK, "Answer."),
    );
    let orchestrator = harness.orchestrator(generator.clone());

    let outcome = orchestrator.run("why does water boil?").await.unwrap();
    assert!(!outcome.trace.rewritten);
    assert_eq!(outcome.trace.effective_query, "why does water boil?");
    assert_eq!(outcome.trace.top_k, 8);

    let answer_prompt = &generator.requests_for(ANSWER_TASK)[0].prompt;
    assert!(answer_prompt.contains("why does water boil?"));
}

/// A blank rewrite is treated like a failed one.
#[tokio::test]
async fn test_blank_rewrite_keeps_original_query() {
    let harness = TestHarness::with_corpus(sample_corpus()).await;

    let generator = Arc::new(
        MockGenerator::default()
            .with_response(ANALYZE_TASK, analysis_json("factual", "low", true))
            .with_response(REWRITE_TASK, "  \"\"  ")
            .with_response(ANSWER_TASK, "Answer."),
    );
    let orchestrator = harness.orchestrator(generator);

    let outcome = orchestrator.run("boiling?").await.unwrap();
    assert!(!outcome.trace.rewritten);
    assert_eq!(outcome.trace.effective_query, "boiling?");
}

/// Embedding service down: the query fails with a retrieval error and no
/// answer is generated.
#[tokio::test]
async fn test_retrieval_failure_is_an_error() {
    let harness = TestHarness::with_corpus(sample_corpus())
        .await
        .reopen_with(Arc::new(MockEmbedder::failing(TEST_DIM)));

    let generator = Arc::new(
        MockGenerator::default()
            .with_response(ANALYZE_TASK, analysis_json("factual", "low", false)),
    );
    let orchestrator = harness.orchestrator(generator.clone());

    let result = orchestrator.run("What is the boiling point of water?").await;
    assert!(
        matches!(result, Err(RetrievalError::Retrieval(_))),
        "Expected retrieval error, got {:?}",
        result
    );
    assert!(generator.requests_for(ANSWER_TASK).is_empty());
}

/// Answer generation failing is an error, not an empty answer.
#[tokio::test]
async fn test_answer_generation_failure_is_an_error() {
    let harness = TestHarness::with_corpus(sample_corpus()).await;

    let generator = Arc::new(
        MockGenerator::default()
            .with_response(ANALYZE_TASK, analysis_json("factual", "low", false))
            .with_failure(ANSWER_TASK),
    );
    let orchestrator = harness.orchestrator(generator);

    let result = orchestrator.run("What is the boiling point of water?").await;
    assert!(matches!(result, Err(RetrievalError::Generation(_))));
}

/// A blank question never reaches the model or the index.
#[tokio::test]
async fn test_blank_question_rejected() {
    let harness = TestHarness::with_corpus(sample_corpus()).await;

    let generator = Arc::new(MockGenerator::default());
    let orchestrator = harness.orchestrator(generator.clone());

    let result = orchestrator.run("   \n").await;
    assert!(matches!(result, Err(RetrievalError::EmptyQuery)));
    assert!(generator.requests().is_empty());
}

/// Depth never exceeds the configured maximum.
#[tokio::test]
async fn test_depth_clamped_to_max() {
    let harness = TestHarness::with_corpus(sample_corpus()).await;

    let generator = Arc::new(
        MockGenerator::default()
            .with_response(ANALYZE_TASK, analysis_json("exploratory", "high", false))
            .with_response(ANSWER_TASK, "Answer."),
    );
    let bounds = DepthBounds {
        default_top_k: 2,
        max_top_k: 2,
        adaptive: true,
    };
    let orchestrator = harness.orchestrator_with_bounds(generator, bounds);

    let outcome = orchestrator.run("Tell me everything").await.unwrap();
    assert_eq!(outcome.trace.top_k, 2);
    assert_eq!(outcome.trace.retrieved, 2);
}
