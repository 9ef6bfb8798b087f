//! Integration tests for the research-rag command layer.
//!
//! These run the ingest, status and answer paths against a temporary index
//! with mock models, so no API keys or network are needed.

use std::sync::Arc;

use tempfile::TempDir;

use rag_cli::{ingest_file, read_index_status, render_answer, render_plan, show_status};
use rag_llm::{MockEmbedder, MockGenerator};
use rag_retrieval::{
    DedupKey, DepthBounds, Orchestrator, PromptTemplates, ANALYZE_TASK, ANSWER_TASK,
};
use rag_types::{Settings, DEFAULT_FALLBACK_SENTENCE};
use rag_vector::{VectorGateway, INDEX_FILE, PASSAGE_DB_DIR};

const DIM: usize = 64;

const CORPUS: &str = r#"{"content": "Water boils at 100 degrees Celsius at sea level.", "metadata": {"source": "docs/physics.pdf", "page": 2, "title": "Physics Basics"}}
{"content": "At high altitude water boils at a lower temperature.", "metadata": {"source": "docs/physics.pdf", "page": 2, "title": "Physics Basics"}}
{"content": "Attention lets a model weigh every token against every other token.", "metadata": {"source": "docs/attention.pdf", "page": 0}}
"#;

struct Fixture {
    _temp_dir: TempDir,
    settings: Settings,
    gateway: Arc<VectorGateway>,
}

async fn ingested_fixture() -> Fixture {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let index_dir = temp_dir.path().join("index");

    let mut settings = Settings::default();
    settings.index.index_path = index_dir.to_string_lossy().to_string();
    settings.embeddings.dimension = DIM;

    let gateway = Arc::new(
        VectorGateway::open(&settings, Arc::new(MockEmbedder::new(DIM)))
            .expect("Failed to open gateway"),
    );

    let corpus = temp_dir.path().join("corpus.jsonl");
    std::fs::write(&corpus, CORPUS).unwrap();
    ingest_file(&gateway, &corpus).await.unwrap();

    Fixture {
        _temp_dir: temp_dir,
        settings,
        gateway,
    }
}

#[tokio::test]
async fn test_ingest_then_status() {
    let Fixture {
        _temp_dir,
        settings,
        gateway,
    } = ingested_fixture().await;

    let stats = gateway.stats().unwrap();
    assert_eq!(stats.index.vector_count, 3);
    assert_eq!(stats.passage_count, 3);

    // status opens the store itself; release the RocksDB lock first
    drop(gateway);
    let status = read_index_status(&settings, &settings.expanded_index_path()).unwrap();
    assert_eq!(status.vectors, 3);
    assert_eq!(status.passages, 3);
    assert_eq!(status.dimension, DIM);
    assert!(status.size_bytes > 0);

    show_status(&settings).unwrap();
}

#[tokio::test]
async fn test_status_leaves_empty_index_dir_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let index_dir = temp_dir.path().join("index");
    std::fs::create_dir_all(&index_dir).unwrap();

    let mut settings = Settings::default();
    settings.index.index_path = index_dir.to_string_lossy().to_string();
    settings.embeddings.dimension = DIM;

    let status = read_index_status(&settings, &index_dir).unwrap();
    assert_eq!(status.vectors, 0);
    assert_eq!(status.passages, 0);

    show_status(&settings).unwrap();
    assert!(!index_dir.join(PASSAGE_DB_DIR).exists());
    assert!(!index_dir.join(INDEX_FILE).exists());
    assert_eq!(std::fs::read_dir(&index_dir).unwrap().count(), 0);
}

#[tokio::test]
async fn test_status_without_index() {
    let temp_dir = TempDir::new().unwrap();
    let mut settings = Settings::default();
    settings.index.index_path = temp_dir
        .path()
        .join("missing")
        .to_string_lossy()
        .to_string();

    show_status(&settings).unwrap();
}

#[tokio::test]
async fn test_answer_lists_each_page_once() {
    let fixture = ingested_fixture().await;

    let generator = MockGenerator::default()
        .with_response(
            ANALYZE_TASK,
            r#"{"intent": "factual", "complexity": "low", "needs_rewrite": false}"#,
        )
        .with_response(ANSWER_TASK, "Water boils at 100 degrees Celsius.");
    let orchestrator = Orchestrator::new(
        Arc::new(generator),
        fixture.gateway.clone(),
        PromptTemplates::default(),
        DepthBounds::default(),
    );

    let outcome = orchestrator
        .run("What is the boiling point of water?")
        .await
        .unwrap();
    assert_eq!(outcome.trace.top_k, 3);
    assert_eq!(outcome.answer.passages.len(), 3);

    let block = render_answer(&outcome.answer, DedupKey::Location);
    assert!(block.contains("Water boils at 100 degrees Celsius."));
    assert!(block.contains("  1. Physics Basics – page 3\n"));
    assert!(block.contains("  2. attention – page 1\n"));
    assert!(!block.contains("  3."));
}

#[tokio::test]
async fn test_fallback_answer_has_no_sources() {
    let fixture = ingested_fixture().await;

    let generator = MockGenerator::default()
        .with_response(
            ANALYZE_TASK,
            r#"{"intent": "factual", "complexity": "low", "needs_rewrite": false}"#,
        )
        .with_response(
            ANSWER_TASK,
            format!("{} Lima is the capital of Peru.", DEFAULT_FALLBACK_SENTENCE),
        );
    let orchestrator = Orchestrator::new(
        Arc::new(generator),
        fixture.gateway.clone(),
        PromptTemplates::default(),
        DepthBounds::default(),
    );

    let outcome = orchestrator.run("What is the capital of Peru?").await.unwrap();
    let block = render_answer(&outcome.answer, DedupKey::Title);
    assert!(block.contains("(No relevant documents were used)"));
}

#[tokio::test]
async fn test_plan_rendering() {
    let fixture = ingested_fixture().await;

    let generator = MockGenerator::default().with_response(ANALYZE_TASK, "not json");
    let orchestrator = Orchestrator::new(
        Arc::new(generator),
        fixture.gateway.clone(),
        PromptTemplates::default(),
        DepthBounds::default(),
    );

    let plan = orchestrator.plan("boiling thing").await.unwrap();
    let text = render_plan(&plan);
    assert!(text.contains("Intent:       conceptual"));
    assert!(text.contains("Defaulted:"));
    assert!(text.contains("Depth (k):    6"));
}
