//! End-to-end test infrastructure for research-rag.
//!
//! Provides a shared TestHarness backed by a real on-disk vector index and
//! deterministic mock models, covering the full ingest-to-answer pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rag_llm::{EmbeddingModel, MockEmbedder, MockGenerator};
use rag_retrieval::{DepthBounds, Orchestrator, PromptTemplates};
use rag_types::{IndexSettings, Passage, PassageMetadata};
use rag_vector::VectorGateway;

/// Embedding dimension used by every harness.
pub const TEST_DIM: usize = 128;

/// Initial HNSW capacity. Small so larger corpora force the index to grow.
pub const TEST_CAPACITY: usize = 16;

/// Shared test harness for E2E tests.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Directory holding the HNSW file and passage store
    pub index_path: PathBuf,
    pub gateway: Arc<VectorGateway>,
}

impl TestHarness {
    /// Harness with an empty index.
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let index_path = temp_dir.path().join("index");
        let gateway = Arc::new(open_gateway(&index_path, Arc::new(MockEmbedder::new(TEST_DIM))));

        Self {
            _temp_dir: temp_dir,
            index_path,
            gateway,
        }
    }

    /// Harness whose index holds `passages`.
    pub async fn with_corpus(passages: Vec<Passage>) -> Self {
        let harness = Self::new();
        let expected = passages
            .iter()
            .filter(|p| !p.content.trim().is_empty())
            .count();
        let added = harness
            .gateway
            .index_passages(passages)
            .await
            .expect("Failed to index corpus");
        assert_eq!(added, expected);
        harness
    }

    /// Reopen the same index with another embedder.
    ///
    /// The previous gateway must have no other owners, since the passage
    /// store holds an exclusive lock.
    pub fn reopen_with(self, embedder: Arc<dyn EmbeddingModel>) -> Self {
        let Self {
            _temp_dir,
            index_path,
            gateway,
        } = self;
        drop(gateway);

        let gateway = Arc::new(open_gateway(&index_path, embedder));
        Self {
            _temp_dir,
            index_path,
            gateway,
        }
    }

    /// Orchestrator over this harness's index with default bounds.
    pub fn orchestrator(&self, generator: Arc<MockGenerator>) -> Orchestrator {
        self.orchestrator_with_bounds(generator, DepthBounds::default())
    }

    pub fn orchestrator_with_bounds(
        &self,
        generator: Arc<MockGenerator>,
        bounds: DepthBounds,
    ) -> Orchestrator {
        Orchestrator::new(
            generator,
            self.gateway.clone(),
            PromptTemplates::default(),
            bounds,
        )
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

fn open_gateway(index_path: &Path, embedder: Arc<dyn EmbeddingModel>) -> VectorGateway {
    let settings = IndexSettings {
        capacity: TEST_CAPACITY,
        ..IndexSettings::default()
    };
    VectorGateway::open_at(index_path, &settings, TEST_DIM, embedder)
        .expect("Failed to open vector gateway")
}

/// Analysis reply in the classifier's JSON shape.
pub fn analysis_json(intent: &str, complexity: &str, needs_rewrite: bool) -> String {
    serde_json::json!({
        "intent": intent,
        "complexity": complexity,
        "needs_rewrite": needs_rewrite,
    })
    .to_string()
}

/// Small mixed corpus: two physics pages (one split into two chunks), one
/// paper page with an author, and one untitled note.
pub fn sample_corpus() -> Vec<Passage> {
    vec![
        Passage::new(
            "Water boils at 100 degrees Celsius at sea level.",
            PassageMetadata::for_page("docs/physics.pdf", 2).with_title("Physics Basics"),
        ),
        Passage::new(
            "The boiling point of water drops as altitude increases.",
            PassageMetadata::for_page("docs/physics.pdf", 2).with_title("Physics Basics"),
        ),
        Passage::new(
            "Ice melts at 0 degrees Celsius.",
            PassageMetadata::for_page("docs/physics.pdf", 5).with_title("Physics Basics"),
        ),
        Passage::new(
            "Self attention compares every token with every other token in the sequence.",
            PassageMetadata::for_page("papers/attention.pdf", 0)
                .with_title("Attention Is All You Need")
                .with_author("Vaswani"),
        ),
        Passage::new(
            "Retrieval augmented generation grounds answers in retrieved passages.",
            PassageMetadata::for_page("notes/rag-notes.pdf", 1),
        ),
    ]
}

/// `count` random filler passages, one per page of `source`.
pub fn random_corpus(source: &str, count: usize) -> Vec<Passage> {
    use rand::Rng;

    const WORDS: [&str; 12] = [
        "alpha", "beta", "gamma", "delta", "kernel", "matrix", "vector", "graph", "signal",
        "entropy", "lattice", "tensor",
    ];

    let mut rng = rand::rng();
    (0..count)
        .map(|i| {
            let text = (0..8)
                .map(|_| WORDS[rng.random_range(0..WORDS.len())])
                .collect::<Vec<_>>()
                .join(" ");
            Passage::new(text, PassageMetadata::for_page(source, i as u32))
        })
        .collect()
}
