//! Vector index trait and types.

use rag_llm::Embedding;

use crate::error::VectorError;

/// One nearest-neighbour hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Vector ID, also the passage store key
    pub vector_id: u64,
    /// Cosine similarity (higher = closer)
    pub score: f32,
}

impl SearchHit {
    pub fn new(vector_id: u64, score: f32) -> Self {
        Self { vector_id, score }
    }
}

/// Index statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexStats {
    pub vector_count: usize,
    pub dimension: usize,
    /// Index file size in bytes (0 before the first save)
    pub size_bytes: u64,
}

/// Approximate nearest-neighbour index over passage embeddings.
///
/// Mutation goes through `&self` so one index can be shared between the
/// ingestion producer and concurrent readers.
pub trait VectorIndex: Send + Sync {
    fn dimension(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a vector under `id`.
    fn add(&self, id: u64, embedding: &Embedding) -> Result<(), VectorError>;

    /// k nearest neighbours, best first.
    fn search(&self, query: &Embedding, k: usize) -> Result<Vec<SearchHit>, VectorError>;

    fn contains(&self, id: u64) -> bool;

    fn stats(&self) -> IndexStats;

    /// Persist to disk.
    fn save(&self) -> Result<(), VectorError>;
}
