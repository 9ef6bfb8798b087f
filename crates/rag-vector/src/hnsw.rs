//! HNSW index implementation using usearch.
//!
//! Cosine metric over unit-length embeddings. Scores are `1 - distance`.

use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

use rag_llm::Embedding;
use rag_types::IndexSettings;
use tracing::{debug, info};
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use crate::error::VectorError;
use crate::index::{IndexStats, SearchHit, VectorIndex};

/// File name of the HNSW graph inside the index directory.
pub const INDEX_FILE: &str = "hnsw.usearch";

/// HNSW index configuration
#[derive(Debug, Clone)]
pub struct HnswConfig {
    /// Embedding dimension (must match the embedder)
    pub dimension: usize,
    /// Connections per layer (M)
    pub connectivity: usize,
    /// ef_construction
    pub expansion_add: usize,
    /// ef_search
    pub expansion_search: usize,
    /// Directory holding the index file
    pub index_path: PathBuf,
    /// Initial reservation
    pub capacity: usize,
}

impl HnswConfig {
    pub fn new(dimension: usize, index_path: impl Into<PathBuf>) -> Self {
        let defaults = IndexSettings::default();
        Self {
            dimension,
            connectivity: defaults.connectivity,
            expansion_add: defaults.expansion_add,
            expansion_search: defaults.expansion_search,
            index_path: index_path.into(),
            capacity: defaults.capacity,
        }
    }

    /// Config for an index under `index_dir` using the HNSW parameters from settings.
    pub fn from_settings(
        settings: &IndexSettings,
        dimension: usize,
        index_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            dimension,
            connectivity: settings.connectivity,
            expansion_add: settings.expansion_add,
            expansion_search: settings.expansion_search,
            index_path: index_dir.into(),
            capacity: settings.capacity,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    fn options(&self) -> IndexOptions {
        IndexOptions {
            dimensions: self.dimension,
            metric: MetricKind::Cos,
            quantization: ScalarKind::F32,
            connectivity: self.connectivity,
            expansion_add: self.expansion_add,
            expansion_search: self.expansion_search,
            multi: false,
        }
    }
}

/// HNSW index wrapper around usearch.
pub struct HnswIndex {
    index: RwLock<Index>,
    config: HnswConfig,
}

impl HnswIndex {
    /// Open the index under `config.index_path`, creating it if absent.
    pub fn open_or_create(config: HnswConfig) -> Result<Self, VectorError> {
        let index_file = config.index_path.join(INDEX_FILE);
        let options = config.options();

        let index = if index_file.exists() {
            info!(path = ?index_file, "Opening existing vector index");
            let idx = Index::new(&options).map_err(|e| VectorError::Index(e.to_string()))?;
            idx.load(path_str(&index_file)?)
                .map_err(|e| VectorError::Index(format!("Failed to load: {}", e)))?;
            if idx.dimensions() != config.dimension {
                return Err(VectorError::DimensionMismatch {
                    expected: config.dimension,
                    actual: idx.dimensions(),
                });
            }
            idx
        } else {
            info!(path = ?index_file, dim = config.dimension, "Creating new vector index");
            std::fs::create_dir_all(&config.index_path)?;
            let idx = Index::new(&options).map_err(|e| VectorError::Index(e.to_string()))?;
            idx.reserve(config.capacity.max(1))
                .map_err(|e| VectorError::Index(e.to_string()))?;
            idx
        };

        Ok(Self {
            index: RwLock::new(index),
            config,
        })
    }

    pub fn index_file(&self) -> PathBuf {
        self.config.index_path.join(INDEX_FILE)
    }

    fn check_dimension(&self, embedding: &Embedding) -> Result<(), VectorError> {
        if embedding.dimension() != self.config.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.config.dimension,
                actual: embedding.dimension(),
            });
        }
        Ok(())
    }
}

fn path_str(path: &std::path::Path) -> Result<&str, VectorError> {
    path.to_str()
        .ok_or_else(|| VectorError::Index("Invalid path encoding".to_string()))
}

impl VectorIndex for HnswIndex {
    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn len(&self) -> usize {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .size()
    }

    fn add(&self, id: u64, embedding: &Embedding) -> Result<(), VectorError> {
        self.check_dimension(embedding)?;

        let index = self.index.write().unwrap_or_else(PoisonError::into_inner);
        if index.size() >= index.capacity() {
            let grown = (index.capacity() * 2).max(16);
            index
                .reserve(grown)
                .map_err(|e| VectorError::Index(e.to_string()))?;
            debug!(capacity = grown, "Grew vector index");
        }
        index
            .add(id, &embedding.values)
            .map_err(|e| VectorError::Index(e.to_string()))?;

        debug!(id = id, "Added vector");
        Ok(())
    }

    fn search(&self, query: &Embedding, k: usize) -> Result<Vec<SearchHit>, VectorError> {
        self.check_dimension(query)?;

        let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
        if k == 0 || index.size() == 0 {
            return Ok(Vec::new());
        }

        let matches = index
            .search(&query.values, k)
            .map_err(|e| VectorError::Index(e.to_string()))?;

        let hits: Vec<SearchHit> = matches
            .keys
            .iter()
            .zip(matches.distances.iter())
            .map(|(&id, &dist)| SearchHit::new(id, 1.0 - dist))
            .collect();

        debug!(k = k, found = hits.len(), "Search complete");
        Ok(hits)
    }

    fn contains(&self, id: u64) -> bool {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    fn stats(&self) -> IndexStats {
        let size_bytes = std::fs::metadata(self.index_file())
            .map(|m| m.len())
            .unwrap_or(0);

        IndexStats {
            vector_count: self.len(),
            dimension: self.config.dimension,
            size_bytes,
        }
    }

    fn save(&self) -> Result<(), VectorError> {
        let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
        let path = self.index_file();
        index
            .save(path_str(&path)?)
            .map_err(|e| VectorError::Index(format!("Failed to save: {}", e)))?;

        info!(path = ?path, vectors = index.size(), "Saved vector index");
        Ok(())
    }
}
