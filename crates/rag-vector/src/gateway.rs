//! Retrieval gateway over the persisted passage index.
//!
//! Embeds the query, searches the HNSW index and resolves hits to passages
//! from the RocksDB store. Also exposes the ingestion hook that fills both.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use rag_llm::EmbeddingModel;
use rag_retrieval::{RetrievalError, RetrievalGateway};
use rag_types::{IndexSettings, Passage, Settings};

use crate::error::VectorError;
use crate::hnsw::{HnswConfig, HnswIndex};
use crate::index::{IndexStats, VectorIndex};
use crate::metadata::{PassageStore, StoredPassage};

/// Directory of the passage store inside the index directory.
pub const PASSAGE_DB_DIR: &str = "passages";

/// Gateway statistics for status output.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayStats {
    pub index: IndexStats,
    pub passage_count: usize,
    pub embedding_model: String,
    pub index_dir: PathBuf,
}

/// Vector-store gateway: query text in, ranked passages out.
pub struct VectorGateway {
    embedder: Arc<dyn EmbeddingModel>,
    index: HnswIndex,
    store: PassageStore,
    index_dir: PathBuf,
    /// Serializes ingestion so vector IDs stay unique
    write_lock: Mutex<()>,
}

impl VectorGateway {
    /// Open the index configured in `settings`, creating it if needed.
    pub fn open(
        settings: &Settings,
        embedder: Arc<dyn EmbeddingModel>,
    ) -> Result<Self, VectorError> {
        Self::open_at(
            settings.expanded_index_path(),
            &settings.index,
            settings.embeddings.dimension,
            embedder,
        )
    }

    /// Open an index rooted at `index_dir`.
    pub fn open_at(
        index_dir: impl AsRef<Path>,
        index_settings: &IndexSettings,
        dimension: usize,
        embedder: Arc<dyn EmbeddingModel>,
    ) -> Result<Self, VectorError> {
        let index_dir = index_dir.as_ref().to_path_buf();
        let model_dim = embedder.info().dimension;
        if model_dim != dimension {
            return Err(VectorError::DimensionMismatch {
                expected: dimension,
                actual: model_dim,
            });
        }

        let config = HnswConfig::from_settings(index_settings, dimension, &index_dir);
        let index = HnswIndex::open_or_create(config)?;
        let store = PassageStore::open(index_dir.join(PASSAGE_DB_DIR))?;

        info!(
            path = ?index_dir,
            vectors = index.len(),
            model = %embedder.info().name,
            "Opened vector gateway"
        );

        Ok(Self {
            embedder,
            index,
            store,
            index_dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Embed and store passages, then persist the index.
    ///
    /// Returns the number of passages added. Passages with blank content are
    /// skipped.
    pub async fn index_passages(&self, passages: Vec<Passage>) -> Result<usize, VectorError> {
        let passages: Vec<Passage> = passages
            .into_iter()
            .filter(|p| !p.content.trim().is_empty())
            .collect();
        if passages.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = passages.iter().map(|p| p.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != passages.len() {
            return Err(VectorError::Index(format!(
                "embedder returned {} vectors for {} passages",
                embeddings.len(),
                passages.len()
            )));
        }

        let _guard = self.write_lock.lock().await;
        let mut next_id = self.store.next_id()?;
        let count = passages.len();

        for (passage, embedding) in passages.into_iter().zip(embeddings.iter()) {
            // Store first so an indexed vector never lacks its passage
            self.store.put(&StoredPassage::new(next_id, passage))?;
            self.index.add(next_id, embedding)?;
            next_id += 1;
        }

        self.index.save()?;
        info!(added = count, total = self.index.len(), "Indexed passages");
        Ok(count)
    }

    pub fn stats(&self) -> Result<GatewayStats, VectorError> {
        Ok(GatewayStats {
            index: self.index.stats(),
            passage_count: self.store.count()?,
            embedding_model: self.embedder.info().name.clone(),
            index_dir: self.index_dir.clone(),
        })
    }

    async fn search_passages(&self, query: &str, k: usize) -> Result<Vec<Passage>, VectorError> {
        let size = self.index.len();
        if size == 0 || k == 0 {
            debug!(k, "Index empty, nothing to retrieve");
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        let hits = self.index.search(&query_embedding, k.min(size))?;

        let mut passages = Vec::with_capacity(hits.len());
        for hit in hits {
            match self.store.get(hit.vector_id)? {
                Some(entry) => passages.push(entry.passage),
                None => warn!(vector_id = hit.vector_id, "Vector has no stored passage"),
            }
        }

        debug!(k, returned = passages.len(), "Retrieved passages");
        Ok(passages)
    }
}

#[async_trait]
impl RetrievalGateway for VectorGateway {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Passage>, RetrievalError> {
        Ok(self.search_passages(query, k).await?)
    }

    fn name(&self) -> &str {
        "vector"
    }
}
