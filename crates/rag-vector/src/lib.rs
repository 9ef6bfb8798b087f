//! # rag-vector
//!
//! Passage index for research-rag.
//!
//! Passages are embedded and stored in an HNSW index (usearch) with their
//! text and metadata kept in RocksDB under the same vector ID.
//! [`VectorGateway`] ties the two together and implements the retrieval
//! gateway used by the orchestrator.
//!
//! ## Layout
//! ```text
//! <index_path>/
//!   hnsw.usearch   HNSW graph
//!   passages/      RocksDB passage store
//! ```

pub mod error;
pub mod gateway;
pub mod hnsw;
pub mod index;
pub mod metadata;

pub use error::VectorError;
pub use gateway::{GatewayStats, VectorGateway, PASSAGE_DB_DIR};
pub use hnsw::{HnswConfig, HnswIndex, INDEX_FILE};
pub use index::{IndexStats, SearchHit, VectorIndex};
pub use metadata::{PassageStore, StoredPassage, CF_PASSAGES};
