//! Research RAG
//!
//! Question answering over an indexed document collection.
//!
//! # Usage
//!
//! ```bash
//! research-rag ask
//! research-rag query [--json] [--trace] <QUESTION>...
//! research-rag analyze <QUESTION>...
//! research-rag ingest <FILE>
//! research-rag status
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/research-rag/config.toml)
//! 3. Environment variables (RAG_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use rag_cli::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    run(Cli::parse()).await
}
