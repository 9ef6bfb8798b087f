//! CLI argument parsing for research-rag.
//!
//! CLI flags override every other config source.

use clap::{Parser, Subcommand};

/// Research RAG
///
/// Ask questions against an indexed document collection.
#[derive(Parser, Debug)]
#[command(name = "research-rag")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/research-rag/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override the index directory
    #[arg(long, global = true)]
    pub index_path: Option<String>,

    /// Skip query analysis and rewriting; retrieve the default depth
    #[arg(long, global = true)]
    pub no_adaptive: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive question loop (type 'exit' or 'quit' to leave)
    Ask,

    /// Answer a single question
    Query {
        /// The question
        #[arg(required = true, trailing_var_arg = true)]
        question: Vec<String>,

        /// Print the raw {answer, sources} JSON
        #[arg(long)]
        json: bool,

        /// Also print the query trace
        #[arg(long)]
        trace: bool,
    },

    /// Show how a question would be analyzed, rewritten and how deep retrieval would go
    Analyze {
        #[arg(required = true, trailing_var_arg = true)]
        question: Vec<String>,
    },

    /// Add passages from a JSON Lines file ({"content": ..., "metadata": {...}} per line)
    Ingest {
        /// Input file
        path: String,
    },

    /// Show index status
    Status,

    /// Print the effective configuration (API keys redacted)
    Config,
}

/// Join a multi-word positional question.
pub fn join_question(words: &[String]) -> String {
    words.join(" ").trim().to_string()
}
