//! research-rag command-line front end.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations and output formatting

pub mod cli;
pub mod commands;

pub use cli::{join_question, Cli, Commands};
pub use commands::{
    build_pipeline, ingest_file, init_logging, load_settings, read_index_status, read_passages,
    render_answer, render_config, render_plan, run, run_interactive, run_single_query,
    show_status, IndexStatus, Pipeline,
};
