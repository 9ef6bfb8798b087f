//! Command implementations for research-rag.
//!
//! Handles:
//! - ask: interactive question loop
//! - query: one question, text or JSON output
//! - analyze: show the query plan without retrieving
//! - ingest: add passages from a JSON Lines file
//! - status / config: inspect the index and effective settings

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use rag_llm::{ApiEmbedder, ApiEmbedderConfig, ApiGenerator, ApiGeneratorConfig};
use rag_retrieval::{
    display_sources, AnalysisOutcome, DedupKey, Orchestrator, QueryPlan, RewriteOutcome,
};
use rag_types::{Answer, Passage, QueryResponse, Settings};
use rag_vector::{
    HnswConfig, HnswIndex, PassageStore, VectorGateway, VectorIndex, INDEX_FILE, PASSAGE_DB_DIR,
};

use crate::cli::{join_question, Cli, Commands};

const NO_SOURCES: &str = "(No relevant documents were used)";
const REDACTED: &str = "********";

/// Load settings and apply CLI overrides (highest precedence).
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(log_level) = &cli.log_level {
        settings.log_level = log_level.clone();
    }
    if let Some(index_path) = &cli.index_path {
        settings.index.index_path = index_path.clone();
    }
    if cli.no_adaptive {
        settings.retrieval.adaptive = false;
    }
    Ok(settings)
}

/// Install the stderr tracing subscriber. RUST_LOG wins over the configured level.
pub fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Wired-up query pipeline.
pub struct Pipeline {
    pub orchestrator: Arc<Orchestrator>,
    pub gateway: Arc<VectorGateway>,
}

/// Build the API clients, open the index and assemble the orchestrator.
pub fn build_pipeline(settings: &Settings) -> Result<Pipeline> {
    let gateway = Arc::new(open_gateway(settings)?);

    let generator_config = ApiGeneratorConfig::from_settings(&settings.llm)
        .context("Failed to configure text generation")?;
    let generator =
        Arc::new(ApiGenerator::new(generator_config).context("Failed to build LLM client")?);

    let orchestrator = Orchestrator::from_settings(settings, generator, gateway.clone())
        .context("Invalid prompt configuration")?;

    info!(
        provider = %settings.llm.provider,
        model = %settings.llm.model,
        adaptive = settings.retrieval.adaptive,
        "Pipeline ready"
    );

    Ok(Pipeline {
        orchestrator: Arc::new(orchestrator),
        gateway,
    })
}

fn open_gateway(settings: &Settings) -> Result<VectorGateway> {
    let embedder_config = ApiEmbedderConfig::from_settings(&settings.embeddings)
        .context("Failed to configure embeddings")?;
    let embedder =
        Arc::new(ApiEmbedder::new(embedder_config).context("Failed to build embedding client")?);

    VectorGateway::open(settings, embedder).with_context(|| {
        format!(
            "Failed to open index at {}",
            settings.expanded_index_path().display()
        )
    })
}

/// Dispatch a parsed command.
pub async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(&cli)?;
    init_logging(&settings.log_level)?;

    match cli.command {
        Commands::Ask => {
            let pipeline = build_pipeline(&settings)?;
            run_interactive(&pipeline.orchestrator).await
        }
        Commands::Query {
            question,
            json,
            trace,
        } => {
            let pipeline = build_pipeline(&settings)?;
            run_single_query(&pipeline.orchestrator, &join_question(&question), json, trace).await
        }
        Commands::Analyze { question } => {
            let pipeline = build_pipeline(&settings)?;
            let plan = pipeline
                .orchestrator
                .plan(&join_question(&question))
                .await
                .context("Failed to analyze question")?;
            print!("{}", render_plan(&plan));
            Ok(())
        }
        Commands::Ingest { path } => {
            let gateway = open_gateway(&settings)?;
            ingest_file(&gateway, Path::new(&path)).await
        }
        Commands::Status => show_status(&settings),
        Commands::Config => {
            print!("{}", render_config(&settings)?);
            Ok(())
        }
    }
}

/// Question loop. Exits on EOF, `exit` or `quit`.
pub async fn run_interactive(orchestrator: &Orchestrator) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all(b"Research RAG ready... (type 'exit' to quit)\n\n")
        .await?;

    loop {
        stdout.write_all(b"Question: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if is_exit_command(question) {
            break;
        }

        match orchestrator.run(question).await {
            Ok(outcome) => {
                let block = render_answer(&outcome.answer, DedupKey::Location);
                stdout.write_all(block.as_bytes()).await?;
            }
            Err(e) => {
                warn!(error = %e, "Query failed");
                stdout
                    .write_all(format!("\nError: {}\n\n", e).as_bytes())
                    .await?;
            }
        }
    }

    Ok(())
}

/// Answer one question and print it.
pub async fn run_single_query(
    orchestrator: &Orchestrator,
    question: &str,
    json: bool,
    trace: bool,
) -> Result<()> {
    let outcome = orchestrator
        .run(question)
        .await
        .context("Failed to answer question")?;

    if json {
        let response = QueryResponse::from(outcome.answer.clone());
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print!("{}", render_answer(&outcome.answer, DedupKey::Title));
    }

    if trace {
        println!("{}", serde_json::to_string_pretty(&outcome.trace)?);
    }
    Ok(())
}

pub fn is_exit_command(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "exit" | "quit")
}

/// Answer text followed by a numbered, deduplicated source list.
pub fn render_answer(answer: &Answer, key: DedupKey) -> String {
    let mut out = format!("\nAnswer:\n{}\n\nSources:\n", answer.text);

    let sources = display_sources(&answer.passages, key);
    if sources.is_empty() {
        out.push_str(&format!("  {}\n", NO_SOURCES));
    } else {
        for (i, source) in sources.iter().enumerate() {
            out.push_str(&format!("  {}. {}\n", i + 1, source));
        }
    }
    out.push('\n');
    out
}

pub fn render_plan(plan: &QueryPlan) -> String {
    let analysis = plan.analysis.analysis();
    let mut out = String::new();

    out.push_str(&format!("Query:        {}\n", plan.original_query));
    out.push_str(&format!("Intent:       {}\n", analysis.intent));
    out.push_str(&format!("Complexity:   {}\n", analysis.complexity));
    out.push_str(&format!("Needs rewrite: {}\n", analysis.needs_rewrite));
    if let AnalysisOutcome::Default { reason } = &plan.analysis {
        out.push_str(&format!("Defaulted:    {}\n", reason));
    }
    match &plan.rewrite {
        Some(RewriteOutcome::Rewritten { query }) => {
            out.push_str(&format!("Rewritten:    {}\n", query))
        }
        Some(RewriteOutcome::Unchanged { reason }) => {
            out.push_str(&format!("Rewrite kept original: {}\n", reason))
        }
        None => {}
    }
    out.push_str(&format!("Depth (k):    {}\n", plan.top_k));
    out
}

/// Read JSON Lines passages and add them to the index.
pub async fn ingest_file(gateway: &VectorGateway, path: &Path) -> Result<()> {
    let passages = read_passages(path)?;
    if passages.is_empty() {
        println!("No passages found in {}", path.display());
        return Ok(());
    }

    let added = gateway
        .index_passages(passages)
        .await
        .context("Failed to index passages")?;
    println!("Indexed {} passages from {}", added, path.display());
    Ok(())
}

pub fn read_passages(path: &Path) -> Result<Vec<Passage>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str::<Passage>(line)
                .with_context(|| format!("Invalid passage on line {}", i + 1))
        })
        .collect()
}

/// Counts read from an index directory without creating anything in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexStatus {
    pub vectors: usize,
    pub passages: usize,
    pub dimension: usize,
    pub size_bytes: u64,
}

/// Read the index and passage store under `index_dir`, if they exist.
pub fn read_index_status(settings: &Settings, index_dir: &Path) -> Result<IndexStatus> {
    let mut status = IndexStatus {
        dimension: settings.embeddings.dimension,
        ..Default::default()
    };

    if index_dir.join(INDEX_FILE).exists() {
        let config =
            HnswConfig::from_settings(&settings.index, settings.embeddings.dimension, index_dir);
        let stats = HnswIndex::open_or_create(config)
            .context("Failed to open vector index")?
            .stats();
        status.vectors = stats.vector_count;
        status.dimension = stats.dimension;
        status.size_bytes = stats.size_bytes;
    }

    let store_dir = index_dir.join(PASSAGE_DB_DIR);
    if store_dir.exists() {
        let store = PassageStore::open(&store_dir).context("Failed to open passage store")?;
        status.passages = store.count()?;
    }

    Ok(status)
}

/// Print index statistics without touching any model API.
pub fn show_status(settings: &Settings) -> Result<()> {
    let index_dir = settings.expanded_index_path();
    if !index_dir.exists() {
        println!("No index at {}", index_dir.display());
        return Ok(());
    }

    let status = read_index_status(settings, &index_dir)?;

    println!("Index path:      {}", index_dir.display());
    println!("Vectors:         {}", status.vectors);
    println!("Passages:        {}", status.passages);
    println!("Dimension:       {}", status.dimension);
    println!("Index size:      {} bytes", status.size_bytes);
    println!("Embedding model: {}", settings.embeddings.model);
    println!("LLM:             {} / {}", settings.llm.provider, settings.llm.model);

    if status.vectors != status.passages {
        warn!(
            vectors = status.vectors,
            passages = status.passages,
            "Vector and passage counts differ"
        );
    }
    Ok(())
}

/// Effective settings as TOML with API keys masked.
pub fn render_config(settings: &Settings) -> Result<String> {
    let mut redacted = settings.clone();
    if redacted.llm.api_key.is_some() {
        redacted.llm.api_key = Some(REDACTED.to_string());
    }
    if redacted.embeddings.api_key.is_some() {
        redacted.embeddings.api_key = Some(REDACTED.to_string());
    }
    toml::to_string_pretty(&redacted).context("Failed to serialize settings")
}
