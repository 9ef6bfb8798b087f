//! Adaptive orchestration: analyze, maybe rewrite, pick a depth, compose,
//! postprocess.
//!
//! Each phase takes the previous phase's state by value and returns the next
//! one. The orchestrator itself holds no per-request state and can be shared
//! across concurrent queries.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use rag_llm::TextGenerator;
use rag_types::{Answer, QueryAnalysis, QueryResponse, RetrievalSettings, Settings};

use crate::analyzer::{AnalysisOutcome, QueryAnalyzer};
use crate::composer::{AnswerComposer, Composition};
use crate::error::RetrievalError;
use crate::gateway::RetrievalGateway;
use crate::policy::{clamp_top_k, determine_top_k};
use crate::prompts::PromptTemplates;
use crate::rewriter::{QueryRewriter, RewriteOutcome};

/// Hook applied to every answer before it is returned.
#[async_trait]
pub trait AnswerPostprocessor: Send + Sync {
    async fn process(&self, query: &str, answer: Answer) -> Result<Answer, RetrievalError>;
}

/// Identity postprocessor.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThrough;

#[async_trait]
impl AnswerPostprocessor for PassThrough {
    async fn process(&self, _query: &str, answer: Answer) -> Result<Answer, RetrievalError> {
        Ok(answer)
    }
}

/// Output of the preprocess phase plus the depth decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPlan {
    pub original_query: String,
    pub analysis: AnalysisOutcome,
    /// Present only when the analysis asked for a rewrite
    pub rewrite: Option<RewriteOutcome>,
    /// Query used for retrieval and generation
    pub effective_query: String,
    pub top_k: usize,
}

impl QueryPlan {
    pub fn is_rewritten(&self) -> bool {
        self.rewrite
            .as_ref()
            .is_some_and(RewriteOutcome::is_rewritten)
    }
}

/// State after retrieval and generation.
struct Generated {
    plan: QueryPlan,
    composition: Composition,
}

/// Per-query record of the decisions taken.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryTrace {
    pub original_query: String,
    pub effective_query: String,
    pub analysis: QueryAnalysis,
    pub analysis_defaulted: bool,
    pub rewritten: bool,
    pub top_k: usize,
    pub retrieved: usize,
    pub sources_returned: usize,
    pub sources_suppressed: bool,
    pub elapsed_ms: u64,
}

/// Final answer plus its trace.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub answer: Answer,
    pub trace: QueryTrace,
}

/// Depth bounds and the adaptive switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthBounds {
    pub default_top_k: usize,
    pub max_top_k: usize,
    pub adaptive: bool,
}

impl Default for DepthBounds {
    fn default() -> Self {
        Self::from(&RetrievalSettings::default())
    }
}

impl From<&RetrievalSettings> for DepthBounds {
    fn from(settings: &RetrievalSettings) -> Self {
        Self {
            default_top_k: settings.default_top_k,
            max_top_k: settings.max_top_k,
            adaptive: settings.adaptive,
        }
    }
}

pub struct Orchestrator {
    analyzer: QueryAnalyzer,
    rewriter: QueryRewriter,
    composer: AnswerComposer,
    postprocessor: Arc<dyn AnswerPostprocessor>,
    bounds: DepthBounds,
}

impl Orchestrator {
    /// Build with default temperatures from a shared generator and gateway.
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        gateway: Arc<dyn RetrievalGateway>,
        prompts: PromptTemplates,
        bounds: DepthBounds,
    ) -> Self {
        let prompts = Arc::new(prompts);
        Self {
            analyzer: QueryAnalyzer::new(generator.clone(), prompts.clone()),
            rewriter: QueryRewriter::new(generator.clone(), prompts.clone()),
            composer: AnswerComposer::new(gateway, generator, prompts),
            postprocessor: Arc::new(PassThrough),
            bounds,
        }
    }

    /// Build from loaded settings. Fails on invalid prompt overrides.
    pub fn from_settings(
        settings: &Settings,
        generator: Arc<dyn TextGenerator>,
        gateway: Arc<dyn RetrievalGateway>,
    ) -> Result<Self, RetrievalError> {
        let prompts = Arc::new(PromptTemplates::from_settings(&settings.prompts)?);
        let analysis_temperature = settings.llm.analysis_temperature;

        Ok(Self {
            analyzer: QueryAnalyzer::new(generator.clone(), prompts.clone())
                .with_temperature(analysis_temperature),
            rewriter: QueryRewriter::new(generator.clone(), prompts.clone())
                .with_temperature(analysis_temperature),
            composer: AnswerComposer::new(gateway, generator, prompts)
                .with_temperature(settings.llm.answer_temperature),
            postprocessor: Arc::new(PassThrough),
            bounds: DepthBounds::from(&settings.retrieval),
        })
    }

    pub fn with_postprocessor(mut self, postprocessor: Arc<dyn AnswerPostprocessor>) -> Self {
        self.postprocessor = postprocessor;
        self
    }

    pub fn bounds(&self) -> DepthBounds {
        self.bounds
    }

    /// Preprocess phase and depth decision, without retrieval.
    ///
    /// The depth comes from the analysis of the original query even when the
    /// query is rewritten.
    pub async fn plan(&self, query: &str) -> Result<QueryPlan, RetrievalError> {
        let original_query = query.trim();
        if original_query.is_empty() {
            return Err(RetrievalError::EmptyQuery);
        }

        if !self.bounds.adaptive {
            return Ok(QueryPlan {
                original_query: original_query.to_string(),
                analysis: AnalysisOutcome::Default {
                    reason: "adaptive analysis disabled".to_string(),
                },
                rewrite: None,
                effective_query: original_query.to_string(),
                top_k: clamp_top_k(self.bounds.default_top_k, self.bounds.max_top_k),
            });
        }

        let analysis = self.analyzer.analyze(original_query).await;
        let classified = analysis.analysis();

        let rewrite = if classified.needs_rewrite {
            Some(self.rewriter.rewrite(original_query).await)
        } else {
            None
        };

        let effective_query = rewrite
            .as_ref()
            .map(|r| r.effective_query(original_query))
            .unwrap_or(original_query)
            .to_string();

        let top_k = clamp_top_k(
            determine_top_k(classified.intent, classified.complexity),
            self.bounds.max_top_k,
        );

        debug!(
            intent = classified.intent.as_str(),
            complexity = classified.complexity.as_str(),
            top_k,
            rewritten = rewrite.as_ref().is_some_and(RewriteOutcome::is_rewritten),
            "Query planned"
        );

        Ok(QueryPlan {
            original_query: original_query.to_string(),
            analysis,
            rewrite,
            effective_query,
            top_k,
        })
    }

    async fn generate(&self, plan: QueryPlan) -> Result<Generated, RetrievalError> {
        let composition = self
            .composer
            .compose(&plan.effective_query, plan.top_k)
            .await?;
        Ok(Generated { plan, composition })
    }

    async fn postprocess(
        &self,
        generated: Generated,
        started: Instant,
    ) -> Result<QueryOutcome, RetrievalError> {
        let Generated { plan, composition } = generated;
        let answer = self
            .postprocessor
            .process(&plan.effective_query, composition.answer)
            .await?;

        let trace = QueryTrace {
            rewritten: plan.is_rewritten(),
            analysis: plan.analysis.analysis(),
            analysis_defaulted: plan.analysis.is_default(),
            original_query: plan.original_query,
            effective_query: plan.effective_query,
            top_k: plan.top_k,
            retrieved: composition.retrieved,
            sources_returned: answer.passages.len(),
            sources_suppressed: composition.sources_suppressed,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        Ok(QueryOutcome { answer, trace })
    }

    /// Run one query through all phases.
    pub async fn run(&self, query: &str) -> Result<QueryOutcome, RetrievalError> {
        let started = Instant::now();

        let plan = self.plan(query).await?;
        let generated = self.generate(plan).await?;
        let outcome = self.postprocess(generated, started).await?;

        info!(
            top_k = outcome.trace.top_k,
            sources = outcome.trace.sources_returned,
            rewritten = outcome.trace.rewritten,
            elapsed_ms = outcome.trace.elapsed_ms,
            "Query answered"
        );
        Ok(outcome)
    }

    /// Run a query and return the `{answer, sources}` response shape.
    pub async fn run_query(&self, question: &str) -> Result<QueryResponse, RetrievalError> {
        Ok(QueryResponse::from(self.run(question).await?.answer))
    }
}
