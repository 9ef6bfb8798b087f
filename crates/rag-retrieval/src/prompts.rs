//! Prompt templates for the analysis, rewrite and answer calls.
//!
//! Templates use `{name}` placeholders filled in a single pass, so text
//! substituted from a query or a passage is never re-expanded.

use rag_types::PromptSettings;

use crate::error::RetrievalError;

pub const DEFAULT_ANALYSIS_TEMPLATE: &str = r#"You are a query analysis engine for a Retrieval-Augmented Generation (RAG) system.

Classify the user's query and return STRICT JSON only, in this shape:
{"intent": "...", "complexity": "...", "needs_rewrite": true|false}

Allowed values:
- intent: factual | conceptual | procedural | exploratory
- complexity: low | medium | high
- needs_rewrite: true | false

Guidelines:
- factual: asks for a specific fact or definition
- conceptual: asks for explanations or understanding
- procedural: asks for steps or how-to
- exploratory: broad, vague, or research-style queries

Rewrite is needed if:
- the query is vague
- the query is ambiguous
- the query is poorly structured

User query:
{query}"#;

pub const DEFAULT_REWRITE_TEMPLATE: &str = r#"You are a query rewriting assistant for a Retrieval-Augmented Generation (RAG) system.

Rewrite the user's query to be:
- Clear
- Specific
- Optimized for document retrieval

Rules:
- Preserve original intent
- Do NOT add new information
- Do NOT answer the question
- Output ONLY the rewritten query text

User query:
{query}"#;

pub const DEFAULT_ANSWER_TEMPLATE: &str = r#"You are a helpful and knowledgeable assistant.

Answer the user's question using the provided context when it is relevant.

Guidelines:
- When the context directly answers the question, answer concisely using only what is relevant. Do not repeat the context verbatim.
- Base context-based answers strictly on the information provided.
- When the context only partially addresses the question, state what is known from the documents, then complete the answer with general knowledge. Never attribute general-knowledge claims to the documents.
- When the context is empty or irrelevant, start the response with the following sentence exactly:
  "{fallback}"
  Then continue with a general-knowledge answer.
- When documents disagree, briefly mention the disagreement instead of picking one side.
- Do not use bracketed citation markup. Mention sources in plain language only when it adds clarity.

Context:
{context}

Question:
{question}

Your answer:"#;

/// Rendered-ready prompt templates plus the fallback sentence they share
/// with the post-generation check.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplates {
    analysis: String,
    rewrite: String,
    answer: String,
    fallback_sentence: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            analysis: DEFAULT_ANALYSIS_TEMPLATE.to_string(),
            rewrite: DEFAULT_REWRITE_TEMPLATE.to_string(),
            answer: DEFAULT_ANSWER_TEMPLATE.to_string(),
            fallback_sentence: rag_types::DEFAULT_FALLBACK_SENTENCE.to_string(),
        }
    }
}

impl PromptTemplates {
    /// Build from settings, applying overrides and checking placeholders.
    pub fn from_settings(settings: &PromptSettings) -> Result<Self, RetrievalError> {
        let fallback_sentence = settings.fallback_sentence.trim().to_string();
        if fallback_sentence.is_empty() {
            return Err(RetrievalError::InvalidPrompt(
                "fallback sentence is empty".to_string(),
            ));
        }

        let templates = Self {
            analysis: settings
                .analysis_template
                .clone()
                .unwrap_or_else(|| DEFAULT_ANALYSIS_TEMPLATE.to_string()),
            rewrite: settings
                .rewrite_template
                .clone()
                .unwrap_or_else(|| DEFAULT_REWRITE_TEMPLATE.to_string()),
            answer: settings
                .answer_template
                .clone()
                .unwrap_or_else(|| DEFAULT_ANSWER_TEMPLATE.to_string()),
            fallback_sentence,
        };
        templates.validate()?;
        Ok(templates)
    }

    fn validate(&self) -> Result<(), RetrievalError> {
        require(&self.analysis, "analysis", &["query"])?;
        require(&self.rewrite, "rewrite", &["query"])?;
        require(&self.answer, "answer", &["context", "question", "fallback"])?;
        Ok(())
    }

    pub fn fallback_sentence(&self) -> &str {
        &self.fallback_sentence
    }

    pub fn render_analysis(&self, query: &str) -> String {
        render(&self.analysis, &[("query", query)])
    }

    pub fn render_rewrite(&self, query: &str) -> String {
        render(&self.rewrite, &[("query", query)])
    }

    pub fn render_answer(&self, context: &str, question: &str) -> String {
        render(
            &self.answer,
            &[
                ("context", context),
                ("question", question),
                ("fallback", &self.fallback_sentence),
            ],
        )
    }
}

fn require(template: &str, name: &str, placeholders: &[&str]) -> Result<(), RetrievalError> {
    for placeholder in placeholders {
        if !template.contains(&format!("{{{}}}", placeholder)) {
            return Err(RetrievalError::InvalidPrompt(format!(
                "{} template is missing {{{}}}",
                name, placeholder
            )));
        }
    }
    Ok(())
}

/// Single-pass `{name}` substitution. Unknown placeholders and stray braces
/// are kept as written.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let substituted = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });

        match substituted {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
