//! Source display for answers.
//!
//! A passage list often holds several chunks of one document, so every
//! user-facing source list goes through one of the dedup helpers here.

use std::collections::HashSet;
use std::path::Path;

use rag_types::{Passage, PassageMetadata};

pub const UNKNOWN_FILE: &str = "unknown file";

/// Separator between the parts of a display string.
const PART_SEPARATOR: &str = " – ";

/// Human-readable document title: extracted title, else the file name
/// without extension, else [`UNKNOWN_FILE`].
pub fn resolve_title(metadata: &PassageMetadata) -> String {
    if let Some(title) = metadata.title.as_deref().map(str::trim) {
        if !title.is_empty() {
            return title.to_string();
        }
    }

    metadata
        .source
        .as_deref()
        .and_then(|source| Path::new(source).file_stem())
        .map(|stem| stem.to_string_lossy().to_string())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| UNKNOWN_FILE.to_string())
}

/// Page part: the printed label if present, else the 0-based index shown
/// 1-based, else "page ?".
pub fn page_display(metadata: &PassageMetadata) -> String {
    match (&metadata.page_label, metadata.page) {
        (Some(label), _) => format!("page {}", label),
        (None, Some(page)) => format!("page {}", u64::from(page) + 1),
        (None, None) => "page ?".to_string(),
    }
}

/// One-line display string, e.g. "Thermodynamics – page 3 – by Hassan".
pub fn format_source(passage: &Passage) -> String {
    let metadata = &passage.metadata;
    let mut parts = vec![resolve_title(metadata), page_display(metadata)];
    if let Some(author) = metadata.author.as_deref().filter(|a| !a.trim().is_empty()) {
        parts.push(format!("by {}", author));
    }
    parts.join(PART_SEPARATOR)
}

/// Drop passages repeating an earlier `(source, page)` pair. Keeps
/// first-seen order.
pub fn dedup_by_location(passages: &[Passage]) -> Vec<&Passage> {
    let mut seen = HashSet::new();
    passages
        .iter()
        .filter(|p| {
            let (source, page) = p.metadata.location_key();
            seen.insert((source.map(str::to_string), page))
        })
        .collect()
}

/// Drop passages whose resolved title was already seen. Keeps first-seen
/// order.
pub fn dedup_by_title(passages: &[Passage]) -> Vec<&Passage> {
    let mut seen = HashSet::new();
    passages
        .iter()
        .filter(|p| seen.insert(resolve_title(&p.metadata)))
        .collect()
}

/// Which key collapses duplicates in a display list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupKey {
    /// `(source, page)` pair
    #[default]
    Location,
    /// Resolved document title
    Title,
}

/// Formatted, deduplicated source lines.
pub fn display_sources(passages: &[Passage], key: DedupKey) -> Vec<String> {
    let unique = match key {
        DedupKey::Location => dedup_by_location(passages),
        DedupKey::Title => dedup_by_title(passages),
    };
    unique.into_iter().map(format_source).collect()
}
