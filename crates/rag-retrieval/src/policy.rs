//! Retrieval depth policy.
//!
//! | intent      | complexity  | k |
//! |-------------|-------------|---|
//! | factual     | low         | 3 |
//! | factual     | medium/high | 4 |
//! | procedural  | any         | 5 |
//! | conceptual  | low/medium  | 6 |
//! | conceptual  | high        | 8 |
//! | exploratory | any         | 8 |

use rag_types::{QueryComplexity, QueryIntent};

/// Depth used for unrecognized intents. Widening is the safe direction.
pub const WIDEST_TOP_K: usize = 8;

/// Number of passages to retrieve for a classified query.
pub fn determine_top_k(intent: QueryIntent, complexity: QueryComplexity) -> usize {
    match (intent, complexity) {
        (QueryIntent::Factual, QueryComplexity::Low) => 3,
        (QueryIntent::Factual, _) => 4,
        (QueryIntent::Procedural, _) => 5,
        (QueryIntent::Conceptual, QueryComplexity::High) => 8,
        (QueryIntent::Conceptual, _) => 6,
        (QueryIntent::Exploratory, _) => WIDEST_TOP_K,
    }
}

/// Label-level variant for callers holding raw strings.
///
/// An unrecognized intent gets [`WIDEST_TOP_K`]. An unrecognized complexity
/// counts as neither low nor high.
pub fn top_k_for_labels(intent: &str, complexity: &str) -> usize {
    let Ok(intent) = intent.parse::<QueryIntent>() else {
        return WIDEST_TOP_K;
    };
    let complexity = complexity
        .parse::<QueryComplexity>()
        .unwrap_or(QueryComplexity::Medium);
    determine_top_k(intent, complexity)
}

/// Clamp a depth into `1..=max_top_k`.
pub fn clamp_top_k(k: usize, max_top_k: usize) -> usize {
    k.clamp(1, max_top_k.max(1))
}
