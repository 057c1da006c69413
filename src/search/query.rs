use crate::db::models::Recipe;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Semantic,
    Lexical,
    #[default]
    Hybrid,
}

impl SearchMode {
    pub fn uses_semantic(self) -> bool {
        matches!(self, SearchMode::Semantic | SearchMode::Hybrid)
    }

    pub fn uses_lexical(self) -> bool {
        matches!(self, SearchMode::Lexical | SearchMode::Hybrid)
    }
}

impl std::str::FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "semantic" => Ok(SearchMode::Semantic),
            // "text" is accepted as an alias for lexical
            "lexical" | "text" => Ok(SearchMode::Lexical),
            "hybrid" => Ok(SearchMode::Hybrid),
            other => Err(format!("Unknown search mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub cuisine: Option<String>,
    pub difficulty: Option<String>,
    /// Overrides the configured semantic floor
    pub min_similarity: Option<f32>,
}

impl SearchFilters {
    /// Cuisine and difficulty, compared case-insensitively
    pub fn accepts(&self, recipe: &Recipe) -> bool {
        fn matches(wanted: &Option<String>, actual: &Option<String>) -> bool {
            match wanted {
                Some(wanted) => actual
                    .as_deref()
                    .is_some_and(|actual| actual.trim().eq_ignore_ascii_case(wanted.trim())),
                None => true,
            }
        }

        matches(&self.cuisine, &recipe.cuisine) && matches(&self.difficulty, &recipe.difficulty)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    #[serde(default)]
    pub mode: SearchMode,
    #[serde(default)]
    pub filters: SearchFilters,
    /// Candidates per retrieval path; the configured default when absent
    pub limit: Option<usize>,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, mode: SearchMode) -> Self {
        Self {
            text: text.into(),
            mode,
            filters: SearchFilters::default(),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }
}

/// Which retrieval path(s) produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSource {
    Semantic,
    /// Similarity derived from lexical relevance; lower confidence
    Lexical,
    Both,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedRecipe {
    pub recipe: Recipe,
    pub similarity: f32,
    pub ranking_score: f32,
    pub source: MatchSource,
}

/// Why the semantic signal is missing from a result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SemanticFailure {
    EmbeddingUnavailable(String),
    EmbeddingTimeout,
    IndexQueryFailed(String),
}

impl fmt::Display for SemanticFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticFailure::EmbeddingUnavailable(reason) => {
                write!(f, "embedding unavailable: {reason}")
            }
            SemanticFailure::EmbeddingTimeout => write!(f, "embedding timed out"),
            SemanticFailure::IndexQueryFailed(reason) => write!(f, "index query failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "failure", rename_all = "snake_case")]
pub enum RetrievalStatus {
    Complete,
    /// Hybrid search fell back to lexical results only
    Degraded(SemanticFailure),
    /// Semantic-only search had no semantic signal to work with
    SemanticUnavailable(SemanticFailure),
}

/// Ranked results plus how they were obtained
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<RankedRecipe>,
    pub status: RetrievalStatus,
}

impl SearchOutcome {
    /// A well-formed empty answer, as opposed to a collaborator failure
    pub fn nothing_matched(&self) -> bool {
        self.results.is_empty() && self.status == RetrievalStatus::Complete
    }

    pub fn is_degraded(&self) -> bool {
        self.status != RetrievalStatus::Complete
    }

    pub fn ids(&self) -> Vec<i64> {
        self.results.iter().map(|r| r.recipe.id).collect()
    }
}
