pub mod embedding;
pub mod lexical;
pub mod merge;
pub mod query;
pub mod ranking;
pub mod schema;
pub mod semantic;
pub mod suggest;
pub mod vector;

pub use embedding::{build_embedder, EmbeddingProvider, HashEmbedder, OpenAiEmbedding};
pub use lexical::LexicalIndex;
pub use query::{
    MatchSource, RankedRecipe, RetrievalStatus, SearchFilters, SearchMode, SearchOutcome,
    SearchQuery, SemanticFailure,
};
pub use ranking::{RankingConfig, ScoreComponents};
pub use semantic::SemanticRetriever;
pub use vector::{InMemoryVectorIndex, VectorIndex};
