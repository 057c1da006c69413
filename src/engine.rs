use crate::catalog::{self, CatalogHandle};
use crate::config::reference::ReferenceData;
use crate::config::{SearchConfig, Settings};
use crate::db::{models::Recipe, DbPool};
use crate::error::{Error, Result};
use crate::ingredients::{
    IngredientMatch, IngredientMatcher, IngredientNormalizer, MatchOptions, SubstitutionMatch,
    SubstitutionResolver,
};
use crate::search::embedding::{build_embedder, EmbeddingProvider};
use crate::search::merge::merge;
use crate::search::query::{RetrievalStatus, SearchMode, SearchOutcome, SearchQuery};
use crate::search::ranking::{rank, RankingConfig};
use crate::search::semantic::SemanticRetriever;
use crate::search::vector::VectorIndex;
use crate::utils::validation::{
    validate_ingredient_list, validate_limit, validate_query_text, validate_similarity,
};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Search, suggestion, ingredient matching and substitution over the catalog
///
/// Holds no per-request state; every call works on the catalog snapshot
/// current when it starts.
#[derive(Clone)]
pub struct RecipeEngine {
    catalog: CatalogHandle,
    embedder: Arc<dyn EmbeddingProvider>,
    retriever: SemanticRetriever,
    /// Semantic lookups go through the request's catalog snapshot
    owns_index: bool,
    matcher: Arc<IngredientMatcher>,
    resolver: Arc<SubstitutionResolver>,
    search: SearchConfig,
    ranking: RankingConfig,
}

impl RecipeEngine {
    /// Build an engine whose vector index is the catalog's own
    pub fn new(
        catalog: CatalogHandle,
        embedder: Arc<dyn EmbeddingProvider>,
        reference: &ReferenceData,
        settings: &Settings,
    ) -> Result<Self> {
        let index: Arc<dyn VectorIndex> = Arc::new(catalog.clone());
        Self::build(catalog, embedder, index, true, reference, settings)
    }

    /// Build an engine backed by an external vector index
    pub fn with_vector_index(
        catalog: CatalogHandle,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        reference: &ReferenceData,
        settings: &Settings,
    ) -> Result<Self> {
        Self::build(catalog, embedder, index, false, reference, settings)
    }

    fn build(
        catalog: CatalogHandle,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        owns_index: bool,
        reference: &ReferenceData,
        settings: &Settings,
    ) -> Result<Self> {
        settings.ranking.validate()?;
        settings.matching.validate()?;

        let normalizer = IngredientNormalizer::from_reference(reference);
        let resolver = SubstitutionResolver::new(&reference.substitutions, &normalizer);
        let matcher = IngredientMatcher::new(
            normalizer,
            &reference.pantry_staples,
            settings.matching.clone(),
        );

        let retriever = SemanticRetriever::new(
            embedder.clone(),
            index,
            Duration::from_millis(settings.embedding.timeout_ms),
            settings.search.min_similarity,
        );

        Ok(Self {
            catalog,
            embedder,
            retriever,
            owns_index,
            matcher: Arc::new(matcher),
            resolver: Arc::new(resolver),
            search: settings.search.clone(),
            ranking: settings.ranking.clone(),
        })
    }

    /// Load reference data, the embedding backend and the catalog from settings
    pub async fn load(settings: &Settings, pool: &DbPool) -> Result<Self> {
        let reference = ReferenceData::load_or_builtin(&settings.reference_data_path)?;
        let embedder = build_embedder(&settings.embedding)?;
        let catalog = catalog::load(pool, settings.search.fuzzy_threshold).await?;

        Self::new(CatalogHandle::new(catalog), embedder, &reference, settings)
    }

    pub fn catalog(&self) -> &CatalogHandle {
        &self.catalog
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn search_config(&self) -> &SearchConfig {
        &self.search
    }

    /// Ranked recipes for a query
    ///
    /// `limit` bounds each retrieval path, so hybrid results may hold up to
    /// twice as many recipes. Embedding or index failures never surface as
    /// errors: hybrid mode falls back to lexical results and semantic mode
    /// returns an empty, flagged outcome.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome> {
        let text = validate_query_text(&query.text)?;
        let limit = validate_limit(
            query.limit.unwrap_or(self.search.default_limit),
            self.search.max_limit,
        )?;
        let min_similarity = query
            .filters
            .min_similarity
            .map(validate_similarity)
            .transpose()?;

        let snapshot = self.catalog.snapshot();

        let semantic = async {
            if !query.mode.uses_semantic() {
                Ok(Vec::new())
            } else if self.owns_index {
                self.retriever
                    .retrieve_from(snapshot.vectors(), text, limit, min_similarity)
                    .await
            } else {
                self.retriever.retrieve(text, limit, min_similarity).await
            }
        };
        let lexical = async {
            if query.mode.uses_lexical() {
                snapshot.lexical().search(text, limit)
            } else {
                Ok(Vec::new())
            }
        };
        let (semantic, lexical) = tokio::join!(semantic, lexical);
        let lexical = lexical?;

        let (semantic, status) = match semantic {
            Ok(hits) => (hits, RetrievalStatus::Complete),
            Err(failure) if query.mode == SearchMode::Semantic => {
                (Vec::new(), RetrievalStatus::SemanticUnavailable(failure))
            }
            Err(failure) => {
                warn!("Hybrid search degraded to lexical results: {}", failure);
                (Vec::new(), RetrievalStatus::Degraded(failure))
            }
        };

        let candidates: Vec<_> = merge(&semantic, &lexical, self.search.lexical_similarity_factor)
            .into_iter()
            .filter(|candidate| {
                let accepted = snapshot
                    .get(candidate.recipe_id)
                    .is_some_and(|recipe| query.filters.accepts(recipe));
                accepted && min_similarity.map_or(true, |min| candidate.similarity >= min)
            })
            .collect();

        let results = rank(
            &candidates,
            |id| snapshot.get(id),
            &self.ranking,
            Utc::now(),
        );

        debug!(
            "Search '{}' ({:?}): {} semantic, {} lexical, {} ranked",
            text,
            query.mode,
            semantic.len(),
            lexical.len(),
            results.len()
        );

        Ok(SearchOutcome { results, status })
    }

    /// Completion suggestions over recipe names, tags and cuisines
    pub fn suggest(&self, partial: &str, limit: usize) -> Result<Vec<String>> {
        let text = validate_query_text(partial)?;
        let limit = validate_limit(limit, self.search.max_limit)?;

        Ok(self
            .catalog
            .snapshot()
            .suggestions()
            .suggest(text, limit, self.search.fuzzy_threshold))
    }

    /// Recipes ordered by how well on-hand ingredients cover them
    pub fn match_by_ingredients(
        &self,
        ingredients: &[String],
        options: &MatchOptions,
    ) -> Result<Vec<IngredientMatch>> {
        let names = validate_ingredient_list(ingredients)?;

        if let Some(limit) = options.limit {
            validate_limit(limit, usize::MAX)?;
        }
        if let Some(percentage) = options.min_match_percentage {
            if percentage > 100 {
                return Err(Error::Validation(format!(
                    "Minimum match percentage must be between 0 and 100, got {percentage}"
                )));
            }
        }

        let snapshot = self.catalog.snapshot();
        Ok(self
            .matcher
            .match_recipes(snapshot.recipes(), &names, options, &self.resolver))
    }

    /// Up to three substitutes for a missing ingredient
    ///
    /// Unknown ingredients give an empty list.
    pub fn substitutions_for(
        &self,
        ingredient: &str,
        on_hand: &[String],
    ) -> Result<Vec<SubstitutionMatch>> {
        if ingredient.trim().is_empty() {
            return Err(Error::Validation(
                "Ingredient name must not be empty".to_string(),
            ));
        }

        let normalizer = self.matcher.normalizer();
        let on_hand: HashSet<String> = normalizer
            .normalize_all(on_hand.iter().map(String::as_str))
            .into_iter()
            .collect();

        Ok(self
            .resolver
            .resolve(&normalizer.normalize(ingredient), &on_hand))
    }

    /// A recipe from the current snapshot
    pub fn recipe(&self, id: i64) -> Result<Recipe> {
        self.catalog
            .snapshot()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Recipe {id} not found")))
    }
}
