pub mod scheduler;

use crate::db::{self, models::Recipe, DbPool};
use crate::error::Result;
use crate::search::lexical::LexicalIndex;
use crate::search::suggest::SuggestionIndex;
use crate::search::vector::{InMemoryVectorIndex, VectorIndex};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Immutable snapshot of the public recipe corpus and its indexes
#[derive(Debug)]
pub struct Catalog {
    recipes: BTreeMap<i64, Recipe>,
    lexical: LexicalIndex,
    vectors: InMemoryVectorIndex,
    suggestions: SuggestionIndex,
    stale_embeddings: usize,
    loaded_at: DateTime<Utc>,
}

impl Catalog {
    /// Index recipes for lexical, semantic and suggestion lookups
    ///
    /// Embeddings whose dimension disagrees with the first one seen are left
    /// out of the vector index; stale embeddings are kept.
    pub fn build(recipes: Vec<Recipe>, fuzzy_threshold: f32) -> Result<Self> {
        let lexical = LexicalIndex::build(&recipes, fuzzy_threshold)?;
        let suggestions = SuggestionIndex::build(&recipes);

        let mut vectors = InMemoryVectorIndex::new();
        let mut stale_embeddings = 0;
        for recipe in &recipes {
            let Some(embedding) = &recipe.embedding else {
                continue;
            };

            if recipe.has_stale_embedding() {
                stale_embeddings += 1;
                debug!("Recipe {} has a stale embedding", recipe.id);
            }

            if let Err(e) = vectors.insert(recipe.id, embedding.vector.clone()) {
                warn!("Skipping embedding: {}", e.log_safe());
            }
        }

        Ok(Self {
            recipes: recipes.into_iter().map(|r| (r.id, r)).collect(),
            lexical,
            vectors,
            suggestions,
            stale_embeddings,
            loaded_at: Utc::now(),
        })
    }

    pub fn empty(fuzzy_threshold: f32) -> Result<Self> {
        Self::build(Vec::new(), fuzzy_threshold)
    }

    pub fn get(&self, id: i64) -> Option<&Recipe> {
        self.recipes.get(&id)
    }

    /// Recipes in id order
    pub fn recipes(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.values()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    pub fn lexical(&self) -> &LexicalIndex {
        &self.lexical
    }

    pub fn vectors(&self) -> &InMemoryVectorIndex {
        &self.vectors
    }

    pub fn suggestions(&self) -> &SuggestionIndex {
        &self.suggestions
    }

    pub fn stale_embeddings(&self) -> usize {
        self.stale_embeddings
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

/// Load every public recipe from the store into a new snapshot
pub async fn load(pool: &DbPool, fuzzy_threshold: f32) -> Result<Catalog> {
    let recipes = db::recipes::list_public_recipes(pool).await?;
    let catalog = Catalog::build(recipes, fuzzy_threshold)?;

    info!(
        "Catalog loaded: {} recipes, {} with embeddings ({} stale)",
        catalog.len(),
        catalog.vectors().len(),
        catalog.stale_embeddings()
    );

    Ok(catalog)
}

/// Shared, swappable reference to the current catalog
///
/// Readers clone the inner `Arc` and release the lock immediately, so no
/// request holds it across an await point.
#[derive(Debug, Clone)]
pub struct CatalogHandle {
    current: Arc<RwLock<Arc<Catalog>>>,
}

impl CatalogHandle {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(catalog))),
        }
    }

    pub fn snapshot(&self) -> Arc<Catalog> {
        let guard = self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    pub fn replace(&self, catalog: Catalog) {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(catalog);
    }
}

#[async_trait]
impl VectorIndex for CatalogHandle {
    async fn nearest_neighbors(&self, vector: &[f32], k: usize) -> Result<Vec<(i64, f32)>> {
        self.snapshot().vectors().search(vector, k)
    }
}
