use crate::db::models::{Recipe, RecipeIngredient};
use crate::ingredients::{IngredientMatch, MissingIngredient, SortMode, StaplePolicy, SubstitutionMatch};
use crate::search::{MatchSource, RankedRecipe, RetrievalStatus, SearchMode};
use serde::{Deserialize, Serialize};

/// Search request parameters
#[derive(Debug, Clone, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub mode: SearchMode,
    pub cuisine: Option<String>,
    pub difficulty: Option<String>,
    pub min_similarity: Option<f32>,
    pub limit: Option<usize>,
}

/// Search response
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub results: Vec<RecipeCard>,
    #[serde(flatten)]
    pub status: RetrievalStatus,
}

/// Recipe card for search results
#[derive(Debug, Clone, Serialize)]
pub struct RecipeCard {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub cuisine: Option<String>,
    pub tags: Vec<String>,
    pub similarity: f32,
    pub ranking_score: f32,
    pub source: MatchSource,
}

impl From<RankedRecipe> for RecipeCard {
    fn from(ranked: RankedRecipe) -> Self {
        Self {
            id: ranked.recipe.id,
            name: ranked.recipe.name,
            description: ranked.recipe.description,
            cuisine: ranked.recipe.cuisine,
            tags: ranked.recipe.tags,
            similarity: ranked.similarity,
            ranking_score: ranked.ranking_score,
            source: ranked.source,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestParams {
    #[serde(default)]
    pub q: String,
    #[serde(default = "default_suggest_limit")]
    pub limit: usize,
}

fn default_suggest_limit() -> usize {
    10
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestResponse {
    pub suggestions: Vec<String>,
}

/// Ingredient match request body
#[derive(Debug, Clone, Deserialize)]
pub struct MatchRequest {
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub sort: SortMode,
    pub min_match_percentage: Option<u8>,
    pub limit: Option<usize>,
    pub cuisine: Option<String>,
    /// `false` counts staples like any other ingredient
    #[serde(default = "default_true")]
    pub include_staples: bool,
    #[serde(default)]
    pub with_substitutions: bool,
}

fn default_true() -> bool {
    true
}

impl MatchRequest {
    pub fn staple_policy(&self) -> StaplePolicy {
        if self.include_staples {
            StaplePolicy::Default
        } else {
            StaplePolicy::None
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchResponse {
    pub matches: Vec<MatchCard>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchCard {
    pub id: i64,
    pub name: String,
    pub total_time_minutes: Option<i64>,
    pub matched_count: usize,
    pub total_count: usize,
    pub match_percentage: u8,
    pub matched_ingredients: Vec<String>,
    pub missing_ingredients: Vec<String>,
    pub can_cook_now: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub substitutions: Vec<MissingIngredient>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookable_with_substitutes: Option<bool>,
}

impl From<IngredientMatch> for MatchCard {
    fn from(entry: IngredientMatch) -> Self {
        let can_cook_now = entry.can_cook_now();
        Self {
            id: entry.recipe.id,
            total_time_minutes: entry.recipe.total_time_minutes(),
            name: entry.recipe.name,
            matched_count: entry.result.matched_count,
            total_count: entry.result.total_count,
            match_percentage: entry.result.match_percentage,
            matched_ingredients: entry.result.matched_ingredient_names,
            missing_ingredients: entry.result.missing_ingredient_names,
            can_cook_now,
            substitutions: entry.substitutions,
            cookable_with_substitutes: entry.cookable_with_substitutes,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubstitutionParams {
    #[serde(default)]
    pub ingredient: String,
    /// Comma-separated on-hand ingredients
    #[serde(default)]
    pub on_hand: Option<String>,
}

impl SubstitutionParams {
    pub fn on_hand_list(&self) -> Vec<String> {
        self.on_hand
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubstitutionResponse {
    pub ingredient: String,
    pub substitutes: Vec<SubstitutionMatch>,
}

/// Full recipe details
#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub cuisine: Option<String>,
    pub difficulty: Option<String>,
    pub tags: Vec<String>,
    pub ingredients: Vec<RecipeIngredient>,
    pub editorial_rating: Option<f64>,
    pub avg_user_rating: Option<f64>,
    pub rating_count: i64,
    pub prep_time_minutes: Option<i64>,
    pub cook_time_minutes: Option<i64>,
    pub total_time_minutes: Option<i64>,
    pub has_embedding: bool,
    pub created_at: String,
}

impl From<Recipe> for RecipeDetail {
    fn from(recipe: Recipe) -> Self {
        Self {
            total_time_minutes: recipe.total_time_minutes(),
            has_embedding: recipe.embedding.is_some(),
            created_at: recipe.created_at.to_rfc3339(),
            id: recipe.id,
            name: recipe.name,
            description: recipe.description,
            cuisine: recipe.cuisine,
            difficulty: recipe.difficulty,
            tags: recipe.tags,
            ingredients: recipe.ingredients,
            editorial_rating: recipe.editorial_rating,
            avg_user_rating: recipe.avg_user_rating,
            rating_count: recipe.rating_count,
            prep_time_minutes: recipe.prep_time_minutes,
            cook_time_minutes: recipe.cook_time_minutes,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Readiness check response
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub database: String,
    pub catalog_recipes: usize,
    pub catalog_loaded_at: String,
}
