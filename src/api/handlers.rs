use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;
use tracing::debug;

use crate::{
    api::models::*,
    engine::RecipeEngine,
    ingredients::MatchOptions,
    search::{SearchFilters, SearchQuery},
    Result,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::SqlitePool,
    pub engine: Arc<RecipeEngine>,
    pub settings: crate::config::Settings,
}

/// GET /api/search - Ranked semantic/lexical search
pub async fn search_recipes(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>> {
    debug!("Search request: {:?}", params);

    let query = SearchQuery {
        text: params.q,
        mode: params.mode,
        filters: SearchFilters {
            cuisine: params.cuisine,
            difficulty: params.difficulty,
            min_similarity: params.min_similarity,
        },
        limit: params.limit,
    };

    let outcome = state.engine.search(&query).await?;

    Ok(Json(SearchResponse {
        results: outcome.results.into_iter().map(RecipeCard::from).collect(),
        status: outcome.status,
    }))
}

/// GET /api/suggest - Completion suggestions
pub async fn suggest(
    State(state): State<AppState>,
    Query(params): Query<SuggestParams>,
) -> Result<Json<SuggestResponse>> {
    debug!("Suggest request: {:?}", params);

    let suggestions = state.engine.suggest(&params.q, params.limit)?;
    Ok(Json(SuggestResponse { suggestions }))
}

/// POST /api/match - Recipes cookable from on-hand ingredients
pub async fn match_ingredients(
    State(state): State<AppState>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<MatchResponse>> {
    debug!(
        "Match request: {} ingredients, sort {:?}",
        request.ingredients.len(),
        request.sort
    );

    let options = MatchOptions {
        sort: request.sort,
        min_match_percentage: request.min_match_percentage,
        limit: request.limit,
        cuisine: request.cuisine.clone(),
        staples: request.staple_policy(),
        with_substitutions: request.with_substitutions,
    };

    let matches = state
        .engine
        .match_by_ingredients(&request.ingredients, &options)?;

    Ok(Json(MatchResponse {
        matches: matches.into_iter().map(MatchCard::from).collect(),
    }))
}

/// GET /api/substitutions - Substitutes for one ingredient
pub async fn substitutions(
    State(state): State<AppState>,
    Query(params): Query<SubstitutionParams>,
) -> Result<Json<SubstitutionResponse>> {
    debug!("Substitution request: {:?}", params);

    let on_hand = params.on_hand_list();
    let substitutes = state.engine.substitutions_for(&params.ingredient, &on_hand)?;

    Ok(Json(SubstitutionResponse {
        ingredient: params.ingredient.trim().to_string(),
        substitutes,
    }))
}

/// GET /api/recipes/:id - Recipe details from the current catalog
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<RecipeDetail>> {
    debug!("Get recipe request: {}", id);

    let recipe = state.engine.recipe(id)?;
    Ok(Json(RecipeDetail::from(recipe)))
}

/// GET /health - Health check endpoint
pub async fn health_check() -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}

/// GET /ready - Readiness check endpoint
pub async fn readiness_check(State(state): State<AppState>) -> Result<Json<ReadinessResponse>> {
    let db_healthy = sqlx::query("SELECT 1").fetch_one(&state.pool).await.is_ok();
    let catalog = state.engine.catalog().snapshot();

    Ok(Json(ReadinessResponse {
        ready: db_healthy,
        database: if db_healthy { "ok" } else { "error" }.to_string(),
        catalog_recipes: catalog.len(),
        catalog_loaded_at: catalog.loaded_at().to_rfc3339(),
    }))
}
