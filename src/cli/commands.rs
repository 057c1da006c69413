use crate::db::{self, models::Recipe, DbPool};
use crate::engine::RecipeEngine;
use crate::ingredients::{IngredientMatch, MatchOptions, SubstitutionMatch};
use crate::search::{EmbeddingProvider, RetrievalStatus, SearchOutcome, SearchQuery};
use crate::{Error, Result};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Run a search and print the ranked results
pub async fn search(engine: &RecipeEngine, query: &SearchQuery) -> Result<()> {
    let outcome = engine.search(query).await?;
    print_search_results(&outcome);
    Ok(())
}

/// Match on-hand ingredients and print cookable recipes
pub fn cook(engine: &RecipeEngine, ingredients: &[String], options: &MatchOptions) -> Result<()> {
    let matches = engine.match_by_ingredients(ingredients, options)?;
    print_matches(&matches);
    Ok(())
}

/// Print substitutes for one ingredient
pub fn substitute(engine: &RecipeEngine, ingredient: &str, on_hand: &[String]) -> Result<()> {
    let substitutes = engine.substitutions_for(ingredient, on_hand)?;
    print_substitutions(ingredient, &substitutes);
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub considered: usize,
    pub embedded: usize,
    pub failed: usize,
}

/// Whether a recipe's stored embedding must be regenerated by `embedder`
pub fn needs_embedding(recipe: &Recipe, embedder: &dyn EmbeddingProvider) -> bool {
    match &recipe.embedding {
        None => true,
        Some(stored) => {
            recipe.has_stale_embedding()
                || stored.vector.len() != embedder.dimension()
                || stored.model.as_deref() != Some(embedder.model_name())
        }
    }
}

/// Embed recipes with missing or stale embeddings and store the vectors
///
/// Individual failures are logged and counted; they do not abort the run.
pub async fn backfill(
    pool: &DbPool,
    embedder: Arc<dyn EmbeddingProvider>,
    concurrency: usize,
    force: bool,
) -> Result<BackfillReport> {
    if concurrency == 0 {
        return Err(Error::Validation(
            "Concurrency must be at least 1".to_string(),
        ));
    }

    let recipes = db::recipes::list_public_recipes(pool).await?;
    let pending: Vec<Recipe> = recipes
        .into_iter()
        .filter(|recipe| force || needs_embedding(recipe, embedder.as_ref()))
        .collect();

    let mut report = BackfillReport {
        considered: pending.len(),
        ..Default::default()
    };
    info!(
        "Backfilling {} embeddings with {} (concurrency {})",
        pending.len(),
        embedder.model_name(),
        concurrency
    );

    let start = Instant::now();
    let results: Vec<Result<i64>> = stream::iter(pending)
        .map(|recipe| {
            let embedder = embedder.clone();
            async move {
                let vector = embedder.embed(&recipe.canonical_text()).await?;
                db::recipes::update_embedding(
                    pool,
                    recipe.id,
                    &vector,
                    embedder.model_name(),
                    &recipe.canonical_hash(),
                )
                .await?;
                Ok::<i64, Error>(recipe.id)
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    for result in results {
        match result {
            Ok(_) => report.embedded += 1,
            Err(e) => {
                report.failed += 1;
                warn!("Failed to embed recipe: {}", e.log_safe());
            }
        }
    }

    info!(
        "Backfill finished in {:.2?}: {} embedded, {} failed",
        start.elapsed(),
        report.embedded,
        report.failed
    );

    Ok(report)
}

fn print_search_results(outcome: &SearchOutcome) {
    match &outcome.status {
        RetrievalStatus::Complete => {}
        RetrievalStatus::Degraded(failure) => {
            println!("Note: keyword results only ({failure})");
        }
        RetrievalStatus::SemanticUnavailable(failure) => {
            println!("Semantic search unavailable: {failure}");
            return;
        }
    }

    if outcome.results.is_empty() {
        println!("No recipes found");
        return;
    }

    println!("\nFound {} recipes:\n", outcome.results.len());
    println!(
        "{:<6} {:<44} {:<8} {:<8} {:<9}",
        "ID", "Name", "Score", "Sim", "Source"
    );
    println!("{}", "-".repeat(79));

    for result in &outcome.results {
        println!(
            "{:<6} {:<44} {:<8.3} {:<8.3} {:<9}",
            result.recipe.id,
            truncate(&result.recipe.name, 42),
            result.ranking_score,
            result.similarity,
            format!("{:?}", result.source).to_lowercase()
        );
    }
}

fn print_matches(matches: &[IngredientMatch]) {
    if matches.is_empty() {
        println!("No recipes match those ingredients");
        return;
    }

    for entry in matches {
        let marker = if entry.can_cook_now() {
            "\x1b[32m\u{2713}\x1b[0m"
        } else {
            " "
        };
        println!(
            "{} {:<6} {:<40} {:>3}% ({}/{})",
            marker,
            entry.recipe.id,
            truncate(&entry.recipe.name, 38),
            entry.result.match_percentage,
            entry.result.matched_count,
            entry.result.total_count
        );

        if !entry.result.missing_ingredient_names.is_empty() {
            println!(
                "         missing: {}",
                entry.result.missing_ingredient_names.join(", ")
            );
        }

        for missing in &entry.substitutions {
            let names: Vec<String> = missing
                .substitutes
                .iter()
                .map(|s| {
                    if s.on_hand {
                        format!("{} (on hand)", s.rule.substitute)
                    } else {
                        s.rule.substitute.clone()
                    }
                })
                .collect();
            if !names.is_empty() {
                println!("         {} -> {}", missing.ingredient, names.join(", "));
            }
        }
    }
}

fn print_substitutions(ingredient: &str, substitutes: &[SubstitutionMatch]) {
    if substitutes.is_empty() {
        println!("No known substitutes for {}", ingredient.trim());
        return;
    }

    println!("Substitutes for {}:", ingredient.trim());
    for s in substitutes {
        let on_hand = if s.on_hand { " [on hand]" } else { "" };
        println!("  {:>3}%  {}{}", s.rule.confidence, s.rule.substitute, on_hand);
        if !s.rule.rationale.is_empty() {
            println!("        {}", s.rule.rationale);
        }
        if let Some(note) = &s.rule.quantity_note {
            println!("        {}", note);
        }
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}
