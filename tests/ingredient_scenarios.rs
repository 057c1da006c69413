mod common;

use common::{
    engine_with, insert_recipe, seed_corpus, test_pool, test_settings, KeywordEmbedder, SeedRecipe,
};
use pantry_search::ingredients::{IngredientMatch, MatchOptions, SortMode, StaplePolicy};
use pantry_search::{Error, RecipeEngine};
use std::collections::HashSet;
use std::sync::Arc;

fn list(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

async fn corpus_engine() -> RecipeEngine {
    let pool = test_pool().await;
    seed_corpus(&pool).await;
    engine_with(&pool, Arc::new(KeywordEmbedder), &test_settings()).await
}

fn find<'a>(matches: &'a [IngredientMatch], name: &str) -> &'a IngredientMatch {
    matches
        .iter()
        .find(|m| m.recipe.name == name)
        .unwrap_or_else(|| panic!("{name} not in matches"))
}

#[tokio::test]
async fn test_exact_match() {
    let engine = corpus_engine().await;

    let matches = engine
        .match_by_ingredients(
            &list(&["chicken", "rice", "garlic", "lemon", "olive oil"]),
            &MatchOptions::default(),
        )
        .unwrap();

    let lemon = find(&matches, "Lemon Chicken and Rice");
    assert_eq!(lemon.result.matched_count, 5);
    assert_eq!(lemon.result.total_count, 5);
    assert_eq!(lemon.result.match_percentage, 100);
    assert!(lemon.result.missing_ingredient_names.is_empty());
    assert!(lemon.can_cook_now());
    assert_eq!(matches[0].recipe.name, "Lemon Chicken and Rice");
}

#[tokio::test]
async fn test_partial_match_excludes_staples() {
    let pool = test_pool().await;
    insert_recipe(
        &pool,
        &SeedRecipe::new("Buttered Chicken Rice", &["chicken", "rice", "salt", "pepper", "butter"]),
    )
    .await;
    let engine = engine_with(&pool, Arc::new(KeywordEmbedder), &test_settings()).await;

    let matches = engine
        .match_by_ingredients(&list(&["chicken", "rice"]), &MatchOptions::default())
        .unwrap();

    assert_eq!(matches.len(), 1);
    let result = &matches[0].result;
    assert_eq!(result.total_count, 3);
    assert_eq!(result.matched_count, 2);
    assert_eq!(result.match_percentage, 67);
    assert_eq!(result.missing_ingredient_names, vec!["butter"]);

    // Counting staples changes the denominator
    let counted = MatchOptions {
        staples: StaplePolicy::None,
        ..Default::default()
    };
    let matches = engine
        .match_by_ingredients(&list(&["chicken", "rice"]), &counted)
        .unwrap();
    assert_eq!(matches[0].result.total_count, 5);
    assert_eq!(matches[0].result.match_percentage, 40);
    assert_eq!(
        matches[0].result.missing_ingredient_names,
        vec!["salt", "pepper", "butter"]
    );
}

#[tokio::test]
async fn test_substitution_prefers_on_hand() {
    let engine = corpus_engine().await;

    let substitutes = engine
        .substitutions_for("butter", &list(&["olive oil"]))
        .unwrap();

    assert!(!substitutes.is_empty() && substitutes.len() <= 3);
    assert_eq!(substitutes[0].rule.substitute, "olive oil");
    assert_eq!(substitutes[0].rule.confidence, 85);
    assert!(substitutes[0].on_hand);

    // Without anything on hand, the highest-confidence rule still comes first
    let generic = engine.substitutions_for("Unsalted Butter", &[]).unwrap();
    assert_eq!(generic[0].rule.substitute, "olive oil");
    assert!(generic.iter().all(|s| !s.on_hand));
    assert!(generic
        .windows(2)
        .all(|w| w[0].rule.confidence >= w[1].rule.confidence));

    assert!(engine.substitutions_for("yuzu kosho", &[]).unwrap().is_empty());
}

#[tokio::test]
async fn test_recipes_without_countable_ingredients_are_excluded() {
    let pool = test_pool().await;
    seed_corpus(&pool).await;
    insert_recipe(&pool, &SeedRecipe::new("Empty Plate", &[])).await;
    let engine = engine_with(&pool, Arc::new(KeywordEmbedder), &test_settings()).await;

    let everything = MatchOptions {
        min_match_percentage: Some(0),
        ..Default::default()
    };
    let matches = engine
        .match_by_ingredients(&list(&["water", "salt"]), &everything)
        .unwrap();

    assert!(matches.iter().all(|m| m.recipe.name != "Empty Plate"));
    assert!(matches.iter().all(|m| m.recipe.name != "Glass of Water"));
    assert!(matches.iter().all(|m| m.result.total_count > 0));
}

#[tokio::test]
async fn test_matched_and_missing_partition_recipe_ingredients() {
    let engine = corpus_engine().await;
    let normalizer = pantry_search::ingredients::IngredientNormalizer::from_reference(
        &pantry_search::config::reference::ReferenceData::builtin().unwrap(),
    );

    let options = MatchOptions {
        min_match_percentage: Some(0),
        staples: StaplePolicy::None,
        ..Default::default()
    };
    let matches = engine
        .match_by_ingredients(&list(&["garlic", "Onions", "2 cups rice", "tomato"]), &options)
        .unwrap();
    assert!(!matches.is_empty());

    for entry in &matches {
        let result = &entry.result;
        assert!(result.match_percentage <= 100);
        assert_eq!(
            result.matched_count + result.missing_ingredient_names.len(),
            result.total_count
        );

        let required: HashSet<String> = normalizer
            .normalize_all(entry.recipe.ingredients.iter().map(|i| i.name.as_str()))
            .into_iter()
            .collect();
        let union: HashSet<String> = result
            .matched_ingredient_names
            .iter()
            .chain(&result.missing_ingredient_names)
            .cloned()
            .collect();
        assert_eq!(union, required, "partition broken for {}", entry.recipe.name);
    }
}

#[tokio::test]
async fn test_matching_is_idempotent() {
    let engine = corpus_engine().await;
    let pantry = list(&["garlic", "butter", "pasta", "onion"]);
    let options = MatchOptions {
        with_substitutions: true,
        ..Default::default()
    };

    let first: Vec<_> = engine
        .match_by_ingredients(&pantry, &options)
        .unwrap()
        .into_iter()
        .map(|m| (m.recipe.id, m.result))
        .collect();
    let second: Vec<_> = engine
        .match_by_ingredients(&pantry, &options)
        .unwrap()
        .into_iter()
        .map(|m| (m.recipe.id, m.result))
        .collect();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_inclusion_rule_is_permissive() {
    let pool = test_pool().await;
    let mut ingredients = vec![
        "anise", "allspice", "cardamom", "cinnamon", "cumin", "coriander", "fennel",
        "fenugreek", "mace", "nutmeg", "paprika", "saffron", "sumac", "turmeric",
        "mustard seed", "caraway", "nigella", "ajwain",
    ];
    ingredients.extend(["chicken", "rice"]);
    insert_recipe(&pool, &SeedRecipe::new("Twenty Spice Pilaf", &ingredients)).await;
    let engine = engine_with(&pool, Arc::new(KeywordEmbedder), &test_settings()).await;

    // 2 of 20 is 10%, still included because two ingredients match
    let matches = engine
        .match_by_ingredients(&list(&["chicken", "rice"]), &MatchOptions::default())
        .unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].result.match_percentage, 10);

    let matches = engine
        .match_by_ingredients(&list(&["chicken"]), &MatchOptions::default())
        .unwrap();
    assert!(matches.is_empty());
}

#[tokio::test]
async fn test_sort_modes() {
    let engine = corpus_engine().await;
    let pantry = list(&["garlic", "butter", "onion", "tomato", "pasta"]);

    let quickest = engine
        .match_by_ingredients(
            &pantry,
            &MatchOptions {
                sort: SortMode::Quickest,
                min_match_percentage: Some(0),
                ..Default::default()
            },
        )
        .unwrap();
    let timed: Vec<i64> = quickest
        .iter()
        .filter_map(|m| m.recipe.total_time_minutes())
        .collect();
    assert!(timed.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(quickest[0].recipe.name, "Garlic Butter Pasta");

    let fewest = engine
        .match_by_ingredients(
            &pantry,
            &MatchOptions {
                sort: SortMode::FewestMissing,
                min_match_percentage: Some(0),
                limit: Some(2),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(fewest.len(), 2);
    assert!(fewest[0].result.missing_count() <= fewest[1].result.missing_count());
}

#[tokio::test]
async fn test_substitutions_attached_to_matches() {
    let engine = corpus_engine().await;
    let options = MatchOptions {
        with_substitutions: true,
        ..Default::default()
    };

    let matches = engine
        .match_by_ingredients(&list(&["pasta", "garlic", "parmesan", "olive oil"]), &options)
        .unwrap();

    let pasta = find(&matches, "Garlic Butter Pasta");
    assert_eq!(pasta.result.missing_ingredient_names, vec!["butter"]);
    assert_eq!(pasta.substitutions[0].ingredient, "butter");
    assert!(pasta.substitutions[0].substitutes[0].on_hand);
    assert_eq!(pasta.cookable_with_substitutes, Some(true));
}

#[tokio::test]
async fn test_unknown_and_malformed_ingredients() {
    let engine = corpus_engine().await;

    let matches = engine
        .match_by_ingredients(
            &list(&["dragon fruit", "chicken", "rice"]),
            &MatchOptions::default(),
        )
        .unwrap();
    assert!(!matches.is_empty());

    assert!(matches!(
        engine.match_by_ingredients(&[], &MatchOptions::default()),
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        engine.match_by_ingredients(&list(&["  ", ""]), &MatchOptions::default()),
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        engine.match_by_ingredients(
            &list(&["egg"]),
            &MatchOptions {
                min_match_percentage: Some(101),
                ..Default::default()
            }
        ),
        Err(Error::Validation(_))
    ));
}
