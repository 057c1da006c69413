use crate::db::models::Recipe;
use crate::error::{Error, Result};
use crate::ingredients::normalize::IngredientNormalizer;
use crate::ingredients::substitution::{SubstitutionMatch, SubstitutionResolver};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Inclusion thresholds for ingredient matching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Recipes at or above this coverage are included
    pub min_match_percentage: u8,
    /// Recipes with at least this many matched ingredients are included regardless of coverage
    pub min_matched_count: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            min_match_percentage: 50,
            min_matched_count: 2,
        }
    }
}

impl MatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_match_percentage > 100 {
            return Err(Error::Config(format!(
                "Minimum match percentage must be between 0 and 100, got {}",
                self.min_match_percentage
            )));
        }
        if self.min_matched_count == 0 {
            return Err(Error::Config(
                "Minimum matched count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    #[default]
    BestMatch,
    FewestMissing,
    Quickest,
}

/// Which ingredients are assumed to always be in the pantry
#[derive(Debug, Clone, Default, PartialEq)]
pub enum StaplePolicy {
    /// The configured staple allowlist
    #[default]
    Default,
    /// A caller-supplied allowlist
    Custom(Vec<String>),
    /// Count every ingredient
    None,
}

#[derive(Debug, Clone, Default)]
pub struct MatchOptions {
    pub sort: SortMode,
    /// Overrides `MatchConfig::min_match_percentage`
    pub min_match_percentage: Option<u8>,
    pub limit: Option<usize>,
    pub cuisine: Option<String>,
    pub staples: StaplePolicy,
    pub with_substitutions: bool,
}

/// Coverage of one recipe by the user's ingredients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngredientMatchResult {
    pub matched_count: usize,
    pub total_count: usize,
    pub match_percentage: u8,
    pub matched_ingredient_names: Vec<String>,
    pub missing_ingredient_names: Vec<String>,
}

impl IngredientMatchResult {
    pub fn missing_count(&self) -> usize {
        self.total_count - self.matched_count
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MissingIngredient {
    pub ingredient: String,
    pub substitutes: Vec<SubstitutionMatch>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngredientMatch {
    pub recipe: Recipe,
    #[serde(flatten)]
    pub result: IngredientMatchResult,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub substitutions: Vec<MissingIngredient>,
    /// Every missing ingredient has an on-hand substitute; set only when
    /// substitutions were requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookable_with_substitutes: Option<bool>,
}

impl IngredientMatch {
    /// Nothing is missing
    pub fn can_cook_now(&self) -> bool {
        self.result.missing_ingredient_names.is_empty()
    }
}

/// Round 100·matched/total half-up; `total` must be non-zero
fn match_percentage(matched: usize, total: usize) -> u8 {
    ((200 * matched + total) / (2 * total)) as u8
}

/// Compute coverage for one recipe from normalized names
///
/// Recipe ingredients are deduplicated in order and staples removed from both
/// sides. Returns `None` when nothing countable is left.
pub fn evaluate(
    user: &HashSet<String>,
    recipe_ingredients: &[String],
    staples: &HashSet<String>,
) -> Option<IngredientMatchResult> {
    let mut seen = HashSet::new();
    let required: Vec<&String> = recipe_ingredients
        .iter()
        .filter(|name| !staples.contains(*name) && seen.insert(name.as_str()))
        .collect();

    if required.is_empty() {
        return None;
    }

    let total = required.len();
    let (matched, missing): (Vec<&String>, Vec<&String>) =
        required.into_iter().partition(|name| user.contains(*name));

    Some(IngredientMatchResult {
        matched_count: matched.len(),
        total_count: total,
        match_percentage: match_percentage(matched.len(), total),
        matched_ingredient_names: matched.into_iter().cloned().collect(),
        missing_ingredient_names: missing.into_iter().cloned().collect(),
    })
}

fn best_match_order(a: &IngredientMatch, b: &IngredientMatch) -> Ordering {
    b.result
        .match_percentage
        .cmp(&a.result.match_percentage)
        .then_with(|| a.result.total_count.cmp(&b.result.total_count))
        .then_with(|| a.recipe.id.cmp(&b.recipe.id))
}

/// Sort matches in place; every mode ends on recipe id so the order is total
pub fn sort_matches(matches: &mut [IngredientMatch], mode: SortMode) {
    match mode {
        SortMode::BestMatch => matches.sort_by(best_match_order),
        SortMode::FewestMissing => matches.sort_by(|a, b| {
            a.result
                .missing_count()
                .cmp(&b.result.missing_count())
                .then_with(|| b.result.match_percentage.cmp(&a.result.match_percentage))
                .then_with(|| a.recipe.id.cmp(&b.recipe.id))
        }),
        SortMode::Quickest => matches.sort_by(|a, b| {
            match (a.recipe.total_time_minutes(), b.recipe.total_time_minutes()) {
                (Some(x), Some(y)) => x.cmp(&y).then_with(|| best_match_order(a, b)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => best_match_order(a, b),
            }
        }),
    }
}

/// Matches on-hand ingredients against recipes
#[derive(Debug, Clone)]
pub struct IngredientMatcher {
    normalizer: IngredientNormalizer,
    staples: HashSet<String>,
    config: MatchConfig,
}

impl IngredientMatcher {
    pub fn new(normalizer: IngredientNormalizer, staples: &[String], config: MatchConfig) -> Self {
        let staples = normalizer
            .normalize_all(staples.iter().map(String::as_str))
            .into_iter()
            .collect();

        Self {
            normalizer,
            staples,
            config,
        }
    }

    pub fn normalizer(&self) -> &IngredientNormalizer {
        &self.normalizer
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    fn staples_for(&self, policy: &StaplePolicy) -> HashSet<String> {
        match policy {
            StaplePolicy::Default => self.staples.clone(),
            StaplePolicy::Custom(list) => self
                .normalizer
                .normalize_all(list.iter().map(String::as_str))
                .into_iter()
                .collect(),
            StaplePolicy::None => HashSet::new(),
        }
    }

    /// Rank recipes by how well the user's ingredients cover them
    ///
    /// `user_ingredients` are raw names; they are normalized here. Recipes with
    /// no countable ingredients never appear.
    pub fn match_recipes<'a>(
        &self,
        recipes: impl IntoIterator<Item = &'a Recipe>,
        user_ingredients: &[&str],
        options: &MatchOptions,
        resolver: &SubstitutionResolver,
    ) -> Vec<IngredientMatch> {
        let user: HashSet<String> = self
            .normalizer
            .normalize_all(user_ingredients.iter().copied())
            .into_iter()
            .collect();
        let staples = self.staples_for(&options.staples);
        let min_percentage = options
            .min_match_percentage
            .unwrap_or(self.config.min_match_percentage);

        let mut matches: Vec<IngredientMatch> = recipes
            .into_iter()
            .filter(|recipe| match &options.cuisine {
                Some(cuisine) => recipe
                    .cuisine
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case(cuisine.trim())),
                None => true,
            })
            .filter_map(|recipe| {
                let names = self
                    .normalizer
                    .normalize_all(recipe.ingredients.iter().map(|i| i.name.as_str()));
                let result = evaluate(&user, &names, &staples)?;

                let included = result.match_percentage >= min_percentage
                    || result.matched_count >= self.config.min_matched_count;
                included.then(|| IngredientMatch {
                    recipe: recipe.clone(),
                    result,
                    substitutions: Vec::new(),
                    cookable_with_substitutes: None,
                })
            })
            .collect();

        sort_matches(&mut matches, options.sort);
        if let Some(limit) = options.limit {
            matches.truncate(limit);
        }

        if options.with_substitutions {
            for entry in &mut matches {
                attach_substitutions(entry, &user, resolver);
            }
        }

        tracing::debug!(
            "Ingredient match: {} on hand, {} recipes included",
            user.len(),
            matches.len()
        );

        matches
    }
}

fn attach_substitutions(
    entry: &mut IngredientMatch,
    on_hand: &HashSet<String>,
    resolver: &SubstitutionResolver,
) {
    entry.substitutions = entry
        .result
        .missing_ingredient_names
        .iter()
        .map(|name| MissingIngredient {
            ingredient: name.clone(),
            substitutes: resolver.resolve(name, on_hand),
        })
        .collect();

    entry.cookable_with_substitutes = Some(
        entry
            .substitutions
            .iter()
            .all(|missing| missing.substitutes.iter().any(|s| s.on_hand)),
    );
}
