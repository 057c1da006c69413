use crate::db::models::Recipe;
use crate::error::{Error, Result};
use crate::search::merge::Candidate;
use crate::search::query::RankedRecipe;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Neutral quality when a recipe has no rating at all
const NEUTRAL_QUALITY: f64 = 0.5;
const MAX_RATING: f64 = 5.0;

/// Weights and decay constants of the composite ranking score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingConfig {
    pub similarity_weight: f64,
    pub quality_weight: f64,
    pub engagement_weight: f64,
    pub recency_weight: f64,
    /// Rating count at which engagement reaches 1.0
    pub engagement_saturation: f64,
    pub recency_half_life_days: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            similarity_weight: 0.5,
            quality_weight: 0.2,
            engagement_weight: 0.15,
            recency_weight: 0.15,
            engagement_saturation: 100.0,
            recency_half_life_days: 180.0,
        }
    }
}

impl RankingConfig {
    pub fn validate(&self) -> Result<()> {
        let weights = [
            ("similarity", self.similarity_weight),
            ("quality", self.quality_weight),
            ("engagement", self.engagement_weight),
            ("recency", self.recency_weight),
        ];

        for (name, weight) in weights {
            if !(0.0..=1.0).contains(&weight) {
                return Err(Error::Config(format!(
                    "Ranking weight '{name}' must be between 0 and 1, got {weight}"
                )));
            }
        }

        let sum: f64 = weights.iter().map(|(_, w)| w).sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(Error::Config(format!(
                "Ranking weights must sum to 1.0, got {sum}"
            )));
        }

        if self.engagement_saturation <= 0.0 {
            return Err(Error::Config(
                "Engagement saturation must be positive".to_string(),
            ));
        }

        if self.recency_half_life_days <= 0.0 {
            return Err(Error::Config(
                "Recency half-life must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// The four [0,1] inputs of a ranking score
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreComponents {
    pub similarity: f64,
    pub quality: f64,
    pub engagement: f64,
    pub recency: f64,
}

impl ScoreComponents {
    pub fn compute(
        similarity: f32,
        recipe: &Recipe,
        config: &RankingConfig,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            similarity: f64::from(similarity).clamp(0.0, 1.0),
            quality: quality(recipe),
            engagement: engagement(recipe.rating_count, config.engagement_saturation),
            recency: recency(recipe.created_at, now, config.recency_half_life_days),
        }
    }

    pub fn score(&self, config: &RankingConfig) -> f64 {
        self.similarity * config.similarity_weight
            + self.quality * config.quality_weight
            + self.engagement * config.engagement_weight
            + self.recency * config.recency_weight
    }
}

/// Editorial rating, else average user rating, else neutral; scaled to [0,1]
pub fn quality(recipe: &Recipe) -> f64 {
    recipe
        .editorial_rating
        .or(recipe.avg_user_rating)
        .map(|rating| (rating / MAX_RATING).clamp(0.0, 1.0))
        .unwrap_or(NEUTRAL_QUALITY)
}

/// `min(1, ln(1 + count) / ln(1 + saturation))`
pub fn engagement(rating_count: i64, saturation: f64) -> f64 {
    let count = rating_count.max(0) as f64;
    ((1.0 + count).ln() / (1.0 + saturation).ln()).clamp(0.0, 1.0)
}

/// `exp(-age_days / half_life_days)`; future timestamps count as brand new
pub fn recency(created_at: DateTime<Utc>, now: DateTime<Utc>, half_life_days: f64) -> f64 {
    let age_days = (now - created_at).num_seconds().max(0) as f64 / 86_400.0;
    (-age_days / half_life_days).exp().clamp(0.0, 1.0)
}

/// Score candidates and sort them into their final order
///
/// Order: ranking score desc, similarity desc, recipe id asc. Candidates
/// without a recipe are dropped.
pub fn rank<'a, F>(
    candidates: &[Candidate],
    lookup: F,
    config: &RankingConfig,
    now: DateTime<Utc>,
) -> Vec<RankedRecipe>
where
    F: Fn(i64) -> Option<&'a Recipe>,
{
    let mut ranked: Vec<RankedRecipe> = candidates
        .iter()
        .filter_map(|candidate| {
            let recipe = lookup(candidate.recipe_id)?;
            let components = ScoreComponents::compute(candidate.similarity, recipe, config, now);

            Some(RankedRecipe {
                recipe: recipe.clone(),
                similarity: components.similarity as f32,
                ranking_score: components.score(config) as f32,
                source: candidate.source,
            })
        })
        .collect();

    ranked.sort_by(compare_ranked);
    ranked
}

fn compare_ranked(a: &RankedRecipe, b: &RankedRecipe) -> Ordering {
    b.ranking_score
        .partial_cmp(&a.ranking_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.similarity.partial_cmp(&a.similarity).unwrap_or(Ordering::Equal))
        .then_with(|| a.recipe.id.cmp(&b.recipe.id))
}
