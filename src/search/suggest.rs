use crate::db::models::Recipe;
use crate::utils::text::{normalize_text, trigram_similarity};
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Tier {
    Prefix,
    WordPrefix,
    Fuzzy,
}

/// Completion candidates drawn from recipe names, tags and cuisines
#[derive(Debug, Clone, Default)]
pub struct SuggestionIndex {
    /// normalized text -> display text
    entries: BTreeMap<String, String>,
}

impl SuggestionIndex {
    pub fn build<'a>(recipes: impl IntoIterator<Item = &'a Recipe>) -> Self {
        let mut entries = BTreeMap::new();

        for recipe in recipes {
            let texts = std::iter::once(recipe.name.as_str())
                .chain(recipe.tags.iter().map(String::as_str))
                .chain(recipe.cuisine.as_deref());

            for text in texts {
                let key = normalize_text(text);
                if !key.is_empty() {
                    entries.entry(key).or_insert_with(|| text.trim().to_string());
                }
            }
        }

        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Up to `limit` suggestions: prefix matches, then word-prefix matches,
    /// then fuzzy matches at or above `fuzzy_threshold`
    pub fn suggest(&self, partial: &str, limit: usize, fuzzy_threshold: f32) -> Vec<String> {
        let query = normalize_text(partial);
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(Tier, f32, &str, &str)> = self
            .entries
            .iter()
            .filter_map(|(key, display)| {
                if key.starts_with(&query) {
                    return Some((Tier::Prefix, 1.0, key.as_str(), display.as_str()));
                }
                if key.split(' ').any(|word| word.starts_with(&query)) {
                    return Some((Tier::WordPrefix, 1.0, key.as_str(), display.as_str()));
                }

                let similarity = trigram_similarity(key, &query);
                (similarity >= fuzzy_threshold)
                    .then_some((Tier::Fuzzy, similarity, key.as_str(), display.as_str()))
            })
            .collect();

        scored.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then_with(|| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal))
                .then_with(|| a.2.cmp(b.2))
        });

        scored
            .into_iter()
            .take(limit)
            .map(|(_, _, _, display)| display.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::fixtures::recipe;

    fn index() -> SuggestionIndex {
        let mut curry = recipe(1, "Chicken Curry", &[]);
        curry.tags = vec!["spicy".to_string(), "Chicken".to_string()];
        curry.cuisine = Some("Indian".to_string());

        let mut tikka = recipe(2, "Paneer Tikka", &[]);
        tikka.cuisine = Some("indian".to_string());

        let soup = recipe(3, "Roast Chicken Soup", &[]);
        let chili = recipe(4, "Chili con Carne", &[]);

        SuggestionIndex::build(&[curry, tikka, soup, chili])
    }

    #[test]
    fn test_dedupes_case_insensitively() {
        let index = index();
        // names 4, tags 2 (spicy, chicken), cuisine 1
        assert_eq!(index.len(), 7);
    }

    #[test]
    fn test_prefix_before_word_prefix() {
        let suggestions = index().suggest("chi", 10, 0.3);
        assert_eq!(
            suggestions,
            vec!["Chicken", "Chicken Curry", "Chili con Carne", "Roast Chicken Soup"]
        );
    }

    #[test]
    fn test_fuzzy_suggestions() {
        let suggestions = index().suggest("panner tika", 5, 0.3);
        assert_eq!(suggestions.first().map(String::as_str), Some("Paneer Tikka"));
    }

    #[test]
    fn test_limit_and_blank_input() {
        let index = index();
        assert_eq!(index.suggest("c", 2, 0.3).len(), 2);
        assert!(index.suggest("   ", 5, 0.3).is_empty());
        assert!(index.suggest("chi", 0, 0.3).is_empty());
        assert!(index.suggest("zzzz", 5, 0.3).is_empty());
    }
}
