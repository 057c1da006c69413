use crate::ingredients::normalize::IngredientNormalizer;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Most substitutes returned for one missing ingredient
pub const MAX_SUBSTITUTES: usize = 3;

/// Static mapping from an ingredient to an acceptable alternative
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubstitutionRule {
    pub ingredient: String,
    pub substitute: String,
    /// 0-100
    pub confidence: u8,
    #[serde(default)]
    pub rationale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity_note: Option<String>,
}

/// A rule returned for a missing ingredient
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubstitutionMatch {
    #[serde(flatten)]
    pub rule: SubstitutionRule,
    /// Whether the substitute is in the caller's on-hand set
    pub on_hand: bool,
}

/// Looks up alternatives for missing ingredients
#[derive(Debug, Clone, Default)]
pub struct SubstitutionResolver {
    rules: HashMap<String, Vec<SubstitutionRule>>,
}

impl SubstitutionResolver {
    /// Index rules by normalized ingredient name
    pub fn new(rules: &[SubstitutionRule], normalizer: &IngredientNormalizer) -> Self {
        let mut by_ingredient: HashMap<String, Vec<SubstitutionRule>> = HashMap::new();

        for rule in rules {
            let ingredient = normalizer.normalize(&rule.ingredient);
            let substitute = normalizer.normalize(&rule.substitute);
            if ingredient == substitute {
                continue;
            }

            by_ingredient.entry(ingredient.clone()).or_default().push(SubstitutionRule {
                ingredient,
                substitute,
                ..rule.clone()
            });
        }

        for list in by_ingredient.values_mut() {
            list.sort_by(|a, b| {
                b.confidence
                    .cmp(&a.confidence)
                    .then_with(|| a.substitute.cmp(&b.substitute))
            });
        }

        Self {
            rules: by_ingredient,
        }
    }

    /// Up to three substitutes for a normalized ingredient name
    ///
    /// Rules whose substitute is on hand come first, then the remaining rules;
    /// both groups by confidence descending. No rule yields an empty list.
    pub fn resolve(&self, ingredient: &str, on_hand: &HashSet<String>) -> Vec<SubstitutionMatch> {
        let Some(rules) = self.rules.get(ingredient) else {
            return Vec::new();
        };

        let (available, generic): (Vec<_>, Vec<_>) = rules
            .iter()
            .partition(|rule| on_hand.contains(&rule.substitute));

        available
            .into_iter()
            .map(|rule| (rule, true))
            .chain(generic.into_iter().map(|rule| (rule, false)))
            .take(MAX_SUBSTITUTES)
            .map(|(rule, on_hand)| SubstitutionMatch {
                rule: rule.clone(),
                on_hand,
            })
            .collect()
    }

    /// Whether any rule exists for the ingredient
    pub fn has_rules_for(&self, ingredient: &str) -> bool {
        self.rules.contains_key(ingredient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(ingredient: &str, substitute: &str, confidence: u8) -> SubstitutionRule {
        SubstitutionRule {
            ingredient: ingredient.to_string(),
            substitute: substitute.to_string(),
            confidence,
            rationale: String::new(),
            quantity_note: None,
        }
    }

    fn resolver() -> SubstitutionResolver {
        SubstitutionResolver::new(
            &[
                rule("butter", "margarine", 75),
                rule("butter", "olive oil", 85),
                rule("butter", "coconut oil", 80),
                rule("butter", "applesauce", 55),
                rule("Eggs", "flaxseed", 60),
            ],
            &IngredientNormalizer::default(),
        )
    }

    fn on_hand(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_on_hand_substitute_comes_first() {
        let matches = resolver().resolve("butter", &on_hand(&["olive oil", "chicken"]));
        assert_eq!(matches[0].rule.substitute, "olive oil");
        assert_eq!(matches[0].rule.confidence, 85);
        assert!(matches[0].on_hand);
    }

    #[test]
    fn test_on_hand_outranks_higher_confidence() {
        let matches = resolver().resolve("butter", &on_hand(&["applesauce"]));
        let subs: Vec<_> = matches.iter().map(|m| m.rule.substitute.as_str()).collect();
        assert_eq!(subs, vec!["applesauce", "olive oil", "coconut oil"]);
        assert!(matches[0].on_hand);
        assert!(!matches[1].on_hand);
    }

    #[test]
    fn test_generic_fallback_by_confidence() {
        let matches = resolver().resolve("butter", &HashSet::new());
        assert_eq!(matches.len(), MAX_SUBSTITUTES);
        let confidences: Vec<u8> = matches.iter().map(|m| m.rule.confidence).collect();
        assert_eq!(confidences, vec![85, 80, 75]);
        assert!(matches.iter().all(|m| !m.on_hand));
    }

    #[test]
    fn test_unknown_ingredient_yields_empty_list() {
        assert!(resolver().resolve("galangal", &on_hand(&["ginger"])).is_empty());
    }

    #[test]
    fn test_rules_are_indexed_by_normalized_name() {
        let resolver = resolver();
        assert!(resolver.has_rules_for("egg"));
        assert!(!resolver.has_rules_for("eggs"));
    }
}
