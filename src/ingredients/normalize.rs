use crate::config::reference::ReferenceData;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

fn parenthetical() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\([^)]*\)").expect("valid regex"))
}

fn quantity_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // 2, 1.5, 1/2, 2-3, ½, 1½, 200g
    RE.get_or_init(|| {
        Regex::new(r"^[0-9½¼¾⅓⅔⅛⅜⅝⅞]+(?:[./-][0-9½¼¾⅓⅔⅛⅜⅝⅞]+)*(?:[a-z]{1,3})?$")
            .expect("valid regex")
    })
}

/// Canonicalizes free-text ingredient names
///
/// Unknown names are never rejected: whatever cannot be mapped passes
/// through lowercased and trimmed.
#[derive(Debug, Clone)]
pub struct IngredientNormalizer {
    aliases: HashMap<String, String>,
    units: HashSet<String>,
    descriptors: HashSet<String>,
    invariant_plurals: HashSet<String>,
}

impl IngredientNormalizer {
    pub fn new(
        aliases: impl IntoIterator<Item = (String, String)>,
        units: impl IntoIterator<Item = String>,
        descriptors: impl IntoIterator<Item = String>,
        invariant_plurals: impl IntoIterator<Item = String>,
    ) -> Self {
        let clean = |s: String| s.trim().to_lowercase();

        Self {
            aliases: aliases
                .into_iter()
                .map(|(from, to)| (clean(from), clean(to)))
                .collect(),
            units: units.into_iter().map(clean).collect(),
            descriptors: descriptors.into_iter().map(clean).collect(),
            invariant_plurals: invariant_plurals.into_iter().map(clean).collect(),
        }
    }

    /// Build a normalizer from the reference data tables
    pub fn from_reference(reference: &ReferenceData) -> Self {
        Self::new(
            reference.aliases.clone(),
            reference.units.clone(),
            reference.descriptors.clone(),
            reference.invariant_plurals.clone(),
        )
    }

    /// Normalize one ingredient name
    pub fn normalize(&self, raw: &str) -> String {
        let lowered = raw.trim().to_lowercase();
        let without_notes = parenthetical().replace_all(&lowered, " ");

        // "onion, finely chopped" keeps the head; "boneless, skinless thighs"
        // skips segments made only of descriptors
        let segments: Vec<Vec<String>> = without_notes
            .split(',')
            .map(|segment| self.content_words(segment))
            .filter(|words| !words.is_empty())
            .collect();
        let words = segments
            .iter()
            .find(|words| words.iter().any(|w| !self.is_filler(w)))
            .or_else(|| segments.first())
            .cloned()
            .unwrap_or_default();

        let words = self.strip_fillers(words);
        if words.is_empty() {
            return lowered.split_whitespace().collect::<Vec<_>>().join(" ");
        }

        let phrase = words.join(" ");
        if let Some(canonical) = self.aliases.get(&phrase) {
            return canonical.clone();
        }

        let singular = self.singularize_phrase(&words);
        match self.aliases.get(&singular) {
            Some(canonical) => canonical.clone(),
            None => singular,
        }
    }

    /// Normalize a list, dropping blanks and duplicates, keeping first-seen order
    pub fn normalize_all<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut seen = HashSet::new();
        names
            .into_iter()
            .map(|name| self.normalize(name))
            .filter(|name| !name.is_empty() && seen.insert(name.clone()))
            .collect()
    }

    /// Whitespace tokens of a segment, without quantities and stray punctuation
    fn content_words(&self, segment: &str) -> Vec<String> {
        segment
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && !"½¼¾⅓⅔⅛⅜⅝⅞".contains(c)))
            .filter(|w| !w.is_empty() && !quantity_token().is_match(w))
            .map(str::to_string)
            .collect()
    }

    fn is_unit(&self, word: &str) -> bool {
        self.units.contains(word) || self.units.contains(&singularize(word))
    }

    fn is_filler(&self, word: &str) -> bool {
        self.descriptors.contains(word) || self.is_unit(word) || word == "of"
    }

    /// Drop leading units ("cups of") and descriptors, always keeping one word
    fn strip_fillers(&self, mut words: Vec<String>) -> Vec<String> {
        while words.len() > 1 && (self.is_unit(&words[0]) || words[0] == "of") {
            words.remove(0);
        }

        let mut index = 0;
        while index < words.len() && words.len() > 1 {
            if self.descriptors.contains(&words[index]) {
                words.remove(index);
            } else {
                index += 1;
            }
        }

        words
    }

    /// Singularize the head noun (last word) of a phrase
    fn singularize_phrase(&self, words: &[String]) -> String {
        let (last, rest) = match words.split_last() {
            Some(split) => split,
            None => return String::new(),
        };

        let phrase = words.join(" ");
        let head = if self.invariant_plurals.contains(last) || self.invariant_plurals.contains(&phrase)
        {
            last.clone()
        } else {
            singularize(last)
        };

        let mut out: Vec<&str> = rest.iter().map(String::as_str).collect();
        out.push(&head);
        out.join(" ")
    }
}

impl Default for IngredientNormalizer {
    fn default() -> Self {
        Self::new(
            Vec::<(String, String)>::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        )
    }
}

/// English plural to singular for ingredient nouns
pub fn singularize(word: &str) -> String {
    let len = word.chars().count();
    if len <= 3 || !word.ends_with('s') {
        return word.to_string();
    }

    if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
        return word.to_string();
    }

    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{stem}y");
    }

    if let Some(stem) = word.strip_suffix("oes") {
        return format!("{stem}o");
    }

    for suffix in ["ches", "shes", "xes", "zes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }

    word[..word.len() - 1].to_string()
}
