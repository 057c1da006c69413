// Text helpers shared by lexical matching, suggestions and embeddings
use std::collections::HashSet;

/// Lowercase, trim and collapse internal whitespace
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split into lowercase alphanumeric tokens
///
/// Mirrors tantivy's default tokenizer closely enough that tokens produced
/// here hit the terms it indexed.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .collect()
}

fn trigrams(text: &str) -> HashSet<String> {
    let mut grams = HashSet::new();

    for word in tokenize(text) {
        // Pad like pg_trgm: two spaces before, one after
        let padded: Vec<char> = format!("  {word} ").chars().collect();
        for window in padded.windows(3) {
            grams.insert(window.iter().collect());
        }
    }

    grams
}

/// Trigram similarity in [0,1]: shared trigrams over the union of both sets
pub fn trigram_similarity(a: &str, b: &str) -> f32 {
    let left = trigrams(a);
    let right = trigrams(b);

    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let shared = left.intersection(&right).count();
    let union = left.len() + right.len() - shared;
    shared as f32 / union as f32
}
