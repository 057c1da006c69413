use crate::search::query::MatchSource;
use std::collections::BTreeMap;

/// A deduplicated candidate ready for ranking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub recipe_id: i64,
    pub similarity: f32,
    pub source: MatchSource,
}

#[derive(Debug, Clone, Copy, Default)]
struct Signals {
    semantic: Option<f32>,
    lexical: Option<f32>,
}

/// Resolve one recipe's signals into a similarity and its source tag
///
/// The semantic value is authoritative whenever present; lexical relevance
/// alone is discounted by `lexical_factor`.
fn reduce(signals: Signals, lexical_factor: f32) -> Option<(f32, MatchSource)> {
    match (signals.semantic, signals.lexical) {
        (Some(semantic), Some(_)) => Some((semantic, MatchSource::Both)),
        (Some(semantic), None) => Some((semantic, MatchSource::Semantic)),
        (None, Some(relevance)) => Some((
            (relevance * lexical_factor).clamp(0.0, 1.0),
            MatchSource::Lexical,
        )),
        (None, None) => None,
    }
}

/// Union two retrieval paths by recipe id
///
/// Output is in id order; final ordering belongs to ranking.
pub fn merge(semantic: &[(i64, f32)], lexical: &[(i64, f32)], lexical_factor: f32) -> Vec<Candidate> {
    let mut by_id: BTreeMap<i64, Signals> = BTreeMap::new();

    for (id, similarity) in semantic {
        let entry = by_id.entry(*id).or_default();
        entry.semantic = Some(entry.semantic.map_or(*similarity, |s| s.max(*similarity)));
    }
    for (id, relevance) in lexical {
        let entry = by_id.entry(*id).or_default();
        entry.lexical = Some(entry.lexical.map_or(*relevance, |r| r.max(*relevance)));
    }

    by_id
        .into_iter()
        .filter_map(|(recipe_id, signals)| {
            reduce(signals, lexical_factor).map(|(similarity, source)| Candidate {
                recipe_id,
                similarity,
                source,
            })
        })
        .collect()
}
