use crate::error::{Error, Result};
use async_trait::async_trait;
use std::cmp::Ordering;

/// Nearest-neighbor lookup over recipe embeddings
///
/// Returns up to `k` `(recipe_id, cosine)` pairs, best first. Scores are raw
/// cosine values in [-1, 1].
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn nearest_neighbors(&self, vector: &[f32], k: usize) -> Result<Vec<(i64, f32)>>;
}

/// Cosine similarity; zero for mismatched lengths or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

/// Exhaustive cosine search over vectors held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryVectorIndex {
    dimension: Option<usize>,
    entries: Vec<(i64, Vec<f32>)>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vector; the first insert fixes the dimension
    pub fn insert(&mut self, id: i64, vector: Vec<f32>) -> Result<()> {
        match self.dimension {
            Some(dimension) if dimension != vector.len() => {
                return Err(Error::IndexQuery(format!(
                    "Recipe {id} has a {}-dim embedding, index holds {dimension}",
                    vector.len()
                )));
            }
            Some(_) => {}
            None => self.dimension = Some(vector.len()),
        }

        self.entries.push((id, vector));
        Ok(())
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Synchronous search used by the async trait impl
    pub fn search(&self, vector: &[f32], k: usize) -> Result<Vec<(i64, f32)>> {
        if let Some(dimension) = self.dimension {
            if dimension != vector.len() {
                return Err(Error::IndexQuery(format!(
                    "Query has {} dimensions, index holds {dimension}",
                    vector.len()
                )));
            }
        }

        let mut scored: Vec<(i64, f32)> = self
            .entries
            .iter()
            .map(|(id, stored)| (*id, cosine_similarity(vector, stored)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k);
        Ok(scored)
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn nearest_neighbors(&self, vector: &[f32], k: usize) -> Result<Vec<(i64, f32)>> {
        self.search(vector, k)
    }
}
