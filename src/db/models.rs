use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::FromRow;

/// Row as stored in the `recipes` table
#[derive(Debug, Clone, FromRow)]
pub struct RecipeRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub cuisine: Option<String>,
    pub difficulty: Option<String>,
    pub editorial_rating: Option<f64>,
    pub avg_user_rating: Option<f64>,
    pub rating_count: i64,
    pub prep_time_minutes: Option<i64>,
    pub cook_time_minutes: Option<i64>,
    pub is_public: bool,
    pub embedding: Option<Vec<u8>>,
    pub embedding_model: Option<String>,
    pub embedding_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct RecipeIngredient {
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
}

/// Embedding vector persisted alongside a recipe
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEmbedding {
    pub vector: Vec<f32>,
    pub model: Option<String>,
    /// Hash of the canonical text the vector was generated from
    pub content_hash: Option<String>,
}

impl StoredEmbedding {
    /// Decode a little-endian f32 blob
    pub fn from_blob(blob: &[u8]) -> Option<Vec<f32>> {
        if blob.is_empty() || blob.len() % 4 != 0 {
            return None;
        }

        Some(
            blob.chunks_exact(4)
                .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                .collect(),
        )
    }

    /// Encode a vector as a little-endian f32 blob
    pub fn to_blob(vector: &[f32]) -> Vec<u8> {
        vector.iter().flat_map(|v| v.to_le_bytes()).collect()
    }
}

/// A recipe with everything ranking and matching read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub cuisine: Option<String>,
    pub difficulty: Option<String>,
    pub tags: Vec<String>,
    pub ingredients: Vec<RecipeIngredient>,
    /// Editorial rating, 0-5
    pub editorial_rating: Option<f64>,
    /// Average user rating, 0-5
    pub avg_user_rating: Option<f64>,
    pub rating_count: i64,
    pub prep_time_minutes: Option<i64>,
    pub cook_time_minutes: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub embedding: Option<StoredEmbedding>,
}

impl Recipe {
    /// Assemble a recipe from its row and child collections
    pub fn from_parts(
        row: RecipeRow,
        tags: Vec<String>,
        ingredients: Vec<RecipeIngredient>,
    ) -> Self {
        let embedding = row
            .embedding
            .as_deref()
            .and_then(StoredEmbedding::from_blob)
            .map(|vector| StoredEmbedding {
                vector,
                model: row.embedding_model.clone(),
                content_hash: row.embedding_hash.clone(),
            });

        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            cuisine: row.cuisine,
            difficulty: row.difficulty,
            tags,
            ingredients,
            editorial_rating: row.editorial_rating,
            avg_user_rating: row.avg_user_rating,
            rating_count: row.rating_count,
            prep_time_minutes: row.prep_time_minutes,
            cook_time_minutes: row.cook_time_minutes,
            created_at: row.created_at,
            updated_at: row.updated_at,
            embedding,
        }
    }

    /// Prep plus cook time, if either is known
    pub fn total_time_minutes(&self) -> Option<i64> {
        match (self.prep_time_minutes, self.cook_time_minutes) {
            (None, None) => None,
            (prep, cook) => Some(prep.unwrap_or(0) + cook.unwrap_or(0)),
        }
    }

    /// Text the recipe embedding is generated from
    pub fn canonical_text(&self) -> String {
        let mut tags = self.tags.clone();
        tags.sort();

        let ingredients = self
            .ingredients
            .iter()
            .map(|i| i.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        [
            self.name.as_str(),
            self.description.as_deref().unwrap_or(""),
            self.cuisine.as_deref().unwrap_or(""),
            &tags.join(", "),
            &ingredients,
        ]
        .join("\n")
    }

    /// SHA-256 of the canonical text, hex encoded
    pub fn canonical_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_text().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Whether the stored embedding was generated from an older version of the recipe
    pub fn has_stale_embedding(&self) -> bool {
        match &self.embedding {
            Some(embedding) => embedding.content_hash.as_deref() != Some(&self.canonical_hash()),
            None => false,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::Duration;

    /// Minimal recipe created a day ago
    pub fn recipe(id: i64, name: &str, ingredients: &[&str]) -> Recipe {
        let now = Utc::now();
        Recipe {
            id,
            name: name.to_string(),
            description: None,
            cuisine: None,
            difficulty: None,
            tags: Vec::new(),
            ingredients: ingredients
                .iter()
                .map(|name| RecipeIngredient {
                    name: name.to_string(),
                    quantity: None,
                    unit: None,
                })
                .collect(),
            editorial_rating: None,
            avg_user_rating: None,
            rating_count: 0,
            prep_time_minutes: None,
            cook_time_minutes: None,
            created_at: now - Duration::days(1),
            updated_at: now,
            embedding: None,
        }
    }
}
