#![allow(dead_code)]

use async_trait::async_trait;
use pantry_search::catalog::{self, CatalogHandle};
use pantry_search::cli::commands;
use pantry_search::config::reference::ReferenceData;
use pantry_search::db::{self, DbPool};
use pantry_search::search::EmbeddingProvider;
use pantry_search::utils::text::tokenize;
use pantry_search::{Error, RecipeEngine, Result, Settings};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use std::time::Duration;

/// Words the keyword embedder has a dimension for
pub const VOCABULARY: &[&str] = &[
    "tomato", "soup", "pasta", "garlic", "curry", "chicken", "rice", "lemon", "chocolate",
    "cake", "bean", "stew", "spicy", "basil", "butter",
];

/// One dimension per vocabulary word; cosine is word overlap
#[derive(Debug, Clone, Default)]
pub struct KeywordEmbedder;

impl KeywordEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; VOCABULARY.len()];
        for token in tokenize(text) {
            let token = token.trim_end_matches('s');
            if let Some(i) = VOCABULARY.iter().position(|w| *w == token) {
                vector[i] += 1.0;
            }
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(Self::vector(text))
    }

    fn dimension(&self) -> usize {
        VOCABULARY.len()
    }

    fn model_name(&self) -> &str {
        "keyword-test"
    }
}

/// Never answers within any reasonable timeout
pub struct StalledEmbedder;

#[async_trait]
impl EmbeddingProvider for StalledEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(vec![0.0; VOCABULARY.len()])
    }

    fn dimension(&self) -> usize {
        VOCABULARY.len()
    }

    fn model_name(&self) -> &str {
        "keyword-test"
    }
}

/// Fails every call like an unreachable service
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::Embedding("connection refused".to_string()))
    }

    fn dimension(&self) -> usize {
        VOCABULARY.len()
    }

    fn model_name(&self) -> &str {
        "keyword-test"
    }
}

pub struct SeedRecipe<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub cuisine: Option<&'a str>,
    pub difficulty: Option<&'a str>,
    pub tags: &'a [&'a str],
    pub ingredients: &'a [&'a str],
    pub editorial_rating: Option<f64>,
    pub rating_count: i64,
    pub prep_time_minutes: Option<i64>,
    pub cook_time_minutes: Option<i64>,
    pub is_public: bool,
}

impl<'a> SeedRecipe<'a> {
    pub fn new(name: &'a str, ingredients: &'a [&'a str]) -> Self {
        Self {
            name,
            description: None,
            cuisine: None,
            difficulty: None,
            tags: &[],
            ingredients,
            editorial_rating: None,
            rating_count: 0,
            prep_time_minutes: None,
            cook_time_minutes: None,
            is_public: true,
        }
    }
}

/// Fresh single-connection in-memory database with migrations applied
pub async fn test_pool() -> DbPool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

pub async fn insert_recipe(pool: &DbPool, seed: &SeedRecipe<'_>) -> i64 {
    let id = sqlx::query(
        r#"
        INSERT INTO recipes (name, description, cuisine, difficulty, editorial_rating,
                             rating_count, prep_time_minutes, cook_time_minutes, is_public)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(seed.name)
    .bind(seed.description)
    .bind(seed.cuisine)
    .bind(seed.difficulty)
    .bind(seed.editorial_rating)
    .bind(seed.rating_count)
    .bind(seed.prep_time_minutes)
    .bind(seed.cook_time_minutes)
    .bind(seed.is_public)
    .execute(pool)
    .await
    .expect("Failed to insert recipe")
    .last_insert_rowid();

    for tag in seed.tags {
        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag) VALUES (?, ?)")
            .bind(id)
            .bind(*tag)
            .execute(pool)
            .await
            .expect("Failed to insert tag");
    }

    for (position, name) in seed.ingredients.iter().enumerate() {
        sqlx::query("INSERT INTO recipe_ingredients (recipe_id, position, name) VALUES (?, ?, ?)")
            .bind(id)
            .bind(position as i64)
            .bind(*name)
            .execute(pool)
            .await
            .expect("Failed to insert ingredient");
    }

    id
}

/// A small corpus covering search and matching scenarios
pub async fn seed_corpus(pool: &DbPool) {
    let corpus = [
        SeedRecipe {
            description: Some("Slow simmered tomato soup with basil"),
            cuisine: Some("Italian"),
            difficulty: Some("easy"),
            tags: &["soup", "vegetarian"],
            editorial_rating: Some(4.5),
            rating_count: 40,
            prep_time_minutes: Some(10),
            cook_time_minutes: Some(30),
            ..SeedRecipe::new("Tomato Soup", &["tomatoes", "onion", "garlic", "butter", "salt"])
        },
        SeedRecipe {
            description: Some("Weeknight pasta with plenty of garlic"),
            cuisine: Some("Italian"),
            difficulty: Some("easy"),
            tags: &["pasta"],
            prep_time_minutes: Some(5),
            cook_time_minutes: Some(15),
            ..SeedRecipe::new("Garlic Butter Pasta", &["pasta", "garlic", "butter", "parmesan"])
        },
        SeedRecipe {
            description: Some("Fragrant chicken curry"),
            cuisine: Some("Indian"),
            difficulty: Some("medium"),
            tags: &["spicy", "curry"],
            rating_count: 120,
            ..SeedRecipe::new(
                "Chicken Curry",
                &["chicken", "onion", "garlic", "ginger", "curry powder", "rice"],
            )
        },
        SeedRecipe {
            description: Some("Bright lemon chicken with rice"),
            cuisine: Some("Greek"),
            cook_time_minutes: Some(45),
            ..SeedRecipe::new(
                "Lemon Chicken and Rice",
                &["chicken", "rice", "garlic", "lemon", "olive oil"],
            )
        },
        SeedRecipe {
            description: Some("Dense chocolate cake"),
            tags: &["dessert"],
            ..SeedRecipe::new("Chocolate Cake", &["flour", "sugar", "cocoa", "eggs", "butter"])
        },
        SeedRecipe {
            description: Some("Hearty bean stew with tomatoes"),
            tags: &["stew"],
            ..SeedRecipe::new("Bean Stew", &["beans", "tomato", "onion", "carrot"])
        },
        SeedRecipe {
            is_public: false,
            ..SeedRecipe::new("Secret Tomato Sauce", &["tomato", "garlic"])
        },
        SeedRecipe::new("Glass of Water", &["water"]),
    ];

    for seed in &corpus {
        insert_recipe(pool, seed).await;
    }
}

/// Seeded store with keyword embeddings written back by the backfill command
pub async fn seeded_pool() -> DbPool {
    let pool = test_pool().await;
    seed_corpus(&pool).await;

    let report = commands::backfill(&pool, Arc::new(KeywordEmbedder), 2, false)
        .await
        .expect("Backfill failed");
    assert_eq!(report.failed, 0);

    pool
}

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.embedding.timeout_ms = 50;
    settings
}

/// Engine over the store's current public recipes
pub async fn engine_with(
    pool: &DbPool,
    embedder: Arc<dyn EmbeddingProvider>,
    settings: &Settings,
) -> RecipeEngine {
    let catalog = catalog::load(pool, settings.search.fuzzy_threshold)
        .await
        .expect("Failed to load catalog");

    RecipeEngine::new(
        CatalogHandle::new(catalog),
        embedder,
        &ReferenceData::builtin().expect("Built-in reference data is valid"),
        settings,
    )
    .expect("Failed to build engine")
}
