use crate::db::{ingredients, models::*, tags, DbPool};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Read-only recipe filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeFilter {
    pub cuisine: Option<String>,
    pub tag: Option<String>,
}

/// Attach tags and ingredients to a batch of rows
async fn hydrate(pool: &DbPool, rows: Vec<RecipeRow>) -> Result<Vec<Recipe>> {
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut tags_map = tags::get_tags_for_recipes(pool, &ids).await?;
    let mut ingredients_map = ingredients::get_ingredients_for_recipes(pool, &ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let tags = tags_map.remove(&row.id).unwrap_or_default();
            let ingredients = ingredients_map.remove(&row.id).unwrap_or_default();
            Recipe::from_parts(row, tags, ingredients)
        })
        .collect())
}

/// Load every public recipe with tags and ingredients
pub async fn list_public_recipes(pool: &DbPool) -> Result<Vec<Recipe>> {
    let rows = sqlx::query_as::<_, RecipeRow>(
        "SELECT * FROM recipes WHERE is_public = 1 ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    // Whole-table child loads avoid an IN clause with thousands of ids
    let mut tags_map = tags::get_all_recipe_tags(pool).await?;
    let mut ingredients_map = ingredients::get_all_recipe_ingredients(pool).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let tags = tags_map.remove(&row.id).unwrap_or_default();
            let ingredients = ingredients_map.remove(&row.id).unwrap_or_default();
            Recipe::from_parts(row, tags, ingredients)
        })
        .collect())
}

/// Get recipe by ID
pub async fn get_recipe(pool: &DbPool, recipe_id: i64) -> Result<Recipe> {
    let row = sqlx::query_as::<_, RecipeRow>("SELECT * FROM recipes WHERE id = ?")
        .bind(recipe_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Recipe {recipe_id} not found")))?;

    let tags = tags::get_tags_for_recipe(pool, recipe_id).await?;
    let ingredients = ingredients::get_recipe_ingredients(pool, recipe_id).await?;

    Ok(Recipe::from_parts(row, tags, ingredients))
}

/// Get several recipes by ID, in ascending ID order; unknown IDs are skipped
pub async fn get_recipes_by_ids(pool: &DbPool, recipe_ids: &[i64]) -> Result<Vec<Recipe>> {
    if recipe_ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = recipe_ids
        .iter()
        .enumerate()
        .map(|(i, _)| format!("?{}", i + 1))
        .collect::<Vec<_>>()
        .join(",");

    let query_str = format!("SELECT * FROM recipes WHERE id IN ({placeholders}) ORDER BY id");
    let mut query = sqlx::query_as::<_, RecipeRow>(&query_str);
    for id in recipe_ids {
        query = query.bind(id);
    }

    let rows = query.fetch_all(pool).await?;
    hydrate(pool, rows).await
}

/// List public recipes matching a cuisine and/or tag filter
pub async fn list_recipes(
    pool: &DbPool,
    filter: &RecipeFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<Recipe>> {
    let rows = sqlx::query_as::<_, RecipeRow>(
        r#"
        SELECT r.* FROM recipes r
        WHERE r.is_public = 1
          AND (?1 IS NULL OR LOWER(r.cuisine) = LOWER(?1))
          AND (?2 IS NULL OR EXISTS (
                SELECT 1 FROM recipe_tags rt
                WHERE rt.recipe_id = r.id AND LOWER(rt.tag) = LOWER(?2)))
        ORDER BY r.created_at DESC, r.id DESC
        LIMIT ?3 OFFSET ?4
        "#,
    )
    .bind(filter.cuisine.as_deref())
    .bind(filter.tag.as_deref())
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    hydrate(pool, rows).await
}

/// Count public recipes
pub async fn count_public_recipes(pool: &DbPool) -> Result<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE is_public = 1")
        .fetch_one(pool)
        .await?;
    Ok(count.0)
}

/// Store a freshly generated embedding for a recipe
///
/// Leaves `updated_at` untouched.
pub async fn update_embedding(
    pool: &DbPool,
    recipe_id: i64,
    vector: &[f32],
    model: &str,
    content_hash: &str,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE recipes
        SET embedding = ?, embedding_model = ?, embedding_hash = ?
        WHERE id = ?
        "#,
    )
    .bind(StoredEmbedding::to_blob(vector))
    .bind(model)
    .bind(content_hash)
    .bind(recipe_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Recipe {recipe_id} not found")));
    }

    tracing::debug!(
        "Stored {}-dim embedding for recipe {}",
        vector.len(),
        recipe_id
    );

    Ok(())
}
