use crate::db::{models::RecipeIngredient, DbPool};
use crate::error::Result;
use sqlx::FromRow;
use std::collections::HashMap;

#[derive(Debug, FromRow)]
struct IngredientRow {
    recipe_id: i64,
    name: String,
    quantity: Option<f64>,
    unit: Option<String>,
}

/// Get ingredients for a recipe, in recipe order
pub async fn get_recipe_ingredients(
    pool: &DbPool,
    recipe_id: i64,
) -> Result<Vec<RecipeIngredient>> {
    let ingredients = sqlx::query_as::<_, RecipeIngredient>(
        r#"
        SELECT name, quantity, unit
        FROM recipe_ingredients
        WHERE recipe_id = ?
        ORDER BY position
        "#,
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;

    Ok(ingredients)
}

/// Get ingredients for multiple recipes in a single query
pub async fn get_ingredients_for_recipes(
    pool: &DbPool,
    recipe_ids: &[i64],
) -> Result<HashMap<i64, Vec<RecipeIngredient>>> {
    if recipe_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders = recipe_ids
        .iter()
        .enumerate()
        .map(|(i, _)| format!("?{}", i + 1))
        .collect::<Vec<_>>()
        .join(",");

    let query_str = format!(
        r#"
        SELECT recipe_id, name, quantity, unit
        FROM recipe_ingredients
        WHERE recipe_id IN ({placeholders})
        ORDER BY recipe_id, position
        "#
    );

    let mut query = sqlx::query_as::<_, IngredientRow>(&query_str);
    for id in recipe_ids {
        query = query.bind(id);
    }

    Ok(group_ingredients(query.fetch_all(pool).await?))
}

/// Get ingredients for every recipe
pub async fn get_all_recipe_ingredients(
    pool: &DbPool,
) -> Result<HashMap<i64, Vec<RecipeIngredient>>> {
    let rows = sqlx::query_as::<_, IngredientRow>(
        "SELECT recipe_id, name, quantity, unit FROM recipe_ingredients ORDER BY recipe_id, position",
    )
    .fetch_all(pool)
    .await?;

    Ok(group_ingredients(rows))
}

fn group_ingredients(rows: Vec<IngredientRow>) -> HashMap<i64, Vec<RecipeIngredient>> {
    let mut map: HashMap<i64, Vec<RecipeIngredient>> = HashMap::new();
    for row in rows {
        map.entry(row.recipe_id).or_default().push(RecipeIngredient {
            name: row.name,
            quantity: row.quantity,
            unit: row.unit,
        });
    }
    map
}
