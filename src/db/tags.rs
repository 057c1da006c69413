use crate::db::DbPool;
use crate::error::Result;
use std::collections::HashMap;

/// Get tag names for a recipe
pub async fn get_tags_for_recipe(pool: &DbPool, recipe_id: i64) -> Result<Vec<String>> {
    let tags: Vec<String> =
        sqlx::query_scalar("SELECT tag FROM recipe_tags WHERE recipe_id = ? ORDER BY tag")
            .bind(recipe_id)
            .fetch_all(pool)
            .await?;

    Ok(tags)
}

/// Get tags for multiple recipes in a single query (batch loading to avoid N+1)
pub async fn get_tags_for_recipes(
    pool: &DbPool,
    recipe_ids: &[i64],
) -> Result<HashMap<i64, Vec<String>>> {
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
        SELECT recipe_id, tag
        FROM recipe_tags
        WHERE recipe_id IN ({placeholders})
        ORDER BY recipe_id, tag
        "#
    );

    let mut query = sqlx::query_as::<_, (i64, String)>(&query_str);
    for id in recipe_ids {
        query = query.bind(id);
    }

    let rows: Vec<(i64, String)> = query.fetch_all(pool).await?;
    Ok(group_tags(rows, recipe_ids.iter().copied()))
}

/// Get tags for every recipe
pub async fn get_all_recipe_tags(pool: &DbPool) -> Result<HashMap<i64, Vec<String>>> {
    let rows: Vec<(i64, String)> =
        sqlx::query_as("SELECT recipe_id, tag FROM recipe_tags ORDER BY recipe_id, tag")
            .fetch_all(pool)
            .await?;

    Ok(group_tags(rows, std::iter::empty()))
}

/// Distinct tags with usage count, most used first
pub async fn get_tags_with_count(pool: &DbPool) -> Result<Vec<(String, i64)>> {
    let tags: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT tag, COUNT(*) as count
        FROM recipe_tags
        GROUP BY tag
        ORDER BY count DESC, tag
        LIMIT 1000
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(tags)
}

fn group_tags(
    rows: Vec<(i64, String)>,
    expected_ids: impl Iterator<Item = i64>,
) -> HashMap<i64, Vec<String>> {
    let mut tags_map: HashMap<i64, Vec<String>> = HashMap::new();
    for (recipe_id, tag) in rows {
        tags_map.entry(recipe_id).or_default().push(tag);
    }

    // Ensure all requested recipe_ids have an entry (even if empty)
    for recipe_id in expected_ids {
        tags_map.entry(recipe_id).or_default();
    }

    tags_map
}
