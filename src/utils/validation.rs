// Validation utilities
use crate::error::{Error, Result};
use url::Url;

/// Longest query text accepted, in characters
pub const MAX_QUERY_LENGTH: usize = 500;

/// Most ingredients accepted in one ingredient query
pub const MAX_INGREDIENTS: usize = 100;

/// Validate free-text search input; empty input is never treated as a wildcard
pub fn validate_query_text(text: &str) -> Result<&str> {
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return Err(Error::Validation(
            "Search query must not be empty".to_string(),
        ));
    }

    if trimmed.chars().count() > MAX_QUERY_LENGTH {
        return Err(Error::Validation(format!(
            "Search query is longer than {MAX_QUERY_LENGTH} characters"
        )));
    }

    Ok(trimmed)
}

/// Validate an on-hand ingredient list; returns the non-blank entries
pub fn validate_ingredient_list(ingredients: &[String]) -> Result<Vec<&str>> {
    let names: Vec<&str> = ingredients
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .collect();

    if names.is_empty() {
        return Err(Error::Validation(
            "Ingredient list must contain at least one ingredient".to_string(),
        ));
    }

    if names.len() > MAX_INGREDIENTS {
        return Err(Error::Validation(format!(
            "Ingredient list has {} entries, maximum is {MAX_INGREDIENTS}",
            names.len()
        )));
    }

    Ok(names)
}

/// Validate a result limit against a configured maximum
pub fn validate_limit(limit: usize, max: usize) -> Result<usize> {
    if limit == 0 {
        return Err(Error::Validation("Limit must be at least 1".to_string()));
    }
    Ok(limit.min(max))
}

/// Validate a similarity threshold on the [0,1] scale
pub fn validate_similarity(value: f32) -> Result<f32> {
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::Validation(format!(
            "Similarity threshold must be between 0 and 1, got {value}"
        )));
    }
    Ok(value)
}

/// Validate the embedding service URL
pub fn validate_service_url(url_str: &str) -> Result<Url> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "http" | "https" => {}
        _ => {
            return Err(Error::Config(format!(
                "Embedding service URL must use http or https scheme: {url_str}"
            )));
        }
    }

    if url.host_str().is_none() {
        return Err(Error::Config(
            "Embedding service URL must have a valid host".to_string(),
        ));
    }

    Ok(url)
}
