pub mod config;
pub mod db;
pub mod error;

// Retrieval and matching
pub mod catalog;
pub mod ingredients;
pub mod search;

pub mod engine;

// Outer surfaces
pub mod api;
pub mod cli;

// Utilities
pub mod utils;

// Re-exports
pub use config::Settings;
pub use engine::RecipeEngine;
pub use error::{Error, Result};
