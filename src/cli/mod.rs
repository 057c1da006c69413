pub mod commands;

use crate::ingredients::SortMode;
use crate::search::SearchMode;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "pantry-search")]
#[command(about = "Recipe search and pantry matching", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the API server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long, env = "HOST")]
        host: Option<String>,
    },

    /// Run database migrations
    Migrate,

    /// Search recipes
    Search {
        /// Search query
        query: String,

        #[arg(short, long, value_enum, default_value_t = ModeArg::Hybrid)]
        mode: ModeArg,

        /// Only recipes of this cuisine
        #[arg(long)]
        cuisine: Option<String>,

        /// Only recipes of this difficulty
        #[arg(long)]
        difficulty: Option<String>,

        /// Minimum similarity on the 0-1 scale
        #[arg(long)]
        min_similarity: Option<f32>,

        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Find recipes cookable from on-hand ingredients
    Cook {
        /// Comma-separated ingredients, e.g. "eggs, butter, flour"
        ingredients: String,

        #[arg(short, long, value_enum, default_value_t = SortArg::BestMatch)]
        sort: SortArg,

        /// Minimum match percentage
        #[arg(long)]
        min_match: Option<u8>,

        /// Only recipes of this cuisine
        #[arg(long)]
        cuisine: Option<String>,

        #[arg(short, long)]
        limit: Option<usize>,

        /// Count pantry staples like any other ingredient
        #[arg(long)]
        no_staples: bool,

        /// List substitutes for missing ingredients
        #[arg(long)]
        substitutions: bool,
    },

    /// Show substitutes for an ingredient
    Substitute {
        ingredient: String,

        /// Comma-separated on-hand ingredients
        #[arg(long)]
        on_hand: Option<String>,
    },

    /// Generate embeddings for recipes that are missing them or are stale
    Backfill {
        /// Concurrent embedding requests
        #[arg(short, long, default_value_t = 4)]
        concurrency: usize,

        /// Re-embed every public recipe
        #[arg(long)]
        force: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeArg {
    Semantic,
    Lexical,
    Hybrid,
}

impl From<ModeArg> for SearchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Semantic => SearchMode::Semantic,
            ModeArg::Lexical => SearchMode::Lexical,
            ModeArg::Hybrid => SearchMode::Hybrid,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortArg {
    BestMatch,
    FewestMissing,
    Quickest,
}

impl From<SortArg> for SortMode {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::BestMatch => SortMode::BestMatch,
            SortArg::FewestMissing => SortMode::FewestMissing,
            SortArg::Quickest => SortMode::Quickest,
        }
    }
}

/// Split a comma-separated argument, dropping blanks
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cook() {
        let cli = Cli::parse_from([
            "pantry-search",
            "cook",
            "eggs, flour,, milk",
            "--sort",
            "fewest-missing",
            "--substitutions",
        ]);

        match cli.command {
            Commands::Cook {
                ingredients,
                sort,
                substitutions,
                no_staples,
                ..
            } => {
                assert_eq!(split_list(&ingredients), vec!["eggs", "flour", "milk"]);
                assert_eq!(SortMode::from(sort), SortMode::FewestMissing);
                assert!(substitutions);
                assert!(!no_staples);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_search_defaults() {
        let cli = Cli::parse_from(["pantry-search", "search", "tomato soup"]);
        match cli.command {
            Commands::Search { query, mode, limit, .. } => {
                assert_eq!(query, "tomato soup");
                assert_eq!(SearchMode::from(mode), SearchMode::Hybrid);
                assert_eq!(limit, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
