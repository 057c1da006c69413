pub mod reference;

use crate::error::{Error, Result};
use crate::ingredients::MatchConfig;
use crate::search::RankingConfig;
use crate::utils::validation::validate_service_url;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub search: SearchConfig,
    pub embedding: EmbeddingConfig,
    pub ranking: RankingConfig,
    pub matching: MatchConfig,
    pub catalog: CatalogConfig,
    /// YAML file with aliases, staples and substitutions; the built-in
    /// tables are used when it does not exist
    pub reference_data_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            server: ServerConfig::default(),
            search: SearchConfig::default(),
            embedding: EmbeddingConfig::default(),
            ranking: RankingConfig::default(),
            matching: MatchConfig::default(),
            catalog: CatalogConfig::default(),
            reference_data_path: PathBuf::from("config/reference.yaml"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:./data/recipes.db".to_string(),
            max_connections: 10,
            min_connections: 1,
            connection_timeout_seconds: 30,
            idle_timeout_seconds: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub api_rate_limit: u64,
    pub max_request_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            api_rate_limit: 100,
            max_request_body_size: 1_048_576,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    /// Semantic floor on the [0,1] similarity scale
    pub min_similarity: f32,
    /// Trigram similarity needed for a fuzzy lexical or suggestion match
    pub fuzzy_threshold: f32,
    /// Discount applied to lexical relevance when no semantic value exists
    pub lexical_similarity_factor: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
            min_similarity: 0.3,
            fuzzy_threshold: 0.3,
            lexical_similarity_factor: 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// `hash` or `openai`
    pub backend: String,
    pub api_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub dimension: usize,
    /// Bound on the embedding call and on the vector index query
    pub timeout_ms: u64,
    /// 0 disables the query embedding cache
    pub cache_capacity: usize,
    pub cache_ttl_seconds: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: "hash".to_string(),
            api_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "text-embedding-3-small".to_string(),
            dimension: 384,
            timeout_ms: 5000,
            cache_capacity: 256,
            cache_ttl_seconds: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Seconds between snapshot reloads; 0 disables reloading
    pub refresh_interval_seconds: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            refresh_interval_seconds: 300,
        }
    }
}

/// Read and parse an environment variable, falling back to `default` when unset
fn env_or<T: FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("Invalid {name} value"))),
        Err(_) => Ok(default),
    }
}

impl Settings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Settings::default();

        let database = DatabaseConfig {
            url: env_or("DATABASE_URL", defaults.database.url)?,
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", defaults.database.max_connections)?,
            min_connections: env_or("DATABASE_MIN_CONNECTIONS", defaults.database.min_connections)?,
            connection_timeout_seconds: env_or(
                "DATABASE_CONNECTION_TIMEOUT",
                defaults.database.connection_timeout_seconds,
            )?,
            idle_timeout_seconds: env_or(
                "DATABASE_IDLE_TIMEOUT",
                defaults.database.idle_timeout_seconds,
            )?,
        };

        let server = ServerConfig {
            host: env_or("HOST", defaults.server.host)?,
            port: env_or("PORT", defaults.server.port)?,
            api_rate_limit: env_or("API_RATE_LIMIT", defaults.server.api_rate_limit)?,
            max_request_body_size: env_or(
                "MAX_REQUEST_BODY_SIZE",
                defaults.server.max_request_body_size,
            )?,
        };

        let search = SearchConfig {
            default_limit: env_or("SEARCH_DEFAULT_LIMIT", defaults.search.default_limit)?,
            max_limit: env_or("SEARCH_MAX_LIMIT", defaults.search.max_limit)?,
            min_similarity: env_or("SEARCH_MIN_SIMILARITY", defaults.search.min_similarity)?,
            fuzzy_threshold: env_or("LEXICAL_FUZZY_THRESHOLD", defaults.search.fuzzy_threshold)?,
            lexical_similarity_factor: env_or(
                "LEXICAL_SIMILARITY_FACTOR",
                defaults.search.lexical_similarity_factor,
            )?,
        };

        let embedding = EmbeddingConfig {
            backend: env_or("EMBEDDING_BACKEND", defaults.embedding.backend)?,
            api_url: env_or("EMBEDDING_API_URL", defaults.embedding.api_url)?,
            api_key: std::env::var("EMBEDDING_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            model: env_or("EMBEDDING_MODEL", defaults.embedding.model)?,
            dimension: env_or("EMBEDDING_DIMENSION", defaults.embedding.dimension)?,
            timeout_ms: env_or("EMBEDDING_TIMEOUT_MS", defaults.embedding.timeout_ms)?,
            cache_capacity: env_or("EMBEDDING_CACHE_CAPACITY", defaults.embedding.cache_capacity)?,
            cache_ttl_seconds: env_or("EMBEDDING_CACHE_TTL", defaults.embedding.cache_ttl_seconds)?,
        };

        let ranking = RankingConfig {
            similarity_weight: env_or("RANK_WEIGHT_SIMILARITY", defaults.ranking.similarity_weight)?,
            quality_weight: env_or("RANK_WEIGHT_QUALITY", defaults.ranking.quality_weight)?,
            engagement_weight: env_or("RANK_WEIGHT_ENGAGEMENT", defaults.ranking.engagement_weight)?,
            recency_weight: env_or("RANK_WEIGHT_RECENCY", defaults.ranking.recency_weight)?,
            engagement_saturation: env_or(
                "RANK_ENGAGEMENT_SATURATION",
                defaults.ranking.engagement_saturation,
            )?,
            recency_half_life_days: env_or(
                "RANK_RECENCY_HALF_LIFE_DAYS",
                defaults.ranking.recency_half_life_days,
            )?,
        };

        let matching = MatchConfig {
            min_match_percentage: env_or(
                "MATCH_MIN_PERCENTAGE",
                defaults.matching.min_match_percentage,
            )?,
            min_matched_count: env_or("MATCH_MIN_MATCHED", defaults.matching.min_matched_count)?,
        };

        let catalog = CatalogConfig {
            refresh_interval_seconds: env_or(
                "CATALOG_REFRESH_INTERVAL",
                defaults.catalog.refresh_interval_seconds,
            )?,
        };

        let reference_data_path = env_or("REFERENCE_DATA_PATH", defaults.reference_data_path)?;

        Ok(Settings {
            database,
            server,
            search,
            embedding,
            ranking,
            matching,
            catalog,
            reference_data_path,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::Config("Port must be non-zero".to_string()));
        }

        if self.server.api_rate_limit == 0 {
            return Err(Error::Config("API rate limit must be non-zero".to_string()));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(Error::Config(
                "DATABASE_MIN_CONNECTIONS cannot exceed DATABASE_MAX_CONNECTIONS".to_string(),
            ));
        }

        if self.search.default_limit == 0 || self.search.default_limit > self.search.max_limit {
            return Err(Error::Config(format!(
                "SEARCH_DEFAULT_LIMIT must be between 1 and {}",
                self.search.max_limit
            )));
        }

        for (name, value) in [
            ("SEARCH_MIN_SIMILARITY", self.search.min_similarity),
            ("LEXICAL_FUZZY_THRESHOLD", self.search.fuzzy_threshold),
            ("LEXICAL_SIMILARITY_FACTOR", self.search.lexical_similarity_factor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "{name} must be between 0 and 1, got {value}"
                )));
            }
        }

        if self.embedding.dimension == 0 {
            return Err(Error::Config("EMBEDDING_DIMENSION must be non-zero".to_string()));
        }

        if self.embedding.timeout_ms == 0 {
            return Err(Error::Config("EMBEDDING_TIMEOUT_MS must be non-zero".to_string()));
        }

        if self.embedding.backend.eq_ignore_ascii_case("openai") {
            validate_service_url(&self.embedding.api_url)?;
        }

        self.ranking.validate()?;
        self.matching.validate()?;

        Ok(())
    }
}
