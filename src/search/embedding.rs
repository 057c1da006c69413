use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use crate::utils::text::tokenize;
use async_trait::async_trait;
use lru::LruCache;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Produces fixed-dimension vectors for text
///
/// Implementations never retry; callers bound each call with their own timeout.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn dimension(&self) -> usize;

    /// Identifier stored next to generated vectors
    fn model_name(&self) -> &str;
}

/// Build the configured embedding backend, wrapped in a query cache when enabled
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    if config.dimension == 0 {
        return Err(Error::Config(
            "EMBEDDING_DIMENSION must be greater than 0".to_string(),
        ));
    }

    let provider: Arc<dyn EmbeddingProvider> = match config.backend.trim().to_lowercase().as_str() {
        "" | "hash" => Arc::new(HashEmbedder::new(config.dimension)),
        "openai" => Arc::new(OpenAiEmbedding::new(
            &config.api_url,
            config.api_key.clone(),
            &config.model,
            config.dimension,
        )?),
        other => {
            return Err(Error::Config(format!(
                "Unknown embedding backend: {other}"
            )))
        }
    };

    info!(
        "Embedding backend: {} ({} dimensions)",
        provider.model_name(),
        provider.dimension()
    );

    match NonZeroUsize::new(config.cache_capacity) {
        Some(capacity) => Ok(Arc::new(CachedEmbedder::new(
            provider,
            capacity,
            Duration::from_secs(config.cache_ttl_seconds),
        ))),
        None => Ok(provider),
    }
}

const HASH_MODEL_NAME: &str = "fnv1a-hash";
const HASH_SLOTS_PER_FEATURE: u64 = 4;

/// Deterministic offline embeddings from hashed tokens and bigrams
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self { dimension: 384 }
    }
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Embed synchronously; blank text gives the zero vector
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        if self.dimension == 0 {
            return vector;
        }

        let tokens = tokenize(text);
        for token in &tokens {
            self.accumulate(&mut vector, token, 1.0);
        }
        for pair in tokens.windows(2) {
            self.accumulate(&mut vector, &format!("{} {}", pair[0], pair[1]), 0.5);
        }

        l2_normalize(&mut vector);
        vector
    }

    fn accumulate(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let base = fnv1a(feature.as_bytes());
        for slot in 0..HASH_SLOTS_PER_FEATURE {
            let hash = fnv1a(&[base.to_le_bytes(), slot.to_le_bytes()].concat());
            let index = (hash >> 1) as usize % vector.len();
            vector[index] += if hash & 1 == 0 { weight } else { -weight };
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        HASH_MODEL_NAME
    }
}

fn fnv1a(data: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    data.iter().fold(OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(PRIME)
    })
}

fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    dimensions: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Client for an OpenAI-compatible `/embeddings` endpoint
#[derive(Debug, Clone)]
pub struct OpenAiEmbedding {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
}

impl OpenAiEmbedding {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: &str,
        dimension: usize,
    ) -> Result<Self> {
        let base = url::Url::parse(base_url)?;
        let client = Client::builder()
            .user_agent(concat!("pantry-search/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base.as_str().trim_end_matches('/')),
            api_key,
            model: model.to_string(),
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut request = self.client.post(&self.endpoint).json(&EmbeddingRequest {
            model: &self.model,
            input: text,
            dimensions: self.dimension,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Error::Embedding(format!(
                "Embedding service returned HTTP {}",
                response.status()
            )));
        }

        let body: EmbeddingResponse = response.json().await?;
        let vector = body
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::Embedding("Embedding response contained no data".to_string()))?;

        if vector.len() != self.dimension {
            return Err(Error::Embedding(format!(
                "Expected {} dimensions, got {}",
                self.dimension,
                vector.len()
            )));
        }

        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Bounded, expiring cache of query embeddings keyed by query text
pub struct EmbeddingCache {
    entries: Mutex<LruCache<String, (Instant, Vec<f32>)>>,
    ttl: Duration,
}

impl EmbeddingCache {
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<Vec<f32>> {
        let mut entries = self.entries.lock().ok()?;
        let expired = entries.peek(key).map(|(stored, _)| stored.elapsed() >= self.ttl)?;
        if expired {
            entries.pop(key);
            return None;
        }
        entries.get(key).map(|(_, vector)| vector.clone())
    }

    pub fn insert(&self, key: String, vector: Vec<f32>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.put(key, (Instant::now(), vector));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Embedding provider that consults an [`EmbeddingCache`] first
///
/// Keys are the trimmed query text and the wrapped provider receives the
/// caller's text unchanged, so a hit returns exactly what a miss would compute.
pub struct CachedEmbedder {
    inner: Arc<dyn EmbeddingProvider>,
    cache: EmbeddingCache,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn EmbeddingProvider>, capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            inner,
            cache: EmbeddingCache::new(capacity, ttl),
        }
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }
}

#[async_trait]
impl EmbeddingProvider for CachedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let key = text.trim();
        if let Some(vector) = self.cache.get(key) {
            debug!("Embedding cache hit for '{}'", key);
            return Ok(vector);
        }

        let vector = self.inner.embed(text).await?;
        self.cache.insert(key.to_string(), vector.clone());
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::vector::cosine_similarity;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEmbedder {
        calls: AtomicUsize,
        inner: HashEmbedder,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.embed(text).await
        }

        fn dimension(&self) -> usize {
            self.inner.dimension
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    #[test]
    fn test_fnv1a_known_value() {
        assert_eq!(fnv1a(b"hello"), 0xa430d84680aabd0b);
    }

    #[test]
    fn test_hash_embedding_is_normalized_and_deterministic() {
        let embedder = HashEmbedder::new(128);
        let a = embedder.embed_text("Lemon garlic chicken");
        let b = embedder.embed_text("lemon  GARLIC chicken");

        assert_eq!(a.len(), 128);
        assert_eq!(a, b);
        let norm = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3);

        assert!(embedder.embed_text("  ").iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_hash_embedding_prefers_related_text() {
        let embedder = HashEmbedder::new(256);
        let query = embedder.embed_text("lemon chicken");
        let related = embedder.embed_text("lemon chicken with garlic");
        let unrelated = embedder.embed_text("chocolate brownie dessert");

        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_cache_hit_matches_fresh_computation() {
        let counting = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
            inner: HashEmbedder::new(64),
        });
        let cached = CachedEmbedder::new(
            counting.clone(),
            NonZeroUsize::new(8).unwrap(),
            Duration::from_secs(60),
        );

        let first = cached.embed("Lemon Chicken").await.unwrap();
        let second = cached.embed("  Lemon Chicken ").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, HashEmbedder::new(64).embed_text("Lemon Chicken"));
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cached.cache().len(), 1);
    }

    /// Second component counts uppercase characters
    struct CaseSensitiveEmbedder;

    #[async_trait]
    impl EmbeddingProvider for CaseSensitiveEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let upper = text.chars().filter(|c| c.is_uppercase()).count();
            Ok(vec![1.0, upper as f32])
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "case-sensitive"
        }
    }

    #[tokio::test]
    async fn test_cache_passes_caller_text_through() {
        let fresh = CaseSensitiveEmbedder.embed("Lemon Chicken").await.unwrap();
        let cached = CachedEmbedder::new(
            Arc::new(CaseSensitiveEmbedder),
            NonZeroUsize::new(8).unwrap(),
            Duration::from_secs(60),
        );

        let miss = cached.embed("Lemon Chicken").await.unwrap();
        let hit = cached.embed("Lemon Chicken").await.unwrap();
        assert_eq!(miss, fresh);
        assert_eq!(hit, fresh);

        // Different casing is a different query
        let lower = cached.embed("lemon chicken").await.unwrap();
        assert_eq!(lower, vec![1.0, 0.0]);
        assert_eq!(cached.cache().len(), 2);
    }

    #[tokio::test]
    async fn test_cache_entries_expire() {
        let counting = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
            inner: HashEmbedder::new(16),
        });
        let cached = CachedEmbedder::new(
            counting.clone(),
            NonZeroUsize::new(8).unwrap(),
            Duration::ZERO,
        );

        cached.embed("soup").await.unwrap();
        cached.embed("soup").await.unwrap();
        assert_eq!(counting.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_build_embedder() {
        let mut config = EmbeddingConfig::default();
        let embedder = build_embedder(&config).unwrap();
        assert_eq!(embedder.dimension(), 384);
        assert_eq!(embedder.model_name(), HASH_MODEL_NAME);

        config.backend = "word2vec".to_string();
        assert!(matches!(build_embedder(&config), Err(Error::Config(_))));

        config.backend = "hash".to_string();
        config.dimension = 0;
        assert!(build_embedder(&config).is_err());
    }

    #[tokio::test]
    async fn test_openai_embedding_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/embeddings")
            .match_header("authorization", "Bearer test-key")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "text-embedding-3-small",
                "input": "lemon chicken"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"embedding":[0.6,0.8,0.0],"index":0}]}"#)
            .create_async()
            .await;

        let client = OpenAiEmbedding::new(
            &format!("{}/v1", server.url()),
            Some("test-key".to_string()),
            "text-embedding-3-small",
            3,
        )
        .unwrap();

        let vector = client.embed("lemon chicken").await.unwrap();
        assert_eq!(vector, vec![0.6, 0.8, 0.0]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_openai_embedding_errors() {
        let mut server = mockito::Server::new_async().await;
        let _unavailable = server
            .mock("POST", "/embeddings")
            .with_status(503)
            .create_async()
            .await;

        let client = OpenAiEmbedding::new(&server.url(), None, "m", 3).unwrap();
        let err = client.embed("soup").await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));

        let mut server = mockito::Server::new_async().await;
        let _wrong_size = server
            .mock("POST", "/embeddings")
            .with_status(200)
            .with_body(r#"{"data":[{"embedding":[1.0]}]}"#)
            .create_async()
            .await;

        let client = OpenAiEmbedding::new(&server.url(), None, "m", 3).unwrap();
        let err = client.embed("soup").await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
    }
}
