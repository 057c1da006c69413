use crate::db::models::Recipe;
use crate::error::{Error, Result};
use crate::search::schema::RecipeSchema;
use crate::utils::text::{normalize_text, tokenize, trigram_similarity};
use std::cmp::Ordering;
use std::collections::HashMap;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, FuzzyTermQuery, Occur, Query, TermQuery};
use tantivy::schema::{IndexRecordOption, OwnedValue};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::debug;

/// Highest relevance any non-exact match can reach
const MAX_PARTIAL_RELEVANCE: f32 = 0.95;
/// Share of relevance carried by the normalized BM25 score
const BM25_WEIGHT: f32 = 0.9;
/// Tokens shorter than this are matched exactly only
const FUZZY_MIN_TOKEN_LEN: usize = 4;
const FUZZY_BOOST_FACTOR: f32 = 0.5;
const WRITER_MEMORY: usize = 15_000_000;

/// Keyword relevance over recipe name, description, tags and cuisine
pub struct LexicalIndex {
    reader: IndexReader,
    schema: RecipeSchema,
    names: Vec<(i64, String)>,
    fuzzy_threshold: f32,
}

impl LexicalIndex {
    /// Build an in-memory index over the given recipes
    pub fn build<'a>(
        recipes: impl IntoIterator<Item = &'a Recipe>,
        fuzzy_threshold: f32,
    ) -> Result<Self> {
        let schema = RecipeSchema::new();
        let index = Index::create_in_ram(schema.schema.clone());
        let mut writer: IndexWriter = index
            .writer_with_num_threads(1, WRITER_MEMORY)
            .map_err(|e| Error::Search(format!("Failed to create writer: {e}")))?;

        let mut names = Vec::new();
        for recipe in recipes {
            let mut document = doc!(
                schema.id => recipe.id,
                schema.name => recipe.name.clone(),
            );

            if let Some(description) = &recipe.description {
                document.add_text(schema.description, description);
            }
            if let Some(cuisine) = &recipe.cuisine {
                document.add_text(schema.cuisine, cuisine);
            }
            for tag in &recipe.tags {
                document.add_text(schema.tags, tag);
            }

            writer.add_document(document)?;
            names.push((recipe.id, normalize_text(&recipe.name)));
        }

        writer
            .commit()
            .map_err(|e| Error::Search(format!("Failed to commit: {e}")))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| Error::Search(format!("Failed to create reader: {e}")))?;

        debug!("Lexical index built with {} recipes", names.len());

        Ok(Self {
            reader,
            schema,
            names,
            fuzzy_threshold,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Documents visible to the tantivy searcher
    pub fn indexed_documents(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    fn build_query(&self, tokens: &[String]) -> BooleanQuery {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();

        for token in tokens {
            for (field, boost) in self.schema.weighted_fields() {
                let term = Term::from_field_text(field, token);
                let exact = TermQuery::new(term.clone(), IndexRecordOption::WithFreqs);
                clauses.push((Occur::Should, Box::new(BoostQuery::new(Box::new(exact), boost))));

                let fuzzy_field = field == self.schema.name || field == self.schema.tags;
                if fuzzy_field && token.chars().count() >= FUZZY_MIN_TOKEN_LEN {
                    let fuzzy = FuzzyTermQuery::new(term, 1, true);
                    clauses.push((
                        Occur::Should,
                        Box::new(BoostQuery::new(Box::new(fuzzy), boost * FUZZY_BOOST_FACTOR)),
                    ));
                }
            }
        }

        BooleanQuery::new(clauses)
    }

    /// BM25 scores of token and fuzzy-term hits, by recipe id
    fn term_scores(&self, tokens: &[String], limit: usize) -> Result<HashMap<i64, f32>> {
        if tokens.is_empty() || limit == 0 {
            return Ok(HashMap::new());
        }

        let searcher = self.reader.searcher();
        let query = self.build_query(tokens);
        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(limit))
            .map_err(|e| Error::Search(format!("Search failed: {e}")))?;

        let mut scores = HashMap::new();
        for (score, address) in top_docs {
            let document: TantivyDocument = searcher.doc(address)?;
            if let Some(OwnedValue::I64(id)) = document.get_first(self.schema.id) {
                scores.insert(*id, score);
            }
        }

        Ok(scores)
    }

    /// Up to `k` `(recipe_id, relevance)` pairs, best first
    ///
    /// An exact name match scores 1.0. Anything else scores
    /// `min(0.95, max(0.9 * bm25 / bm25_max, trigram(name, query)))`.
    pub fn search(&self, text: &str, k: usize) -> Result<Vec<(i64, f32)>> {
        let query = normalize_text(text);
        let tokens = tokenize(&query);
        let fetch = k.saturating_mul(4).max(50).min(self.names.len());
        let bm25 = self.term_scores(&tokens, fetch)?;
        let bm25_max = bm25.values().copied().fold(0.0f32, f32::max);

        let mut hits: Vec<(i64, f32)> = self
            .names
            .iter()
            .filter_map(|(id, name)| {
                if *name == query {
                    return Some((*id, 1.0));
                }

                let trigram = trigram_similarity(name, &query);
                let term = match bm25.get(id) {
                    Some(score) if bm25_max > 0.0 => BM25_WEIGHT * score / bm25_max,
                    Some(_) => 0.0,
                    None if trigram >= self.fuzzy_threshold => 0.0,
                    None => return None,
                };

                Some((*id, term.max(trigram).min(MAX_PARTIAL_RELEVANCE)))
            })
            .collect();

        hits.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        hits.truncate(k);

        debug!("Lexical retrieval for '{}': {} hits", query, hits.len());
        Ok(hits)
    }
}

impl std::fmt::Debug for LexicalIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LexicalIndex")
            .field("documents", &self.names.len())
            .field("fuzzy_threshold", &self.fuzzy_threshold)
            .finish_non_exhaustive()
    }
}
