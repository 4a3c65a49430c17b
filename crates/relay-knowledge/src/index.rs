//! In-memory article index with TF-IDF cosine similarity search.
//!
//! The index is an immutable snapshot (vocabulary + article vectors) behind
//! an `RwLock<Arc<_>>`. A reload builds the next snapshot without holding the
//! lock and swaps it in, so concurrent searches see either the old or the new
//! index, never a partial one. Search is O(n) over articles, which is fine
//! for help-center sized corpora.

use std::sync::{Arc, RwLock};

use relay_core::config::KnowledgeConfig;
use relay_core::types::{Article, ArticleHit};
use tracing::{error, info, warn};

use crate::source::{fetch_all, ArticleSource};
use crate::tfidf::{cosine_similarity, SparseVector, TfidfVectorizer};

/// Tunables for building and querying the index.
#[derive(Debug, Clone)]
pub struct IndexSettings {
    /// Vocabulary size cap.
    pub max_features: usize,
    /// Hits must score strictly above this similarity.
    pub min_similarity: f64,
    /// Characters of body kept in each hit.
    pub excerpt_chars: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self::from(&KnowledgeConfig::default())
    }
}

impl From<&KnowledgeConfig> for IndexSettings {
    fn from(config: &KnowledgeConfig) -> Self {
        Self {
            max_features: config.max_features,
            min_similarity: config.min_similarity,
            excerpt_chars: config.excerpt_chars,
        }
    }
}

#[derive(Debug)]
struct IndexedArticle {
    article: Article,
    vector: SparseVector,
}

/// One fully built generation of the index.
#[derive(Debug, Default)]
struct IndexSnapshot {
    vectorizer: Option<TfidfVectorizer>,
    articles: Vec<IndexedArticle>,
}

impl IndexSnapshot {
    fn build(articles: Vec<Article>, max_features: usize) -> Self {
        if articles.is_empty() {
            return Self::default();
        }

        let texts: Vec<String> = articles
            .iter()
            .map(|a| format!("{} {}", a.title, a.body))
            .collect();
        let (vectorizer, vectors) = TfidfVectorizer::fit_transform(&texts, max_features);

        let articles = articles
            .into_iter()
            .zip(vectors)
            .map(|(article, vector)| IndexedArticle { article, vector })
            .collect();

        Self {
            vectorizer: Some(vectorizer),
            articles,
        }
    }
}

/// Knowledge-base index owning every loaded article.
#[derive(Debug)]
pub struct ArticleIndex {
    snapshot: RwLock<Arc<IndexSnapshot>>,
    settings: IndexSettings,
}

impl ArticleIndex {
    /// Create an empty (unbuilt) index.
    pub fn new(settings: IndexSettings) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(IndexSnapshot::default())),
            settings,
        }
    }

    /// Create an index already built from `articles`.
    pub fn from_articles(articles: Vec<Article>, settings: IndexSettings) -> Self {
        let index = Self::new(settings);
        index.replace(articles);
        index
    }

    /// Fetch every article for `category_id` from `source` and rebuild.
    ///
    /// On a retrieval error the current index is left untouched and 0 is
    /// returned. Returns the number of articles loaded otherwise.
    pub async fn load(&self, source: &dyn ArticleSource, category_id: &str) -> usize {
        match fetch_all(source, category_id).await {
            Ok(articles) => {
                let count = self.replace(articles);
                info!(count, category_id, "Knowledge base loaded");
                count
            }
            Err(e) => {
                error!(error = %e, category_id, "Failed to load knowledge base articles");
                0
            }
        }
    }

    /// Replace the whole article set and rebuild vectors. Returns the count.
    pub fn replace(&self, articles: Vec<Article>) -> usize {
        let next = Arc::new(IndexSnapshot::build(articles, self.settings.max_features));
        let count = next.articles.len();
        let mut guard = match self.snapshot.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Article index lock poisoned, recovering");
                poisoned.into_inner()
            }
        };
        *guard = next;
        count
    }

    fn current(&self) -> Arc<IndexSnapshot> {
        match self.snapshot.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Return up to `top_k` articles most similar to `query`.
    ///
    /// Results are sorted by descending similarity, ties keep load order,
    /// and anything at or below the similarity threshold is dropped even if
    /// fewer than `top_k` remain. An empty or unbuilt index yields no hits.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<ArticleHit> {
        let snapshot = self.current();
        let Some(vectorizer) = snapshot.vectorizer.as_ref() else {
            warn!("Knowledge base empty or not indexed");
            return Vec::new();
        };
        if top_k == 0 {
            return Vec::new();
        }

        let query_vector = vectorizer.transform(query);
        if query_vector.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f64)> = snapshot
            .articles
            .iter()
            .enumerate()
            .map(|(idx, entry)| (idx, cosine_similarity(&query_vector, &entry.vector)))
            .filter(|(_, sim)| *sim > self.settings.min_similarity)
            .collect();

        // Stable sort keeps original order for equal scores.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        scored
            .into_iter()
            .map(|(idx, similarity)| {
                let article = &snapshot.articles[idx].article;
                ArticleHit {
                    id: article.id,
                    title: article.title.clone(),
                    body_excerpt: article.body.chars().take(self.settings.excerpt_chars).collect(),
                    url: article.url.clone(),
                    similarity,
                }
            })
            .collect()
    }

    /// Number of articles in the current snapshot.
    pub fn len(&self) -> usize {
        self.current().articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the vocabulary fitted at the last successful load.
    pub fn vocabulary_size(&self) -> usize {
        self.current()
            .vectorizer
            .as_ref()
            .map(|v| v.vocabulary_size())
            .unwrap_or(0)
    }
}

impl Default for ArticleIndex {
    fn default() -> Self {
        Self::new(IndexSettings::default())
    }
}
