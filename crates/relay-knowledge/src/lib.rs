//! Relay Knowledge crate - article source trait, TF-IDF vectorizer, and article index.
//!
//! Provides a cheap, explainable retrieval method over help-center articles:
//! bag-of-words TF-IDF vectors with cosine similarity, rebuilt wholesale on
//! every successful load and swapped in atomically.

pub mod index;
pub mod source;
pub mod tfidf;
pub mod tokenize;

pub use index::{ArticleIndex, IndexSettings};
pub use source::{fetch_all, ArticleSource, StaticArticleSource};
pub use tfidf::{cosine_similarity, SparseVector, TfidfVectorizer};
pub use tokenize::tokenize;
