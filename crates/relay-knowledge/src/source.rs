//! Article source trait and an in-memory implementation.
//!
//! - Production code fetches pages from the help center (see `relay-clients`).
//! - `StaticArticleSource` serves a fixed article list for tests and benches.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use relay_core::error::RelayError;
use relay_core::types::{Article, ArticlePage};
use tracing::{debug, warn};

/// Upper bound on pages followed in one load.
const MAX_PAGES: usize = 1_000;

/// Paginated source of knowledge-base articles.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Fetch one page of articles for `category_id`.
    ///
    /// `page_url` is `None` for the first page and the previous page's
    /// `next_page` afterwards.
    async fn fetch_page(
        &self,
        category_id: &str,
        page_url: Option<&str>,
    ) -> Result<ArticlePage, RelayError>;
}

/// Follow pagination until exhausted and return every article.
pub async fn fetch_all(
    source: &dyn ArticleSource,
    category_id: &str,
) -> Result<Vec<Article>, RelayError> {
    let mut articles = Vec::new();
    let mut next: Option<String> = None;

    for page_no in 1..=MAX_PAGES {
        let page = source.fetch_page(category_id, next.as_deref()).await?;
        debug!(page = page_no, count = page.articles.len(), "Fetched article page");
        articles.extend(page.articles);

        match page.next_page {
            Some(url) if !url.is_empty() => next = Some(url),
            _ => return Ok(articles),
        }
    }

    warn!(max_pages = MAX_PAGES, "Article pagination did not terminate, truncating");
    Ok(articles)
}

/// Serves a fixed list of articles, optionally split into pages.
#[derive(Debug, Default)]
pub struct StaticArticleSource {
    pages: Vec<Vec<Article>>,
    fail: AtomicBool,
}

impl StaticArticleSource {
    /// A single page containing `articles`.
    pub fn new(articles: Vec<Article>) -> Self {
        Self {
            pages: vec![articles],
            fail: AtomicBool::new(false),
        }
    }

    /// Split `articles` into pages of `page_size`.
    pub fn paged(articles: Vec<Article>, page_size: usize) -> Self {
        let pages = articles
            .chunks(page_size.max(1))
            .map(|chunk| chunk.to_vec())
            .collect();
        Self {
            pages,
            fail: AtomicBool::new(false),
        }
    }

    /// Make subsequent fetches fail with a retrieval error.
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::Relaxed);
    }
}

#[async_trait]
impl ArticleSource for StaticArticleSource {
    async fn fetch_page(
        &self,
        _category_id: &str,
        page_url: Option<&str>,
    ) -> Result<ArticlePage, RelayError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(RelayError::Retrieval("source unavailable".to_string()));
        }

        let page_no = match page_url {
            None => 0,
            Some(url) => url
                .strip_prefix("page:")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| RelayError::Retrieval(format!("bad page url: {}", url)))?,
        };

        let articles = self.pages.get(page_no).cloned().unwrap_or_default();
        let next_page = (page_no + 1 < self.pages.len()).then(|| format!("page:{}", page_no + 1));
        Ok(ArticlePage { articles, next_page })
    }
}
