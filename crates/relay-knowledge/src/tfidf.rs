//! Sparse TF-IDF vectorizer.
//!
//! Term weights are raw term frequency times smoothed inverse document
//! frequency, `ln((1 + n) / (1 + df)) + 1`, and every vector is L2-normalized.
//! The vocabulary is fitted once per corpus and capped to the most frequent
//! terms.

use std::collections::HashMap;

use crate::tokenize::tokenize;

/// A sparse vector stored as `(term index, weight)` pairs sorted by index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    /// Build from unsorted pairs. Duplicate indices are summed.
    pub fn from_pairs(mut pairs: Vec<(usize, f64)>) -> Self {
        pairs.sort_by_key(|(idx, _)| *idx);
        let mut entries: Vec<(usize, f64)> = Vec::with_capacity(pairs.len());
        for (idx, weight) in pairs {
            match entries.last_mut() {
                Some((last, w)) if *last == idx => *w += weight,
                _ => entries.push((idx, weight)),
            }
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn norm(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt()
    }

    /// Dot product via a merge over the two sorted entry lists.
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (a_idx, a_w) = self.entries[i];
            let (b_idx, b_w) = other.entries[j];
            match a_idx.cmp(&b_idx) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += a_w * b_w;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    fn normalized(mut self) -> Self {
        let norm = self.norm();
        if norm > 0.0 {
            for (_, w) in &mut self.entries {
                *w /= norm;
            }
        }
        self
    }
}

/// Compute cosine similarity between two sparse vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> f64 {
    let mag_a = a.norm();
    let mag_b = b.norm();
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    a.dot(b) / (mag_a * mag_b)
}

/// A fitted TF-IDF model: vocabulary plus per-term IDF weights.
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Fit a vocabulary of at most `max_features` terms on `documents`.
    ///
    /// Terms are ranked by total occurrences across the corpus, ties broken
    /// alphabetically; indices are then assigned in alphabetical order.
    pub fn fit<S: AsRef<str>>(documents: &[S], max_features: usize) -> Self {
        let tokenized: Vec<Vec<String>> =
            documents.iter().map(|d| tokenize(d.as_ref())).collect();
        Self::fit_tokens(&tokenized, max_features)
    }

    /// Fit on `documents` and return their vectors alongside the model.
    pub fn fit_transform<S: AsRef<str>>(
        documents: &[S],
        max_features: usize,
    ) -> (Self, Vec<SparseVector>) {
        let tokenized: Vec<Vec<String>> =
            documents.iter().map(|d| tokenize(d.as_ref())).collect();
        let vectorizer = Self::fit_tokens(&tokenized, max_features);
        let vectors = tokenized
            .iter()
            .map(|tokens| vectorizer.vectorize_tokens(tokens))
            .collect();
        (vectorizer, vectors)
    }

    fn fit_tokens(tokenized: &[Vec<String>], max_features: usize) -> Self {
        let mut term_counts: HashMap<&str, usize> = HashMap::new();
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();

        for tokens in tokenized {
            let mut seen: Vec<&str> = Vec::new();
            for token in tokens {
                *term_counts.entry(token.as_str()).or_insert(0) += 1;
                if !seen.contains(&token.as_str()) {
                    seen.push(token.as_str());
                }
            }
            for term in seen {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(&str, usize)> = term_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(max_features);

        let mut terms: Vec<&str> = ranked.into_iter().map(|(t, _)| t).collect();
        terms.sort_unstable();

        let n_docs = tokenized.len() as f64;
        let mut vocabulary = HashMap::with_capacity(terms.len());
        let mut idf = Vec::with_capacity(terms.len());
        for (idx, term) in terms.into_iter().enumerate() {
            let df = doc_freq.get(term).copied().unwrap_or(0) as f64;
            idf.push(((1.0 + n_docs) / (1.0 + df)).ln() + 1.0);
            vocabulary.insert(term.to_string(), idx);
        }

        Self { vocabulary, idf }
    }

    /// Vectorize `text` against the fitted vocabulary. Unknown terms are ignored.
    pub fn transform(&self, text: &str) -> SparseVector {
        self.vectorize_tokens(&tokenize(text))
    }

    fn vectorize_tokens(&self, tokens: &[String]) -> SparseVector {
        let pairs = tokens
            .iter()
            .filter_map(|token| self.vocabulary.get(token))
            .map(|&idx| (idx, self.idf[idx]))
            .collect();
        SparseVector::from_pairs(pairs).normalized()
    }

    /// Number of terms in the fitted vocabulary.
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.vocabulary.contains_key(term)
    }
}
