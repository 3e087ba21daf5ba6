use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::algo::tokenizer;

/// Document-frequency pruning applied when fitting a [`Vectorizer`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VectorizerSettings {
    /// Terms appearing in fewer documents than this are dropped.
    pub min_df: usize,
    /// Terms appearing in more than this fraction of documents are dropped.
    pub max_df: f64,
}

impl Default for VectorizerSettings {
    fn default() -> Self {
        Self {
            min_df: 2,
            max_df: 0.8,
        }
    }
}

/// A TF-IDF term-weighting model fitted on one batch of documents.
///
/// Fit once per planning level, then used to transform group contents for
/// topic inference and for the frequency-based naming fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vectorizer {
    /// term -> smoothed IDF, only for terms that survived pruning
    idf: BTreeMap<String, f64>,
}

impl Vectorizer {
    /// Fit the vocabulary and IDF weights on `texts`.
    ///
    /// If `min_df`/`max_df` pruning would leave no terms at all, the unpruned
    /// vocabulary is kept so small directories still get usable names.
    pub fn fit<S: AsRef<str>>(texts: &[S], settings: &VectorizerSettings) -> Self {
        let mut doc_freq: HashMap<String, u32> = HashMap::new();
        for text in texts {
            let unique: HashSet<String> = tokenizer::tokenize(text.as_ref()).into_iter().collect();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let n = texts.len() as u32;
        let keep = |df: u32| {
            df as usize >= settings.min_df && (df as f64) <= settings.max_df * n as f64
        };
        let pruned: Vec<(&String, &u32)> = doc_freq.iter().filter(|(_, &df)| keep(df)).collect();
        let surviving: Vec<(&String, &u32)> = if pruned.is_empty() {
            doc_freq.iter().collect()
        } else {
            pruned
        };

        let idf = surviving
            .into_iter()
            .map(|(term, &df)| (term.clone(), smoothed_idf(n, df)))
            .collect();

        Self { idf }
    }

    /// TF-IDF vector (L2-normalized) for each text, restricted to the fitted vocabulary.
    pub fn transform<S: AsRef<str>>(&self, texts: &[S]) -> Vec<BTreeMap<String, f64>> {
        texts.iter().map(|t| self.transform_one(t.as_ref())).collect()
    }

    fn transform_one(&self, text: &str) -> BTreeMap<String, f64> {
        let mut counts: BTreeMap<String, u32> = BTreeMap::new();
        for token in tokenizer::tokenize(text) {
            if self.idf.contains_key(&token) {
                *counts.entry(token).or_insert(0) += 1;
            }
        }

        let mut weights: BTreeMap<String, f64> = counts
            .into_iter()
            .map(|(term, count)| {
                let idf = self.idf[&term];
                (term, count as f64 * idf)
            })
            .collect();

        let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for w in weights.values_mut() {
                *w /= norm;
            }
        }
        weights
    }

    /// Per-term TF-IDF scores summed over `texts`, highest first.
    /// Terms scoring zero are omitted; ties are broken alphabetically.
    pub fn summed_scores<S: AsRef<str>>(&self, texts: &[S]) -> Vec<(String, f64)> {
        let mut sums: BTreeMap<String, f64> = BTreeMap::new();
        for vector in self.transform(texts) {
            for (term, weight) in vector {
                *sums.entry(term).or_insert(0.0) += weight;
            }
        }
        let mut sorted: Vec<(String, f64)> = sums.into_iter().filter(|(_, s)| *s > 0.0).collect();
        sorted.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        sorted
    }

    /// Fitted vocabulary in alphabetical order.
    #[cfg(test)]
    fn feature_names(&self) -> Vec<&str> {
        self.idf.keys().map(String::as_str).collect()
    }

    #[cfg(test)]
    fn idf(&self, term: &str) -> Option<f64> {
        self.idf.get(term).copied()
    }
}

/// Smoothed IDF: ln((1 + N) / (1 + df)) + 1
fn smoothed_idf(num_docs: u32, df: u32) -> f64 {
    ((1.0 + num_docs as f64) / (1.0 + df as f64)).ln() + 1.0
}
