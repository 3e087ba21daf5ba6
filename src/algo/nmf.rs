use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

const EPS: f64 = 1e-10;

/// Topic model settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopicSettings {
    /// Upper bound on the number of topics; the fitted model uses at most one per document.
    pub topics: usize,
    /// Multiplicative-update iterations for both fit and transform.
    pub max_iter: usize,
    /// Maximum vocabulary size (top terms by doc frequency).
    pub vocab_limit: usize,
}

impl Default for TopicSettings {
    fn default() -> Self {
        Self {
            topics: 50,
            max_iter: 200,
            vocab_limit: 5000,
        }
    }
}

/// Non-negative Matrix Factorization topic model.
///
/// Given a term-document matrix V (n_docs × n_terms), decompose into:
///   V ≈ W × H
/// where W (n_docs × k) represents document-topic weights
/// and H (k × n_terms) represents topic-term weights.
///
/// Uses multiplicative update rules (Lee & Seung, 2001). Once fitted, H is
/// frozen and [`TopicModel::transform`] infers W for unseen documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicModel {
    /// Topic-term matrix (k × n_terms). Each row's top entries are that topic's keywords.
    topic_terms: Vec<Vec<f64>>,
    /// Vocabulary mapping index → term.
    vocabulary: Vec<String>,
    max_iter: usize,
}

impl TopicModel {
    /// Fit on TF-IDF vectors, one map per document.
    pub fn fit(vectors: &[BTreeMap<String, f64>], settings: &TopicSettings) -> Self {
        let n_docs = vectors.len();
        let k = settings.topics.min(n_docs).max(1);

        // Vocabulary sorted by doc frequency, ties alphabetical, then limited
        let mut doc_freq: BTreeMap<&str, usize> = BTreeMap::new();
        for vec in vectors {
            for term in vec.keys() {
                *doc_freq.entry(term.as_str()).or_insert(0) += 1;
            }
        }
        let mut vocab: Vec<(&str, usize)> = doc_freq.into_iter().collect();
        vocab.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        vocab.truncate(settings.vocab_limit);
        let vocabulary: Vec<String> = vocab.into_iter().map(|(t, _)| t.to_string()).collect();
        let n_terms = vocabulary.len();

        let mut model = Self {
            topic_terms: vec![vec![0.0; n_terms]; k],
            vocabulary,
            max_iter: settings.max_iter,
        };
        if n_docs == 0 || n_terms == 0 {
            return model;
        }

        let v = model.dense(vectors);
        let mut w = initial_weights(n_docs, k);
        let mut h = initial_weights(k, n_terms);

        for _ in 0..settings.max_iter {
            // Update H: H = H * (W^T V) / (W^T W H)
            let wt_v = mat_mul_transpose_a(&w, &v, n_docs, k, n_terms);
            let wtw = mat_mul_transpose_a(&w, &w, n_docs, k, k);
            let wtw_h = mat_mul(&wtw, &h, k, k, n_terms);

            for i in 0..k {
                for j in 0..n_terms {
                    h[i][j] *= wt_v[i][j] / (wtw_h[i][j] + EPS);
                }
            }

            update_doc_topics(&mut w, &v, &h, n_docs, n_terms, k);
        }

        model.topic_terms = h;
        model
    }

    /// Infer document-topic weights for `vectors` with the topic-term matrix held fixed.
    pub fn transform(&self, vectors: &[BTreeMap<String, f64>]) -> Vec<Vec<f64>> {
        let n_docs = vectors.len();
        let k = self.num_topics();
        let n_terms = self.vocabulary.len();
        if n_docs == 0 || n_terms == 0 {
            return vec![vec![0.0; k]; n_docs];
        }

        let v = self.dense(vectors);
        let mut w = initial_weights(n_docs, k);
        for _ in 0..self.max_iter {
            update_doc_topics(&mut w, &v, &self.topic_terms, n_docs, n_terms, k);
        }
        w
    }

    /// Word weights for `topic`, in vocabulary order.
    pub fn topic_terms(&self, topic: usize) -> Option<Vec<(&str, f64)>> {
        self.topic_terms.get(topic).map(|row| {
            self.vocabulary
                .iter()
                .map(String::as_str)
                .zip(row.iter().copied())
                .collect()
        })
    }

    /// Get top N terms for topic t, highest weight first, zero weights excluded.
    pub fn top_terms(&self, topic: usize, n: usize) -> Vec<(String, f64)> {
        let Some(mut terms) = self.topic_terms(topic) else {
            return vec![];
        };
        terms.retain(|(_, w)| *w > EPS);
        terms.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        terms
            .into_iter()
            .take(n)
            .map(|(t, w)| (t.to_string(), w))
            .collect()
    }

    pub fn num_topics(&self) -> usize {
        self.topic_terms.len()
    }

    fn dense(&self, vectors: &[BTreeMap<String, f64>]) -> Vec<Vec<f64>> {
        let term_idx: HashMap<&str, usize> = self
            .vocabulary
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_str(), i))
            .collect();

        let mut v = vec![vec![0.0f64; self.vocabulary.len()]; vectors.len()];
        for (d, vec) in vectors.iter().enumerate() {
            for (term, &weight) in vec {
                if let Some(&idx) = term_idx.get(term.as_str()) {
                    v[d][idx] = weight;
                }
            }
        }
        v
    }
}

/// Index of the largest average topic weight across `doc_topics`.
/// Ties go to the lowest index; an empty or all-zero input yields topic 0.
pub fn dominant_topic(doc_topics: &[Vec<f64>]) -> usize {
    let Some(k) = doc_topics.first().map(Vec::len) else {
        return 0;
    };
    let mut mean = vec![0.0f64; k];
    for row in doc_topics {
        for (m, w) in mean.iter_mut().zip(row) {
            *m += w;
        }
    }

    let mut best = 0;
    for (i, &m) in mean.iter().enumerate() {
        if m > mean[best] {
            best = i;
        }
    }
    best
}

/// Small positive values, deterministic.
fn initial_weights(rows: usize, cols: usize) -> Vec<Vec<f64>> {
    (0..rows)
        .map(|i| {
            (0..cols)
                .map(|j| 0.1 + 0.01 * ((i * cols + j) % 100) as f64 / 100.0)
                .collect()
        })
        .collect()
}

// Update W: W = W * (V H^T) / (W H H^T)
fn update_doc_topics(
    w: &mut [Vec<f64>],
    v: &[Vec<f64>],
    h: &[Vec<f64>],
    n_docs: usize,
    n_terms: usize,
    k: usize,
) {
    let v_ht = mat_mul_transpose_b(v, h, n_docs, n_terms, k);
    let wh = mat_mul(w, h, n_docs, k, n_terms);
    let wh_ht = mat_mul_transpose_b(&wh, h, n_docs, n_terms, k);

    for i in 0..n_docs {
        for j in 0..k {
            w[i][j] *= v_ht[i][j] / (wh_ht[i][j] + EPS);
        }
    }
}

// A^T × B where A is (m × n), result is (n × p)
fn mat_mul_transpose_a(a: &[Vec<f64>], b: &[Vec<f64>], m: usize, n: usize, p: usize) -> Vec<Vec<f64>> {
    let mut result = vec![vec![0.0; p]; n];
    for i in 0..n {
        for j in 0..p {
            let mut sum = 0.0;
            for k in 0..m {
                sum += a[k][i] * b[k][j];
            }
            result[i][j] = sum;
        }
    }
    result
}

// A × B where A is (m × n), B is (n × p)
fn mat_mul(a: &[Vec<f64>], b: &[Vec<f64>], m: usize, n: usize, p: usize) -> Vec<Vec<f64>> {
    let mut result = vec![vec![0.0; p]; m];
    for i in 0..m {
        for j in 0..p {
            let mut sum = 0.0;
            for k in 0..n {
                sum += a[i][k] * b[k][j];
            }
            result[i][j] = sum;
        }
    }
    result
}

// A × B^T where B is (p × n), result is (m × p)
fn mat_mul_transpose_b(a: &[Vec<f64>], b: &[Vec<f64>], m: usize, _n: usize, p: usize) -> Vec<Vec<f64>> {
    let mut result = vec![vec![0.0; p]; m];
    for i in 0..m {
        for j in 0..p {
            let mut sum = 0.0;
            for k in 0..a[i].len().min(b[j].len()) {
                sum += a[i][k] * b[j][k];
            }
            result[i][j] = sum;
        }
    }
    result
}
