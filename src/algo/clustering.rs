use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::algo::embedding::Embedder;
use crate::error::{FoldersError, Result};

/// A readable file and its preprocessed text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub content: String,
}

impl FileEntry {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Files judged similar to the first file that claimed them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// The file whose scan produced this group.
    pub representative: String,
    /// Representative first, then claimed files in input order.
    pub members: Vec<String>,
}

/// Cosine similarity: dot(a, b) / (|a| * |b|).
///
/// Returns `None` when either vector has zero norm or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a > 0.0 && norm_b > 0.0 {
        Some(dot / (norm_a.sqrt() * norm_b.sqrt()))
    } else {
        None
    }
}

/// Embed `entries` in one batch and group them greedily.
///
/// `threshold` is a fraction in [0, 1]; it is not validated here.
pub fn group_files(entries: &[FileEntry], embedder: &dyn Embedder, threshold: f64) -> Result<Vec<Group>> {
    if entries.is_empty() {
        return Ok(vec![]);
    }
    let texts: Vec<&str> = entries.iter().map(|e| e.content.as_str()).collect();
    let embeddings = embedder.embed(&texts)?;
    if embeddings.len() != entries.len() {
        return Err(FoldersError::Embedding(format!(
            "{} returned {} embeddings for {} documents",
            embedder.name(),
            embeddings.len(),
            entries.len()
        )));
    }

    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    let groups = group_embeddings(&names, &embeddings, threshold);
    debug!(
        files = entries.len(),
        groups = groups.len(),
        threshold,
        model = embedder.name(),
        "grouped files by similarity"
    );
    Ok(groups)
}

/// Greedy single-pass grouping over precomputed embeddings.
///
/// Each file not yet claimed becomes a parent and claims every other
/// unclaimed file whose similarity to it reaches `threshold`. The parent is
/// then marked claimed whether or not it found members. Only parents with at
/// least one member produce a group. Membership depends on input order: a
/// file is only ever compared against files no earlier parent has claimed,
/// and similarity is not closed transitively.
pub fn group_embeddings(names: &[&str], embeddings: &[Vec<f32>], threshold: f64) -> Vec<Group> {
    let n = names.len().min(embeddings.len());
    let mut claimed = vec![false; n];
    let mut groups = Vec::new();

    for parent in 0..n {
        if claimed[parent] {
            continue;
        }
        let mut members = vec![names[parent].to_string()];
        for other in 0..n {
            if other == parent || claimed[other] {
                continue;
            }
            let similar = cosine_similarity(&embeddings[parent], &embeddings[other])
                .is_some_and(|score| score >= threshold);
            if similar {
                members.push(names[other].to_string());
                claimed[other] = true;
            }
        }
        claimed[parent] = true;

        if members.len() > 1 {
            groups.push(Group {
                representative: names[parent].to_string(),
                members,
            });
        }
    }

    groups
}
