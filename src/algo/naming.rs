use std::collections::HashSet;

use tracing::debug;

use crate::algo::nmf::{self, TopicModel};
use crate::algo::tfidf::Vectorizer;
use crate::algo::tokenizer::capitalize;

/// Name given to a group with no content at all.
pub const UNTITLED: &str = "Untitled";

/// Name given when neither the topic model nor term frequencies yield a word.
pub const UNNAMED: &str = "Unnamed";

/// Folder name from the dominant topic of `contents`.
///
/// The dominant topic is the one with the highest mean weight across all
/// documents in the group. Its top `word_limit` words are capitalized and
/// joined with `delimiter`. Falls back to [`fallback_name`] when the topic has
/// no usable words.
pub fn name_group<S: AsRef<str>>(
    vectorizer: &Vectorizer,
    topics: &TopicModel,
    contents: &[S],
    word_limit: usize,
    delimiter: &str,
) -> String {
    if contents.is_empty() {
        return UNTITLED.to_string();
    }

    let vectors = vectorizer.transform(contents);
    let doc_topics = topics.transform(&vectors);
    let dominant = nmf::dominant_topic(&doc_topics);

    let words: Vec<String> = topics
        .top_terms(dominant, word_limit)
        .into_iter()
        .map(|(term, _)| capitalize(&term))
        .collect();

    if words.is_empty() {
        debug!(topic = dominant, "dominant topic has no words, using term frequencies");
        fallback_name(vectorizer, contents, word_limit, delimiter)
    } else {
        words.join(delimiter)
    }
}

/// Folder name from the highest summed TF-IDF scores across `contents`.
pub fn fallback_name<S: AsRef<str>>(
    vectorizer: &Vectorizer,
    contents: &[S],
    word_limit: usize,
    delimiter: &str,
) -> String {
    let words: Vec<String> = vectorizer
        .summed_scores(contents)
        .into_iter()
        .take(word_limit)
        .map(|(term, _)| capitalize(&term))
        .collect();

    if words.is_empty() {
        UNNAMED.to_string()
    } else {
        words.join(delimiter)
    }
}

/// Hands out folder names that are unique within one plan level.
pub struct NameRegistry<'a> {
    vectorizer: &'a Vectorizer,
    topics: &'a TopicModel,
    word_limit: usize,
    delimiter: &'a str,
    used: HashSet<String>,
}

impl<'a> NameRegistry<'a> {
    pub fn new(vectorizer: &'a Vectorizer, topics: &'a TopicModel, word_limit: usize, delimiter: &'a str) -> Self {
        Self {
            vectorizer,
            topics,
            word_limit,
            delimiter,
            used: HashSet::new(),
        }
    }

    /// Mark `name` as taken without generating it (e.g. reserved folders).
    pub fn reserve(&mut self, name: &str) {
        self.used.insert(name.to_string());
    }

    /// Name a group, resolving collisions with names already handed out.
    ///
    /// A taken topic name is replaced by the frequency-based name; if that is
    /// taken too, `<topic name><delimiter><n>` with the smallest free `n >= 1`.
    pub fn assign<S: AsRef<str>>(&mut self, contents: &[S]) -> String {
        let base = name_group(self.vectorizer, self.topics, contents, self.word_limit, self.delimiter);
        let mut name = base.clone();

        if self.used.contains(&name) {
            name = fallback_name(self.vectorizer, contents, self.word_limit, self.delimiter);
        }

        let mut counter = 1;
        while self.used.contains(&name) {
            name = format!("{base}{}{counter}", self.delimiter);
            counter += 1;
        }

        if name != base {
            debug!(%base, %name, "resolved folder name collision");
        }
        self.used.insert(name.clone());
        name
    }
}
