use std::collections::HashSet;

use unicode_segmentation::UnicodeSegmentation;

/// Numbers at or below this value are dropped by [`preprocess`]; larger ones
/// (years, invoice numbers) carry meaning and are kept.
const SMALL_NUMBER_LIMIT: u64 = 100;

/// Tokenize text into lowercase word tokens, filtering stopwords and short tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words()
        .map(|w| w.to_lowercase())
        .filter(|w| w.chars().count() >= 2 && !is_stopword(w))
        .collect()
}

/// Clean extracted text before it is embedded and topic-modelled.
///
/// Strips ASCII punctuation, drops words whose lowercase form is in
/// `stop_words`, and drops bare integers `<= 100`.
pub fn preprocess(text: &str, stop_words: &HashSet<String>) -> String {
    let stripped: String = text.chars().filter(|c| !c.is_ascii_punctuation()).collect();

    stripped
        .split_whitespace()
        .filter(|word| !stop_words.contains(&word.to_lowercase()))
        .filter(|word| match word.parse::<u64>() {
            Ok(n) => n > SMALL_NUMBER_LIMIT,
            Err(_) => true,
        })
        .collect::<Vec<&str>>()
        .join(" ")
}

/// Uppercase the first character and lowercase the rest.
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Keep at most `limit` whitespace-separated words.
pub fn truncate_words(text: &str, limit: usize) -> String {
    text.split_whitespace()
        .take(limit)
        .collect::<Vec<&str>>()
        .join(" ")
}

fn is_stopword(word: &str) -> bool {
    matches!(
        word,
        "a" | "an" | "the" | "is" | "it" | "of" | "to" | "in" | "for" | "on" | "with"
        | "at" | "by" | "from" | "as" | "or" | "and" | "but" | "not" | "be" | "are"
        | "was" | "were" | "been" | "being" | "have" | "has" | "had" | "do" | "does"
        | "did" | "will" | "would" | "could" | "should" | "may" | "might" | "shall"
        | "can" | "this" | "that" | "these" | "those" | "there" | "here" | "where"
        | "when" | "what" | "which" | "who" | "whom" | "how" | "all" | "each" | "every"
        | "both" | "few" | "more" | "most" | "other" | "some" | "such" | "no" | "nor"
        | "only" | "own" | "same" | "so" | "than" | "too" | "very" | "just" | "because"
        | "about" | "into" | "through" | "during" | "before" | "after" | "above" | "below"
        | "between" | "under" | "again" | "further" | "then" | "once" | "any" | "its"
        | "your" | "our" | "their" | "his" | "her" | "my" | "if" | "up" | "out" | "also"
    )
}
