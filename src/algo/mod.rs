pub mod clustering;
pub mod embedding;
pub mod misc;
pub mod naming;
pub mod nmf;
pub mod tfidf;
pub mod tokenizer;
