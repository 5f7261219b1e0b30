//! Extractive summaries of converted Markdown.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Sentence terminators followed by whitespace, or a paragraph break
static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+\s+|\n\s*\n").expect("sentence pattern should be valid"));

/// Texts this short (in characters) are returned whole
const SHORT_TEXT_LIMIT: usize = 1000;

const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "but", "by", "can", "could", "do", "does", "for", "from", "had", "has", "have", "he", "her",
    "his", "how", "if", "in", "into", "is", "it", "its", "may", "more", "most", "no", "not", "of",
    "on", "one", "or", "other", "our", "out", "she", "so", "some", "such", "than", "that", "the",
    "their", "them", "then", "there", "these", "they", "this", "those", "to", "up", "use", "was",
    "we", "were", "what", "when", "which", "who", "will", "with", "would", "you", "your",
];

/// Produces a short summary of a longer text
pub trait Summarizer: Send + Sync {
    /// Summary of `text`; empty when there is nothing to summarize
    fn summarize(&self, text: &str) -> String;
}

/// Ranks sentences by the average corpus frequency of their content words
#[derive(Debug, Clone)]
pub struct FrequencySummarizer {
    sentence_count: usize,
}

impl Default for FrequencySummarizer {
    fn default() -> Self {
        Self { sentence_count: 5 }
    }
}

impl FrequencySummarizer {
    pub fn new(sentence_count: usize) -> Self {
        Self {
            sentence_count: sentence_count.max(1),
        }
    }
}

impl Summarizer for FrequencySummarizer {
    fn summarize(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return String::new();
        }

        let sentences = split_sentences(text);
        if sentences.len() <= self.sentence_count {
            return truncate(text);
        }

        let mut frequencies: HashMap<String, usize> = HashMap::new();
        for sentence in &sentences {
            for word in content_words(sentence) {
                *frequencies.entry(word).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(usize, f64)> = sentences
            .iter()
            .enumerate()
            .map(|(i, sentence)| {
                let words = content_words(sentence);
                let total: usize = words.iter().filter_map(|w| frequencies.get(w)).sum();
                (i, total as f64 / words.len().max(1) as f64)
            })
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut chosen: Vec<usize> = ranked
            .into_iter()
            .take(self.sentence_count)
            .map(|(i, _)| i)
            .collect();
        chosen.sort_unstable();

        ::log::debug!("Summary picked sentences {:?} of {}", chosen, sentences.len());
        chosen
            .into_iter()
            .map(|i| sentences[i])
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() > SHORT_TEXT_LIMIT {
        let head: String = text.chars().take(SHORT_TEXT_LIMIT).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// Non-empty sentences of `text`, terminators kept
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for boundary in SENTENCE_END.find_iter(text) {
        let end = boundary.start() + boundary.as_str().trim_end().len();
        push_trimmed(&mut sentences, &text[start..end]);
        start = boundary.end();
    }
    push_trimmed(&mut sentences, &text[start..]);

    sentences
}

fn push_trimmed<'a>(sentences: &mut Vec<&'a str>, candidate: &'a str) {
    let candidate = candidate.trim();
    if !candidate.is_empty() {
        sentences.push(candidate);
    }
}

/// Lowercased words of a sentence, stop words and single characters removed
fn content_words(sentence: &str) -> Vec<String> {
    sentence
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 1)
        .map(str::to_lowercase)
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect()
}
