//! # Sentiment Scorer
//! Maps a post's `(title, content)` to a compound score in `[-1, 1]`.
//!
//! The aggregation core treats the scorer as an opaque oracle behind
//! [`SentimentScorer`]; [`LexiconScorer`] is the bundled implementation.

use once_cell::sync::Lazy;
use std::collections::HashMap;

static LEXICON: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    let raw = include_str!("../sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, i32>>(raw).unwrap_or_else(|e| {
        tracing::error!(error = %e, "bundled sentiment lexicon is not valid JSON");
        HashMap::new()
    })
});

/// Normalization constant for the compound score: `raw / sqrt(raw² + ALPHA)`.
const ALPHA: f64 = 15.0;

pub trait SentimentScorer: Send + Sync {
    /// Compound score in `[-1, 1]`; `0.0` when both parts are empty.
    fn score(&self, title: &str, content: &str) -> f64;
}

#[derive(Debug, Clone, Default)]
pub struct LexiconScorer;

impl LexiconScorer {
    pub fn new() -> Self {
        Self
    }

    #[inline]
    fn word_score(&self, w: &str) -> i32 {
        *LEXICON.get(w).unwrap_or(&0)
    }

    /// Returns (raw lexicon sum, token count).
    /// Negation: a negator among the previous 1..=3 tokens flips the sign of a word's score.
    pub fn raw_score(&self, text: &str) -> (i32, usize) {
        let tokens: Vec<String> = tokenize(text).collect();
        let mut score: i32 = 0;

        for i in 0..tokens.len() {
            let base = self.word_score(tokens[i].as_str());
            if base == 0 {
                continue;
            }
            let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
            score += if negated { -base } else { base };
        }

        (score, tokens.len())
    }
}

impl SentimentScorer for LexiconScorer {
    fn score(&self, title: &str, content: &str) -> f64 {
        let text = join_text(title, content);
        if text.is_empty() {
            return 0.0;
        }
        let (raw, _) = self.raw_score(&text);
        compound(raw)
    }
}

/// Title and content joined the way posts are read: title first.
pub fn join_text(title: &str, content: &str) -> String {
    let mut text = String::with_capacity(title.len() + content.len() + 1);
    text.push_str(title);
    if !content.is_empty() {
        text.push(' ');
        text.push_str(content);
    }
    text.trim().to_string()
}

/// Squash an unbounded lexicon sum into `[-1, 1]`.
pub fn compound(raw: i32) -> f64 {
    let x = raw as f64;
    (x / (x * x + ALPHA).sqrt()).clamp(-1.0, 1.0)
}

/// Lower-cased alphanumeric tokens; apostrophes stay inside words so "isn't" survives.
fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|t| t.trim_matches('\''))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "isn't"
            | "wasn't"
            | "aren't"
            | "won't"
            | "can't"
            | "cannot"
            | "don't"
            | "doesn't"
            | "without"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_scores_zero() {
        let s = LexiconScorer::new();
        assert_eq!(s.score("", ""), 0.0);
        assert_eq!(s.score("   ", ""), 0.0);
    }

    #[test]
    fn polarity_follows_lexicon() {
        let s = LexiconScorer::new();
        assert!(s.score("NVDA earnings beat, stock surges", "") > 0.5);
        assert!(s.score("Nvidia shares plunge after guidance miss", "") < -0.5);
        assert_eq!(s.score("Nvidia holds annual meeting", ""), 0.0);
    }

    #[test]
    fn negation_flips_sign() {
        let s = LexiconScorer::new();
        let (pos, _) = s.raw_score("this is good");
        let (neg, _) = s.raw_score("this is not good");
        assert!(pos > 0);
        assert_eq!(neg, -pos);
        assert!(s.raw_score("isn't bullish").0 < 0);
    }

    #[test]
    fn compound_is_bounded() {
        for raw in [-1000, -7, -1, 0, 1, 7, 1000] {
            let c = compound(raw);
            assert!((-1.0..=1.0).contains(&c), "raw {raw} -> {c}");
        }
        assert_eq!(compound(0), 0.0);
    }

    #[test]
    fn content_is_scored_with_title() {
        let s = LexiconScorer::new();
        assert!(s.score("", "great quarter") > 0.0);
        assert_eq!(join_text("Title", ""), "Title");
        assert_eq!(join_text("Title", "body"), "Title body");
    }
}
