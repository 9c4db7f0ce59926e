//! Word recognition for the word game.

use serde::{Deserialize, Serialize};

/// The mood a recognised word carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    /// A happy word.
    Positive,
    /// A sad or angry word.
    Negative,
    /// Anything else the calculator knows.
    Neutral,
}

/// Decides whether a string is a word and what it feels like.
pub trait WordOracle: Send + Sync {
    /// Returns the sentiment of `word`, or `None` if it is not a word.
    fn classify(&self, word: &str) -> Option<Sentiment>;

    /// Words whose letters are fed into the falling grid.
    fn vocabulary(&self) -> Vec<String>;
}

/// Oracle backed by three fixed word lists.
#[derive(Debug, Clone)]
pub struct LexiconOracle {
    positive: Vec<String>,
    negative: Vec<String>,
    neutral: Vec<String>,
}

impl LexiconOracle {
    /// Builds an oracle from explicit lists. Words are matched
    /// case-insensitively.
    #[must_use]
    pub fn new(positive: &[&str], negative: &[&str], neutral: &[&str]) -> Self {
        let upper = |list: &[&str]| -> Vec<String> { list.iter().map(|w| w.to_uppercase()).collect() };
        Self {
            positive: upper(positive),
            negative: upper(negative),
            neutral: upper(neutral),
        }
    }
}

impl Default for LexiconOracle {
    fn default() -> Self {
        Self::new(
            &["HAPPY", "GOOD", "JOY", "LOVE", "FUN", "KIND", "NICE", "CALM"],
            &["SAD", "BAD", "MAD", "TIRED", "BORED", "LOST"],
            &["OK", "FINE", "MEH", "SUM", "ONE", "TWO", "ZERO"],
        )
    }
}

impl WordOracle for LexiconOracle {
    fn classify(&self, word: &str) -> Option<Sentiment> {
        let word = word.to_uppercase();
        if self.positive.contains(&word) {
            Some(Sentiment::Positive)
        } else if self.negative.contains(&word) {
            Some(Sentiment::Negative)
        } else if self.neutral.contains(&word) {
            Some(Sentiment::Neutral)
        } else {
            None
        }
    }

    fn vocabulary(&self) -> Vec<String> {
        self.positive
            .iter()
            .chain(&self.negative)
            .chain(&self.neutral)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_is_case_insensitive() {
        let oracle = LexiconOracle::default();

        assert_eq!(oracle.classify("happy"), Some(Sentiment::Positive));
        assert_eq!(oracle.classify("Sad"), Some(Sentiment::Negative));
        assert_eq!(oracle.classify("MEH"), Some(Sentiment::Neutral));
        assert_eq!(oracle.classify("XQZ"), None);
    }

    #[test]
    fn test_vocabulary_covers_every_list() {
        let oracle = LexiconOracle::new(&["joy"], &["sad"], &["ok"]);

        assert_eq!(oracle.vocabulary(), vec!["JOY", "SAD", "OK"]);
    }
}
