use serde::{Deserialize, Serialize};
use std::fmt;

/// Name fragments used to classify cards by substring containment.
///
/// Matching is case-sensitive and unanchored: the keyword `"Mountain"`
/// matches both `"Mountain"` and `"Mountain Pass"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl KeywordSet {
    /// Build a set from individual keywords, trimming each and dropping empties
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        KeywordSet { keywords }
    }

    /// Parse comma separated free text, e.g. `"Mountain, Island"`
    pub fn parse(text: &str) -> Self {
        Self::new(text.split(','))
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }

    /// True if the card name contains any keyword
    pub fn matches(&self, card: &str) -> bool {
        matches(card, self)
    }

    /// True if every keyword is contained in at least one of the cards
    pub fn covered_by<S: AsRef<str>>(&self, cards: &[S]) -> bool {
        has_combo(cards, self)
    }
}

impl fmt::Display for KeywordSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keywords.join(", "))
    }
}

/// Check whether a card counts as one of the keyword cards (e.g. a land)
pub fn matches(card: &str, keywords: &KeywordSet) -> bool {
    keywords.iter().any(|k| card.contains(k))
}

/// Check whether a group of cards holds every required keyword.
/// Keywords and cards need not pair up: one card may satisfy several
/// keywords. An empty keyword set is always satisfied.
pub fn has_combo<S: AsRef<str>>(cards: &[S], required: &KeywordSet) -> bool {
    required
        .iter()
        .all(|k| cards.iter().any(|c| c.as_ref().contains(k)))
}
