use log::warn;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

/// Largest deck the parser will expand; copies past this are rejected
pub const MAX_DECK_SIZE: usize = 10_000;

#[derive(Error, Debug)]
pub enum DeckError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Why a single decklist line was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LineErrorKind {
    #[error("expected format 'COUNT CARD_NAME'")]
    MissingName,
    #[error("'{0}' is not a valid card count")]
    InvalidCount(String),
    #[error("card count must be positive")]
    ZeroCount,
    #[error("{count} copies would exceed the {limit} card deck limit")]
    TooManyCopies { count: usize, limit: usize },
}

/// A malformed decklist line; reported and skipped, never fatal
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("Invalid decklist line {line}: '{text}' ({kind})")]
pub struct DecklistLineError {
    /// 1-based line number in the input text
    pub line: usize,
    pub text: String,
    pub kind: LineErrorKind,
}

/// Flat multiset of card names, one entry per physical card
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Deck {
    cards: Vec<String>,
}

impl Deck {
    pub fn new(cards: Vec<String>) -> Self {
        Deck { cards }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[String] {
        &self.cards
    }

    /// Card name at a deck position
    pub fn card(&self, index: usize) -> &str {
        &self.cards[index]
    }

    /// Number of copies whose name satisfies `pred`
    pub fn count_where<F: Fn(&str) -> bool>(&self, pred: F) -> usize {
        self.cards.iter().filter(|c| pred(c.as_str())).count()
    }
}

impl<S: Into<String>> FromIterator<S> for Deck {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Deck::new(iter.into_iter().map(Into::into).collect())
    }
}

/// Result of parsing a decklist: whatever parsed cleanly plus per-line errors
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParsedDecklist {
    pub deck: Deck,
    pub errors: Vec<DecklistLineError>,
}

impl ParsedDecklist {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Parse one non-blank line into (count, name).
/// `room` is how many more cards fit under [`MAX_DECK_SIZE`].
fn parse_line(trimmed: &str, room: usize) -> Result<(usize, &str), LineErrorKind> {
    let (count_str, name) = trimmed
        .split_once(char::is_whitespace)
        .ok_or(LineErrorKind::MissingName)?;

    let name = name.trim();
    if name.is_empty() {
        return Err(LineErrorKind::MissingName);
    }

    let count: usize = count_str
        .parse()
        .map_err(|_| LineErrorKind::InvalidCount(count_str.to_string()))?;
    if count == 0 {
        return Err(LineErrorKind::ZeroCount);
    }
    if count > room {
        return Err(LineErrorKind::TooManyCopies {
            count,
            limit: MAX_DECK_SIZE,
        });
    }

    Ok((count, name))
}

/// Parse decklist text and return expanded list of cards
/// Format: "4 Card Name" per line; blank lines are ignored
pub fn parse_decklist(text: &str) -> ParsedDecklist {
    let mut cards = Vec::new();
    let mut errors = Vec::new();

    for (line_num, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match parse_line(trimmed, MAX_DECK_SIZE - cards.len()) {
            Ok((count, name)) => {
                cards.extend(std::iter::repeat(name).take(count).map(str::to_string));
            }
            Err(kind) => {
                let error = DecklistLineError {
                    line: line_num + 1,
                    text: line.to_string(),
                    kind,
                };
                warn!("{}", error);
                errors.push(error);
            }
        }
    }

    ParsedDecklist {
        deck: Deck::new(cards),
        errors,
    }
}

/// Read and parse a decklist file
pub fn parse_deck_file<P: AsRef<Path>>(path: P) -> Result<ParsedDecklist, DeckError> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_decklist(&content))
}
