use crate::rng::SimRng;
use crate::simulation::deck::Deck;
use thiserror::Error;

/// Opening hand size
pub const HAND_SIZE: usize = 7;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SampleError {
    #[error("Cannot draw {requested} cards from a deck of {available}")]
    InsufficientDeckSize { requested: usize, available: usize },
}

/// Draw `hand_size` distinct deck positions without replacement.
/// Every combination of positions is equally likely.
pub fn draw_hand_indices(
    deck_len: usize,
    hand_size: usize,
    rng: &mut SimRng,
) -> Result<Vec<usize>, SampleError> {
    if deck_len < hand_size {
        return Err(SampleError::InsufficientDeckSize {
            requested: hand_size,
            available: deck_len,
        });
    }
    Ok(rng.sample_indices(deck_len, hand_size))
}

/// Draw a random hand of card names
pub fn draw_hand<'a>(
    deck: &'a Deck,
    hand_size: usize,
    rng: &mut SimRng,
) -> Result<Vec<&'a str>, SampleError> {
    let indices = draw_hand_indices(deck.len(), hand_size, rng)?;
    Ok(indices.into_iter().map(|i| deck.card(i)).collect())
}

/// A full random permutation of a deck.
///
/// The opening hand and the combo window are both prefixes of the same
/// ordering, so they always agree within one trial.
pub struct ShuffledDeck<'a> {
    deck: &'a Deck,
    order: Vec<usize>,
}

impl<'a> ShuffledDeck<'a> {
    pub fn new(deck: &'a Deck, rng: &mut SimRng) -> Self {
        let mut shuffled = ShuffledDeck {
            deck,
            order: (0..deck.len()).collect(),
        };
        shuffled.reshuffle(rng);
        shuffled
    }

    /// Draw a fresh permutation in place.
    /// Fisher-Yates is uniform from any starting order, so the previous
    /// permutation does not need to be reset.
    pub fn reshuffle(&mut self, rng: &mut SimRng) {
        rng.shuffle(&mut self.order);
    }

    /// Deck positions in shuffled order
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Positions of the first `size` cards (clamped to the deck size)
    pub fn top_positions(&self, size: usize) -> &[usize] {
        &self.order[..size.min(self.order.len())]
    }

    /// Positions of the opening hand
    pub fn hand_positions(&self) -> &[usize] {
        self.top_positions(HAND_SIZE)
    }

    /// Names of the first `size` cards
    pub fn top(&self, size: usize) -> Vec<&'a str> {
        let deck = self.deck;
        self.top_positions(size)
            .iter()
            .map(|&i| deck.card(i))
            .collect()
    }

    /// Names of the opening hand
    pub fn hand(&self) -> Vec<&'a str> {
        self.top(HAND_SIZE)
    }
}
