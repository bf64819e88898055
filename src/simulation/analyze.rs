//! Closed-form land probabilities
//!
//! The number of lands in a hand drawn without replacement follows the
//! hypergeometric distribution, which gives an exact reference value for
//! the simulated keepable rate.

use crate::card::KeywordSet;
use crate::simulation::deck::Deck;
use crate::simulation::hand::HAND_SIZE;

/// Binomial coefficient n choose k as a float
pub fn choose(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

/// P(exactly `k` successes) when drawing `draws` cards from `population`
/// cards of which `successes` are hits
pub fn hypergeometric_pmf(population: usize, successes: usize, draws: usize, k: usize) -> f64 {
    if successes > population || draws > population || k > draws || k > successes {
        return 0.0;
    }
    let failures = population - successes;
    if draws - k > failures {
        return 0.0;
    }
    choose(successes, k) * choose(failures, draws - k) / choose(population, draws)
}

/// P(min_lands <= lands <= max_lands) for a hand of `hand_size` cards
pub fn land_range_probability(
    deck_size: usize,
    land_count: usize,
    hand_size: usize,
    min_lands: usize,
    max_lands: usize,
) -> f64 {
    (min_lands..=max_lands.min(hand_size))
        .map(|k| hypergeometric_pmf(deck_size, land_count, hand_size, k))
        .sum()
}

/// Exact keepable rate of a 7-card opening hand for a parsed deck
pub fn exact_keepable_rate(
    deck: &Deck,
    land_keywords: &KeywordSet,
    min_lands: usize,
    max_lands: usize,
) -> f64 {
    let lands = deck.count_where(|c| land_keywords.matches(c));
    land_range_probability(deck.len(), lands, HAND_SIZE, min_lands, max_lands)
}
