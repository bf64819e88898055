use crate::card::KeywordSet;
use crate::rng::SimRng;
use crate::simulation::deck::Deck;
use crate::simulation::hand::{draw_hand_indices, SampleError, ShuffledDeck, HAND_SIZE};
use log::debug;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

/// Trials handled by one parallel work item.
/// Fixed so a seeded parallel run gives the same answer on any thread count.
const TRIALS_PER_CHUNK: usize = 4096;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimulationError {
    #[error("Deck must contain at least {required} cards, got {actual}")]
    DeckTooSmall { required: usize, actual: usize },
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Sampling error: {0}")]
    Sample(#[from] SampleError),
}

/// Keepable-hand criteria shared by both simulations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationParams {
    pub min_lands: usize,
    pub max_lands: usize,
    pub land_keywords: KeywordSet,
    pub trials: usize,
}

/// Extra inputs for the combo simulation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComboParams {
    pub combo_keywords: KeywordSet,
    /// Number of cards from the top of the shuffled deck checked for the combo
    pub window_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComboResult {
    pub window_size: usize,
    pub hits: usize,
    pub rate: f64,
}

/// Aggregated statistics of one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub trials: usize,
    pub keepable_count: usize,
    pub keepable_rate: f64,
    pub combo: Option<ComboResult>,
    /// `land_histogram[k]` = number of opening hands with exactly k lands
    pub land_histogram: [usize; HAND_SIZE + 1],
}

impl SimulationResult {
    pub fn combo_rate(&self) -> Option<f64> {
        self.combo.as_ref().map(|c| c.rate)
    }

    /// Mean number of lands per opening hand
    pub fn average_lands(&self) -> f64 {
        let total: usize = self
            .land_histogram
            .iter()
            .enumerate()
            .map(|(lands, count)| lands * count)
            .sum();
        total as f64 / self.trials as f64
    }
}

/// Running counters for a batch of trials
#[derive(Debug, Clone, Default)]
struct Tally {
    trials: usize,
    keepable: usize,
    combo_hits: usize,
    land_histogram: [usize; HAND_SIZE + 1],
}

impl Tally {
    fn record(&mut self, lands: usize, keepable: bool, combo_hit: bool) {
        self.trials += 1;
        self.land_histogram[lands] += 1;
        if keepable {
            self.keepable += 1;
        }
        if combo_hit {
            self.combo_hits += 1;
        }
    }

    fn merge(mut self, other: Tally) -> Tally {
        self.trials += other.trials;
        self.keepable += other.keepable;
        self.combo_hits += other.combo_hits;
        for (total, count) in self.land_histogram.iter_mut().zip(other.land_histogram) {
            *total += count;
        }
        self
    }

    fn finish(self, combo_window: Option<usize>) -> SimulationResult {
        let trials = self.trials as f64;
        SimulationResult {
            trials: self.trials,
            keepable_count: self.keepable,
            keepable_rate: self.keepable as f64 / trials,
            combo: combo_window.map(|window_size| ComboResult {
                window_size,
                hits: self.combo_hits,
                rate: self.combo_hits as f64 / trials,
            }),
            land_histogram: self.land_histogram,
        }
    }
}

/// Land classification of every deck position, computed once per run
struct LandMask(Vec<bool>);

impl LandMask {
    fn new(deck: &Deck, keywords: &KeywordSet) -> Self {
        LandMask(deck.cards().iter().map(|c| keywords.matches(c)).collect())
    }

    fn count(&self, positions: &[usize]) -> usize {
        positions.iter().filter(|&&i| self.0[i]).count()
    }
}

/// Count the lands in a hand of card names
pub fn count_lands<S: AsRef<str>>(hand: &[S], land_keywords: &KeywordSet) -> usize {
    hand.iter()
        .filter(|c| land_keywords.matches(c.as_ref()))
        .count()
}

fn in_land_range(lands: usize, params: &SimulationParams) -> bool {
    params.min_lands <= lands && lands <= params.max_lands
}

/// Check whether a hand of card names is keepable
pub fn is_keepable<S: AsRef<str>>(hand: &[S], params: &SimulationParams) -> bool {
    in_land_range(count_lands(hand, &params.land_keywords), params)
}

fn validate(deck: &Deck, params: &SimulationParams) -> Result<(), SimulationError> {
    if deck.len() < HAND_SIZE {
        return Err(SimulationError::DeckTooSmall {
            required: HAND_SIZE,
            actual: deck.len(),
        });
    }
    if params.trials == 0 {
        return Err(SimulationError::InvalidParameter(
            "trials must be at least 1".to_string(),
        ));
    }
    if params.min_lands > params.max_lands {
        return Err(SimulationError::InvalidParameter(format!(
            "min lands ({}) is greater than max lands ({})",
            params.min_lands, params.max_lands
        )));
    }
    Ok(())
}

fn validate_combo(deck: &Deck, combo: &ComboParams) -> Result<(), SimulationError> {
    if combo.window_size == 0 || combo.window_size > deck.len() {
        return Err(SimulationError::InvalidParameter(format!(
            "combo window must be between 1 and the deck size ({}), got {}",
            deck.len(),
            combo.window_size
        )));
    }
    Ok(())
}

fn basic_trials(
    deck: &Deck,
    params: &SimulationParams,
    lands: &LandMask,
    trials: usize,
    rng: &mut SimRng,
) -> Result<Tally, SimulationError> {
    let mut tally = Tally::default();
    for _ in 0..trials {
        let hand = draw_hand_indices(deck.len(), HAND_SIZE, rng)?;
        let land_count = lands.count(&hand);
        tally.record(land_count, in_land_range(land_count, params), false);
    }
    Ok(tally)
}

fn combo_trials(
    deck: &Deck,
    params: &SimulationParams,
    combo: &ComboParams,
    lands: &LandMask,
    trials: usize,
    rng: &mut SimRng,
) -> Tally {
    let mut tally = Tally::default();
    let mut shuffled = ShuffledDeck::new(deck, rng);
    let mut window: Vec<&str> = Vec::with_capacity(combo.window_size);

    for trial in 0..trials {
        if trial > 0 {
            shuffled.reshuffle(rng);
        }
        let land_count = lands.count(shuffled.hand_positions());

        window.clear();
        window.extend(
            shuffled
                .top_positions(combo.window_size)
                .iter()
                .map(|&i| deck.card(i)),
        );
        let combo_hit = combo.combo_keywords.covered_by(window.as_slice());

        tally.record(land_count, in_land_range(land_count, params), combo_hit);
    }
    tally
}

/// Split `trials` into fixed-size chunks: (chunk index, trials in chunk)
fn chunks(trials: usize) -> Vec<(u64, usize)> {
    (0..trials)
        .step_by(TRIALS_PER_CHUNK)
        .enumerate()
        .map(|(i, start)| (i as u64, TRIALS_PER_CHUNK.min(trials - start)))
        .collect()
}

/// Estimate the chance that a random 7-card hand is keepable
pub fn run_basic_simulation(
    deck: &Deck,
    params: &SimulationParams,
    rng: &mut SimRng,
) -> Result<SimulationResult, SimulationError> {
    validate(deck, params)?;
    debug!(
        "Running {} hand trials over {} cards (seed {})",
        params.trials,
        deck.len(),
        rng.seed()
    );

    let lands = LandMask::new(deck, &params.land_keywords);
    let tally = basic_trials(deck, params, &lands, params.trials, rng)?;
    let result = tally.finish(None);

    debug!("Keepable rate {:.4}", result.keepable_rate);
    Ok(result)
}

/// Estimate keepable-hand and combo rates from full shuffles.
/// Each trial scores the hand and the combo window from the same shuffle.
pub fn run_combo_simulation(
    deck: &Deck,
    params: &SimulationParams,
    combo: &ComboParams,
    rng: &mut SimRng,
) -> Result<SimulationResult, SimulationError> {
    validate(deck, params)?;
    validate_combo(deck, combo)?;
    debug!(
        "Running {} shuffle trials over {} cards, combo window {} (seed {})",
        params.trials,
        deck.len(),
        combo.window_size,
        rng.seed()
    );

    let lands = LandMask::new(deck, &params.land_keywords);
    let tally = combo_trials(deck, params, combo, &lands, params.trials, rng);
    let result = tally.finish(Some(combo.window_size));

    debug!(
        "Keepable rate {:.4}, combo rate {:.4}",
        result.keepable_rate,
        result.combo_rate().unwrap_or_default()
    );
    Ok(result)
}

/// Parallel version of [`run_basic_simulation`].
/// Each chunk of trials owns its own ChaCha stream derived from `seed`.
pub fn par_run_basic_simulation(
    deck: &Deck,
    params: &SimulationParams,
    seed: u64,
) -> Result<SimulationResult, SimulationError> {
    validate(deck, params)?;
    debug!(
        "Running {} hand trials in parallel over {} cards (seed {})",
        params.trials,
        deck.len(),
        seed
    );

    let lands = LandMask::new(deck, &params.land_keywords);
    let tally = chunks(params.trials)
        .into_par_iter()
        .map(|(stream, trials)| {
            let mut rng = SimRng::with_stream(seed, stream);
            basic_trials(deck, params, &lands, trials, &mut rng)
        })
        .try_reduce(Tally::default, |a, b| Ok(a.merge(b)))?;

    Ok(tally.finish(None))
}

/// Parallel version of [`run_combo_simulation`]
pub fn par_run_combo_simulation(
    deck: &Deck,
    params: &SimulationParams,
    combo: &ComboParams,
    seed: u64,
) -> Result<SimulationResult, SimulationError> {
    validate(deck, params)?;
    validate_combo(deck, combo)?;
    debug!(
        "Running {} shuffle trials in parallel over {} cards, combo window {} (seed {})",
        params.trials,
        deck.len(),
        combo.window_size,
        seed
    );

    let lands = LandMask::new(deck, &params.land_keywords);
    let tally = chunks(params.trials)
        .into_par_iter()
        .map(|(stream, trials)| {
            let mut rng = SimRng::with_stream(seed, stream);
            combo_trials(deck, params, combo, &lands, trials, &mut rng)
        })
        .reduce(Tally::default, Tally::merge);

    Ok(tally.finish(Some(combo.window_size)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::analyze::land_range_probability;
    use crate::simulation::deck::parse_decklist;

    fn params(min_lands: usize, max_lands: usize, trials: usize) -> SimulationParams {
        SimulationParams {
            min_lands,
            max_lands,
            land_keywords: KeywordSet::parse("Mountain"),
            trials,
        }
    }

    fn combo(keywords: &str, window_size: usize) -> ComboParams {
        ComboParams {
            combo_keywords: KeywordSet::parse(keywords),
            window_size,
        }
    }

    fn limited_deck() -> Deck {
        parse_decklist("17 Mountain\n23 Lightning Bolt").deck
    }

    #[test]
    fn test_count_lands_and_keepable() {
        let hand = ["Mountain", "Mountain Pass", "Lightning Bolt", "Shock"];
        let p = params(2, 4, 1);
        assert_eq!(count_lands(&hand, &p.land_keywords), 2);
        assert!(is_keepable(&hand, &p));
        assert!(!is_keepable(&hand, &params(3, 4, 1)));
    }

    #[test]
    fn test_single_trial_is_zero_or_one() {
        let deck = limited_deck();
        for seed in 0..20 {
            let mut rng = SimRng::new(Some(seed));
            let result = run_basic_simulation(&deck, &params(2, 4, 1), &mut rng)
                .expect("valid simulation");
            assert!(result.keepable_rate == 0.0 || result.keepable_rate == 1.0);
            assert_eq!(result.trials, 1);
        }
    }

    #[test]
    fn test_all_lands_deck() {
        let deck = parse_decklist("20 Mountain").deck;
        let mut rng = SimRng::new(Some(1));

        let result = run_basic_simulation(&deck, &params(7, 7, 500), &mut rng)
            .expect("valid simulation");
        assert_eq!(result.keepable_rate, 1.0);
        assert_eq!(result.land_histogram[7], 500);
        assert_eq!(result.average_lands(), 7.0);

        let result = run_basic_simulation(&deck, &params(0, 6, 500), &mut rng)
            .expect("valid simulation");
        assert_eq!(result.keepable_rate, 0.0);
    }

    #[test]
    fn test_widening_range_never_lowers_rate() {
        let deck = limited_deck();
        let ranges = [(3, 3), (2, 4), (1, 5), (0, 7)];
        let mut last = 0.0;
        for (min, max) in ranges {
            let mut rng = SimRng::new(Some(77));
            let result = run_basic_simulation(&deck, &params(min, max, 2_000), &mut rng)
                .expect("valid simulation");
            assert!(
                result.keepable_rate >= last,
                "range {}..={} lowered the rate",
                min,
                max
            );
            last = result.keepable_rate;
        }
        assert_eq!(last, 1.0);
    }

    #[test]
    fn test_deck_too_small_runs_no_trials() {
        let deck = parse_decklist("3 Mountain\n3 Lightning Bolt").deck;
        let mut rng = SimRng::new(Some(9));
        let untouched = rng.clone();

        let basic = run_basic_simulation(&deck, &params(2, 4, 100), &mut rng);
        assert_eq!(
            basic,
            Err(SimulationError::DeckTooSmall {
                required: 7,
                actual: 6
            })
        );

        let with_combo =
            run_combo_simulation(&deck, &params(2, 4, 100), &combo("Bolt", 3), &mut rng);
        assert!(matches!(with_combo, Err(SimulationError::DeckTooSmall { .. })));

        // the generator was never advanced
        assert_eq!(
            rng.sample_indices(1000, 10),
            untouched.clone().sample_indices(1000, 10)
        );
    }

    #[test]
    fn test_invalid_parameters() {
        let deck = limited_deck();
        let mut rng = SimRng::new(Some(10));

        let zero_trials = run_basic_simulation(&deck, &params(2, 4, 0), &mut rng);
        assert!(matches!(zero_trials, Err(SimulationError::InvalidParameter(_))));

        let inverted = run_basic_simulation(&deck, &params(5, 2, 10), &mut rng);
        assert!(matches!(inverted, Err(SimulationError::InvalidParameter(_))));

        let wide = run_combo_simulation(&deck, &params(2, 4, 10), &combo("Bolt", 41), &mut rng);
        assert!(matches!(wide, Err(SimulationError::InvalidParameter(_))));

        let empty = run_combo_simulation(&deck, &params(2, 4, 10), &combo("Bolt", 0), &mut rng);
        assert!(matches!(empty, Err(SimulationError::InvalidParameter(_))));
    }

    #[test]
    fn test_combo_always_present_in_full_window() {
        let deck = parse_decklist("1 Card A\n1 Card B\n18 Mountain").deck;
        let mut rng = SimRng::new(Some(11));
        let result = run_combo_simulation(
            &deck,
            &params(0, 7, 300),
            &combo("Card A, Card B", 20),
            &mut rng,
        )
        .expect("valid simulation");
        assert_eq!(result.combo_rate(), Some(1.0));
        assert_eq!(result.keepable_rate, 1.0);
    }

    #[test]
    fn test_missing_combo_piece_never_hits() {
        let deck = parse_decklist("1 Card A\n1 Card B\n18 Mountain").deck;
        let mut rng = SimRng::new(Some(12));
        let result = run_combo_simulation(
            &deck,
            &params(2, 4, 300),
            &combo("Card A, Card C", 20),
            &mut rng,
        )
        .expect("valid simulation");
        let combo = result.combo.expect("combo result");
        assert_eq!(combo.hits, 0);
        assert_eq!(combo.window_size, 20);
    }

    #[test]
    fn test_hand_and_combo_scored_from_same_shuffle() {
        // the only land is also the only combo piece: with a 7-card window a
        // trial is keepable exactly when it is a combo hit
        let deck = parse_decklist("1 Mountain\n39 Shock").deck;
        let p = params(1, 1, 5_000);

        let mut rng = SimRng::new(Some(21));
        let result = run_combo_simulation(&deck, &p, &combo("Mountain", 7), &mut rng)
            .expect("valid simulation");
        let hits = result.combo.as_ref().expect("combo result").hits;
        assert!(hits > 0);
        assert_eq!(hits, result.keepable_count);
        assert_eq!(hits, result.land_histogram[1]);

        // a smaller window only sees hands that already hold the land
        let mut rng = SimRng::new(Some(21));
        let result = run_combo_simulation(&deck, &p, &combo("Mountain", 3), &mut rng)
            .expect("valid simulation");
        let hits = result.combo.as_ref().expect("combo result").hits;
        assert!(hits > 0);
        assert!(hits < result.keepable_count);
    }

    #[test]
    fn test_combo_rate_matches_two_card_closed_form() {
        // P(both of two specific cards in the top 7 of 40) = C(38,5) / C(40,7)
        let deck = parse_decklist("1 Card A\n1 Card B\n17 Mountain\n21 Shock").deck;
        let mut rng = SimRng::new(Some(13));
        let result = run_combo_simulation(
            &deck,
            &params(2, 4, 50_000),
            &combo("Card A, Card B", 7),
            &mut rng,
        )
        .expect("valid simulation");
        let expected = (7.0 * 6.0) / (40.0 * 39.0);
        let rate = result.combo_rate().expect("combo rate");
        assert!(
            (rate - expected).abs() < 0.005,
            "combo rate {} vs expected {}",
            rate,
            expected
        );
    }

    #[test]
    fn test_keepable_rate_converges_to_hypergeometric() {
        let deck = limited_deck();
        let mut rng = SimRng::new(Some(2024));
        let result = run_basic_simulation(&deck, &params(2, 4, 100_000), &mut rng)
            .expect("valid simulation");
        let exact = land_range_probability(40, 17, HAND_SIZE, 2, 4);
        assert!(
            (result.keepable_rate - exact).abs() < 0.01,
            "simulated {} vs exact {}",
            result.keepable_rate,
            exact
        );
    }

    #[test]
    fn test_combo_keepable_rate_converges_to_hypergeometric() {
        let deck = limited_deck();
        let result = par_run_combo_simulation(
            &deck,
            &params(2, 4, 100_000),
            &combo("Lightning Bolt", 7),
            2025,
        )
        .expect("valid simulation");
        let exact = land_range_probability(40, 17, HAND_SIZE, 2, 4);
        assert!((result.keepable_rate - exact).abs() < 0.01);
    }

    #[test]
    fn test_parallel_is_deterministic_for_seed() {
        let deck = limited_deck();
        let p = params(2, 4, 10_000);
        let a = par_run_basic_simulation(&deck, &p, 99).expect("valid simulation");
        let b = par_run_basic_simulation(&deck, &p, 99).expect("valid simulation");
        assert_eq!(a, b);
        assert_eq!(a.trials, 10_000);
        assert_eq!(a.land_histogram.iter().sum::<usize>(), 10_000);
    }

    #[test]
    fn test_parallel_rejects_small_deck() {
        let deck = parse_decklist("6 Mountain").deck;
        let result = par_run_basic_simulation(&deck, &params(2, 4, 10), 1);
        assert!(matches!(result, Err(SimulationError::DeckTooSmall { .. })));
    }

    #[test]
    fn test_chunks_cover_all_trials() {
        let parts = chunks(TRIALS_PER_CHUNK * 2 + 5);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts.iter().map(|(_, n)| n).sum::<usize>(), TRIALS_PER_CHUNK * 2 + 5);
        assert_eq!(parts[2], (2, 5));
    }
}
