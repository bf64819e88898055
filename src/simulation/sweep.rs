use crate::card::KeywordSet;
use crate::simulation::deck::Deck;
use crate::simulation::engine::{
    par_run_combo_simulation, ComboParams, SimulationError, SimulationParams,
};
use serde::Serialize;

/// Combo and keepable rates for one combo window size
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSweepPoint {
    pub window_size: usize,
    pub combo_rate: f64,
    pub keepable_rate: f64,
}

/// Run the combo simulation for every window size in `1..=max_window`.
///
/// Every window uses the same seed, so all windows see the same shuffles
/// and the combo rate never decreases as the window grows.
pub fn sweep_combo_windows<F>(
    deck: &Deck,
    params: &SimulationParams,
    combo_keywords: &KeywordSet,
    max_window: usize,
    seed: u64,
    mut on_point: F,
) -> Result<Vec<WindowSweepPoint>, SimulationError>
where
    F: FnMut(&WindowSweepPoint),
{
    if max_window == 0 {
        return Err(SimulationError::InvalidParameter(
            "sweep needs at least one window size".to_string(),
        ));
    }

    let mut points = Vec::with_capacity(max_window);
    for window_size in 1..=max_window {
        let combo = ComboParams {
            combo_keywords: combo_keywords.clone(),
            window_size,
        };
        let result = par_run_combo_simulation(deck, params, &combo, seed)?;
        let point = WindowSweepPoint {
            window_size,
            combo_rate: result.combo_rate().unwrap_or_default(),
            keepable_rate: result.keepable_rate,
        };
        on_point(&point);
        points.push(point);
    }

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::deck::parse_decklist;

    fn params() -> SimulationParams {
        SimulationParams {
            min_lands: 2,
            max_lands: 4,
            land_keywords: KeywordSet::parse("Island"),
            trials: 5_000,
        }
    }

    #[test]
    fn test_combo_rate_grows_with_window() {
        let deck =
            parse_decklist("4 Thassa's Oracle\n4 Demonic Consultation\n20 Island\n32 Opt").deck;
        let combo = KeywordSet::parse("Thassa, Consultation");

        let mut seen = 0;
        let points = sweep_combo_windows(&deck, &params(), &combo, 20, 31, |_| seen += 1)
            .expect("valid sweep");

        assert_eq!(points.len(), 20);
        assert_eq!(seen, 20);
        assert_eq!(points[0].combo_rate, 0.0, "two pieces cannot fit in one card");
        for pair in points.windows(2) {
            assert!(pair[1].combo_rate >= pair[0].combo_rate);
            // hand is the same top 7 in every run
            assert_eq!(pair[1].keepable_rate, pair[0].keepable_rate);
        }
    }

    #[test]
    fn test_window_larger_than_deck_is_rejected() {
        let deck = parse_decklist("8 Island").deck;
        let island = KeywordSet::parse("Island");
        let result = sweep_combo_windows(&deck, &params(), &island, 9, 1, |_| {});
        assert!(matches!(result, Err(SimulationError::InvalidParameter(_))));
    }

    #[test]
    fn test_zero_windows_rejected() {
        let deck = parse_decklist("8 Island").deck;
        let result = sweep_combo_windows(&deck, &params(), &KeywordSet::default(), 0, 1, |_| {});
        assert!(matches!(result, Err(SimulationError::InvalidParameter(_))));
    }
}
