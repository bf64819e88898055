pub mod analyze;
pub mod deck;
pub mod engine;
pub mod hand;
pub mod sweep;

pub use deck::{parse_deck_file, parse_decklist, Deck, DeckError, DecklistLineError, ParsedDecklist};
pub use engine::{
    par_run_basic_simulation, par_run_combo_simulation, run_basic_simulation,
    run_combo_simulation, ComboParams, ComboResult, SimulationError, SimulationParams,
    SimulationResult,
};
pub use hand::{draw_hand, SampleError, ShuffledDeck, HAND_SIZE};
