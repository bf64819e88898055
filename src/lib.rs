pub mod card;
pub mod config;
pub mod rng;
pub mod simulation;
