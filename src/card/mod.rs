pub mod keywords;

pub use keywords::{has_combo, matches, KeywordSet};
