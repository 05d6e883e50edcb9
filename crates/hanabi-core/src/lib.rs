//! Hanabi rules engine plus the belief tools used to search over hidden hands.

pub mod belief;
pub mod model;
