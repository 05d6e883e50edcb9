pub mod card;
pub mod color;
pub mod config;
pub mod deck;
pub mod hand;
pub mod knowledge;
pub mod moves;
pub mod observation;
pub mod rank;
pub mod snapshot;
pub mod state;
