//! Information-set MCTS with redeterminization.
//!
//! - `params`: search configuration and its environment overrides.
//! - `scoring`: direct and regret-shaped rewards.
//! - `forward`: the per-iteration forward model.
//! - `tree`: the move-sequence keyed statistics arena.
//! - `agent`: the search driver.

mod agent;
mod forward;
mod params;
pub mod scoring;
mod tree;

pub use agent::{ChildSummary, MctsAgent, SearchError, SearchOutcome};
pub use forward::{ForwardModel, StepOutcome};
pub use params::{ExpansionMode, MctsConfig, ScoringMode};
pub use scoring::RegretTracker;
pub use tree::{NodeId, SearchTree};
