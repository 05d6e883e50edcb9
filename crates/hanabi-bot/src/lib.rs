pub mod policy;
pub mod rules;
pub mod search;

pub use policy::{MctsPolicy, Policy, PolicyContext, RulePolicy};
pub use rules::{Rule, RulePreset};
pub use search::{
    ExpansionMode, MctsAgent, MctsConfig, ScoringMode, SearchError, SearchOutcome,
};
