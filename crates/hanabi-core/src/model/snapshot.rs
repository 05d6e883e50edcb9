use crate::model::config::GameConfig;
use crate::model::state::{GameState, MoveError, Position};
use serde::{Deserialize, Serialize};

/// Portable record of a table position, used to replay decisions outside a running game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateSnapshot {
    pub config: GameConfig,
    pub position: Position,
    pub score: u32,
    pub deck_size: usize,
}

impl StateSnapshot {
    pub fn capture(state: &GameState) -> Self {
        StateSnapshot {
            config: *state.config(),
            position: Position {
                hands: state.player_hands(),
                fireworks: state.fireworks().to_vec(),
                discard_pile: state.discard_pile().to_vec(),
                information_tokens: state.information_tokens(),
                life_tokens: state.life_tokens(),
                cur_player: state.next_to_act(),
            },
            score: state.score(),
            deck_size: state.deck_size(),
        }
    }

    /// Rebuilds the position. Hint knowledge is not part of the snapshot.
    pub fn restore(&self) -> Result<GameState, MoveError> {
        GameState::from_position(self.config, &self.position)
    }

    pub fn to_json(state: &GameState) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&Self::capture(state))
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::StateSnapshot;
    use crate::model::config::GameConfig;
    use crate::model::state::GameState;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn snapshot_roundtrip_restores_position() {
        let mut rng = StdRng::seed_from_u64(99);
        let state = GameState::new(GameConfig::full(3), &mut rng).unwrap();
        let json = StateSnapshot::to_json(&state).unwrap();
        assert!(json.contains("\"information_tokens\": 8"));
        let restored = StateSnapshot::from_json(&json).unwrap().restore().unwrap();
        assert_eq!(restored.player_hands(), state.player_hands());
        assert_eq!(restored.deck(), state.deck());
    }

    #[test]
    fn snapshot_fills_missing_fields_with_defaults() {
        let legacy = r#"{
            "config": { "players": 2 },
            "position": {
                "hands": [[{"color": "Red", "rank": "One"}], [{"color": "Blue", "rank": "Five"}]],
                "information_tokens": 8,
                "life_tokens": 3
            },
            "score": 0,
            "deck_size": 48
        }"#;
        let snapshot = StateSnapshot::from_json(legacy).unwrap();
        assert_eq!(snapshot.config.colors, 5);
        let state = snapshot.restore().unwrap();
        assert_eq!(state.deck_size(), 48);
        assert_eq!(state.fireworks_score(), 0);
    }
}
