use super::forward::ForwardModel;
use super::params::{ExpansionMode, MctsConfig};
use super::tree::{NodeId, SearchTree};
use crate::policy::RulePolicy;
use crate::rules::Rule;
use hanabi_core::belief::{DeterminizationError, Determinizer, RestoreReport};
use hanabi_core::model::moves::Move;
use hanabi_core::model::state::{Actor, GameState, MoveError};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{Level, event};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("cannot search from a finished game")]
    TerminalState,
    #[error("a card must be dealt before the next decision")]
    AwaitingChance,
    #[error("seat {searcher} cannot search while seat {acting} is to act")]
    NotSearchersTurn { searcher: usize, acting: usize },
    #[error("seat {0} is not at the table")]
    InvalidSeat(usize),
    #[error("no legal moves available")]
    NoLegalMoves,
    #[error("master determinization failed: {0}")]
    Determinization(#[from] DeterminizationError),
    #[error("engine rejected a search move: {0}")]
    Engine(#[from] MoveError),
}

/// Statistics for one root child after a search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChildSummary {
    pub mv: Move,
    pub visits: u32,
    pub value: f64,
}

/// Everything a decision produced, for logging and tests.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub chosen: Move,
    pub iterations: u32,
    /// Iterations cut short by a move that was illegal under their determinization.
    pub truncated: u32,
    /// True when the move was drawn at random instead of read from the tree.
    pub fallback: bool,
    pub elapsed: Duration,
    pub tree_size: usize,
    pub root_children: Vec<ChildSummary>,
    pub restores: RestoreReport,
}

/// Redeterminizing IS-MCTS player.
#[derive(Debug)]
pub struct MctsAgent {
    config: MctsConfig,
    determinizer: Determinizer,
    expansion_rules: Vec<Rule>,
    rng: StdRng,
}

impl MctsAgent {
    pub fn new(config: MctsConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let expansion_rules = match config.expansion {
            ExpansionMode::Legal => Vec::new(),
            ExpansionMode::Rules { preset } => preset.rules(),
        };
        Self {
            determinizer: Determinizer::new(config.determinization_attempts),
            config,
            expansion_rules,
            rng,
        }
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    /// Picks a move for `searcher`, who must be the acting player of `state`.
    pub fn choose_move(&mut self, state: &GameState, searcher: usize) -> Result<Move, SearchError> {
        self.search(state, searcher).map(|outcome| outcome.chosen)
    }

    pub fn search(&mut self, state: &GameState, searcher: usize) -> Result<SearchOutcome, SearchError> {
        if searcher >= state.num_players() {
            return Err(SearchError::InvalidSeat(searcher));
        }
        match state.cur_player() {
            Actor::Terminal => return Err(SearchError::TerminalState),
            Actor::Chance => return Err(SearchError::AwaitingChance),
            Actor::Player(acting) if acting != searcher => {
                return Err(SearchError::NotSearchersTurn { searcher, acting });
            }
            Actor::Player(_) => {}
        }
        let legal = state.legal_moves();
        if legal.is_empty() {
            return Err(SearchError::NoLegalMoves);
        }

        let start = Instant::now();
        let budget = Duration::from_millis(self.config.max_time_ms);
        let mut tree = SearchTree::new(self.config.exploration_weight);
        let mut rollout: Vec<RulePolicy> = (0..state.num_players())
            .map(|_| RulePolicy::from_preset(self.config.rollout_policy))
            .collect();
        let mut iterations = 0u32;
        let mut truncated = 0u32;
        let mut restores = RestoreReport::default();

        while iterations < self.config.max_rollouts && start.elapsed() < budget {
            let result = self.iterate(&mut tree, state, searcher, &mut rollout)?;
            iterations += 1;
            truncated += u32::from(result.truncated);
            restores.restored += result.restores.restored;
            restores.substitutions += result.restores.substitutions;
            restores.overrides += result.restores.overrides;
        }

        let from_tree = tree
            .choose(SearchTree::ROOT, self.config.min_visits, &mut self.rng)
            .and_then(|id| tree.last_move(id))
            .filter(|mv| legal.contains(mv));
        let (chosen, fallback) = match from_tree {
            Some(mv) => (mv, false),
            None => match legal.choose(&mut self.rng) {
                Some(&mv) => (mv, true),
                None => return Err(SearchError::NoLegalMoves),
            },
        };

        let root_children = tree
            .children(SearchTree::ROOT)
            .iter()
            .filter_map(|&id| {
                tree.last_move(id).map(|mv| ChildSummary {
                    mv,
                    visits: tree.visits(id),
                    value: tree.value(id),
                })
            })
            .collect();
        let outcome = SearchOutcome {
            chosen,
            iterations,
            truncated,
            fallback,
            elapsed: start.elapsed(),
            tree_size: tree.len(),
            root_children,
            restores,
        };
        log_decision(searcher, &outcome);
        Ok(outcome)
    }

    /// One determinize, select, expand, simulate, backpropagate cycle.
    fn iterate(
        &mut self,
        tree: &mut SearchTree,
        state: &GameState,
        searcher: usize,
        rollout: &mut [RulePolicy],
    ) -> Result<IterationResult, SearchError> {
        let mut model = ForwardModel::new(state, searcher, self.config.scoring, self.determinizer);
        model.determinize_searcher(&mut self.rng)?;

        let mut path: Vec<NodeId> = vec![SearchTree::ROOT];
        let mut node = SearchTree::ROOT;
        while tree.is_expanded(node) && !model.is_terminal() {
            let Some(child) = tree.uct_select(node, &mut self.rng) else {
                break;
            };
            if !self.descend(&mut model, tree, child)? {
                tree.backpropagate(&path, model.reward());
                return Ok(IterationResult {
                    truncated: true,
                    restores: model.restores(),
                });
            }
            path.push(child);
            node = child;
        }

        if !model.is_terminal() {
            let moves = self.expansion_moves(&model);
            tree.expand(node, &moves);
            if let Some(child) = tree.uct_select(node, &mut self.rng) {
                if self.descend(&mut model, tree, child)? {
                    path.push(child);
                }
            }
        } else {
            tree.expand(node, &[]);
        }

        let reward = self.simulate(&mut model, rollout)?;
        tree.backpropagate(&path, reward);
        Ok(IterationResult {
            truncated: false,
            restores: model.restores(),
        })
    }

    /// Steps into `child`. Returns false when its move is illegal in this determinization.
    fn descend(
        &mut self,
        model: &mut ForwardModel,
        tree: &SearchTree,
        child: NodeId,
    ) -> Result<bool, SearchError> {
        let Some(mv) = tree.last_move(child) else {
            return Ok(false);
        };
        if !model.state().is_legal(&mv) || mv.is_extension() {
            return Ok(false);
        }
        model.step(mv, &mut self.rng)?;
        Ok(true)
    }

    fn expansion_moves(&mut self, model: &ForwardModel) -> Vec<Move> {
        let legal = model.state().legal_moves();
        if self.expansion_rules.is_empty() {
            return legal;
        }
        let observation = model.observation();
        let mut proposed: Vec<Move> = Vec::with_capacity(self.expansion_rules.len());
        for rule in &self.expansion_rules {
            if let Some(mv) = rule.evaluate(&observation, &mut self.rng) {
                if legal.contains(&mv) && !proposed.contains(&mv) {
                    proposed.push(mv);
                }
            }
        }
        if proposed.is_empty() { legal } else { proposed }
    }

    /// Plays rollout policies until the game ends or the horizon is reached.
    fn simulate(&mut self, model: &mut ForwardModel, rollout: &mut [RulePolicy]) -> Result<f64, SearchError> {
        let mut steps = 0;
        while !model.is_terminal() && steps < self.config.max_simulation_steps {
            let Actor::Player(seat) = model.state().cur_player() else {
                break;
            };
            let observation = model.state().observation(seat);
            let Some(mv) = rollout[seat].select(&observation, &mut self.rng) else {
                break;
            };
            model.step(mv, &mut self.rng)?;
            steps += 1;
        }
        Ok(model.reward())
    }
}

struct IterationResult {
    truncated: bool,
    restores: RestoreReport,
}

fn log_decision(searcher: usize, outcome: &SearchOutcome) {
    if !tracing::enabled!(target: "hanabi_bot::mcts", Level::DEBUG) {
        return;
    }
    let best_visits = outcome
        .root_children
        .iter()
        .map(|child| child.visits)
        .max()
        .unwrap_or(0);
    event!(
        target: "hanabi_bot::mcts",
        Level::DEBUG,
        searcher,
        chosen = %outcome.chosen,
        iterations = outcome.iterations,
        truncated = outcome.truncated,
        fallback = outcome.fallback,
        elapsed_ms = outcome.elapsed.as_millis() as u64,
        tree_size = outcome.tree_size,
        root_children = outcome.root_children.len(),
        best_visits,
        substitutions = outcome.restores.substitutions,
        overrides = outcome.restores.overrides,
    );
}

#[cfg(test)]
mod tests {
    use super::{MctsAgent, SearchError};
    use crate::search::params::MctsConfig;
    use hanabi_core::model::card::Card;
    use hanabi_core::model::config::GameConfig;
    use hanabi_core::model::moves::Move;
    use hanabi_core::model::state::{Actor, GameState, Position};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn c(text: &str) -> Card {
        text.parse().expect("card literal")
    }

    fn config(max_rollouts: u32, max_time_ms: u64) -> MctsConfig {
        MctsConfig {
            max_rollouts,
            max_time_ms,
            max_simulation_steps: 30,
            ..MctsConfig::default()
        }
        .with_seed(7)
    }

    fn opening() -> GameState {
        let mut rng = StdRng::seed_from_u64(2024);
        GameState::new(GameConfig::full(2), &mut rng).expect("game")
    }

    #[test]
    fn single_rollout_runs_one_iteration_and_follows_it() {
        let state = opening();
        let mut agent = MctsAgent::new(config(1, 60_000));
        let outcome = agent.search(&state, 0).unwrap();
        assert_eq!(outcome.iterations, 1);
        assert!(!outcome.fallback);
        let visited: Vec<_> = outcome
            .root_children
            .iter()
            .filter(|child| child.visits > 0)
            .collect();
        assert_eq!(visited.len(), 1);
        assert_eq!(visited[0].visits, 1);
        assert_eq!(outcome.chosen, visited[0].mv);
        assert!(state.is_legal(&outcome.chosen));
    }

    #[test]
    fn tiny_time_budget_still_returns_legal_move() {
        let state = opening();
        let mut agent = MctsAgent::new(config(u32::MAX, 1));
        let mv = agent.choose_move(&state, 0).unwrap();
        assert!(state.legal_moves().contains(&mv));
    }

    #[test]
    fn zero_budget_falls_back_to_random_legal_move() {
        let state = opening();
        let mut agent = MctsAgent::new(config(0, 1000));
        let outcome = agent.search(&state, 0).unwrap();
        assert_eq!(outcome.iterations, 0);
        assert!(outcome.fallback);
        assert!(state.is_legal(&outcome.chosen));
    }

    #[test]
    fn terminal_state_is_rejected() {
        let position = Position {
            hands: vec![vec![c("R3")], vec![c("B1")]],
            fireworks: vec![],
            discard_pile: vec![],
            information_tokens: 8,
            life_tokens: 1,
            cur_player: 0,
        };
        let mut state = GameState::from_position(GameConfig::full(2), &position).unwrap();
        state.apply_move(Move::Play { slot: 0 }).unwrap();
        assert_eq!(state.cur_player(), Actor::Terminal);
        let mut agent = MctsAgent::new(config(10, 1000));
        assert!(matches!(
            agent.choose_move(&state, 1),
            Err(SearchError::TerminalState)
        ));
    }

    #[test]
    fn wrong_seat_is_rejected() {
        let state = opening();
        let mut agent = MctsAgent::new(config(10, 1000));
        assert!(matches!(
            agent.choose_move(&state, 1),
            Err(SearchError::NotSearchersTurn {
                searcher: 1,
                acting: 0
            })
        ));
    }

    #[test]
    fn every_iteration_passes_through_a_root_child() {
        let state = opening();
        let mut agent = MctsAgent::new(config(40, 60_000));
        let outcome = agent.search(&state, 0).unwrap();
        assert_eq!(outcome.iterations, 40);
        let total: u32 = outcome.root_children.iter().map(|child| child.visits).sum();
        assert_eq!(total, 40);
    }
}
