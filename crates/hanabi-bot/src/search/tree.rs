//! Search tree stored as an arena keyed by the move sequence from the root.

use hanabi_core::model::moves::Move;
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashMap;

pub type NodeId = usize;

/// Relative tolerance when comparing UCT scores for ties.
const TIE_EPSILON: f64 = 1e-12;

/// Visit statistics for every move sequence seen during one decision.
#[derive(Debug, Clone)]
pub struct SearchTree {
    index: HashMap<Vec<Move>, NodeId>,
    paths: Vec<Vec<Move>>,
    visits: Vec<u32>,
    value: Vec<f64>,
    children: Vec<Option<Vec<NodeId>>>,
    exploration_weight: f64,
}

impl SearchTree {
    pub const ROOT: NodeId = 0;

    pub fn new(exploration_weight: f64) -> Self {
        let mut tree = Self {
            index: HashMap::new(),
            paths: Vec::new(),
            visits: Vec::new(),
            value: Vec::new(),
            children: Vec::new(),
            exploration_weight,
        };
        tree.intern(Vec::new());
        tree
    }

    /// Returns the id for a move sequence, allocating it on first sight.
    pub fn intern(&mut self, path: Vec<Move>) -> NodeId {
        if let Some(&id) = self.index.get(&path) {
            return id;
        }
        let id = self.paths.len();
        self.index.insert(path.clone(), id);
        self.paths.push(path);
        self.visits.push(0);
        self.value.push(0.0);
        self.children.push(None);
        id
    }

    pub fn lookup(&self, path: &[Move]) -> Option<NodeId> {
        self.index.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn path(&self, id: NodeId) -> &[Move] {
        &self.paths[id]
    }

    /// Move leading into `id`; `None` for the root.
    pub fn last_move(&self, id: NodeId) -> Option<Move> {
        self.paths[id].last().copied()
    }

    pub fn visits(&self, id: NodeId) -> u32 {
        self.visits[id]
    }

    pub fn value(&self, id: NodeId) -> f64 {
        self.value[id]
    }

    pub fn mean(&self, id: NodeId) -> f64 {
        match self.visits[id] {
            0 => 0.0,
            n => self.value[id] / n as f64,
        }
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.children[id].is_some()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children[id].as_deref().unwrap_or(&[])
    }

    /// Gives `id` one child per move, first occurrence wins. A no-op once expanded.
    pub fn expand(&mut self, id: NodeId, moves: &[Move]) {
        if self.is_expanded(id) {
            return;
        }
        let mut ids: Vec<NodeId> = Vec::with_capacity(moves.len());
        for &mv in moves {
            let mut path = self.paths[id].clone();
            path.push(mv);
            let child = self.intern(path);
            if !ids.contains(&child) {
                ids.push(child);
            }
        }
        self.children[id] = Some(ids);
    }

    /// UCT choice among `id`'s children. Unvisited children come first, uniformly.
    pub fn uct_select<R: Rng + ?Sized>(&self, id: NodeId, rng: &mut R) -> Option<NodeId> {
        let children = self.children(id);
        let unvisited: Vec<NodeId> = children
            .iter()
            .copied()
            .filter(|&child| self.visits[child] == 0)
            .collect();
        if !unvisited.is_empty() {
            return unvisited.choose(rng).copied();
        }
        let log_parent = (self.visits[id].max(1) as f64).ln();
        let scores: Vec<(NodeId, f64)> = children
            .iter()
            .map(|&child| {
                let n = self.visits[child] as f64;
                let exploit = self.value[child] / n;
                let explore = self.exploration_weight * (log_parent / n).sqrt();
                (child, exploit + explore)
            })
            .collect();
        best_with_ties(&scores, rng)
    }

    /// N += 1 and Q += reward on every node of the path.
    pub fn backpropagate(&mut self, path: &[NodeId], reward: f64) {
        for &id in path {
            self.visits[id] += 1;
            self.value[id] += reward;
        }
    }

    /// Best child by mean value among those visited more than `min_visits` times,
    /// or a uniformly random child when none qualifies.
    pub fn choose<R: Rng + ?Sized>(&self, id: NodeId, min_visits: u32, rng: &mut R) -> Option<NodeId> {
        let children = self.children(id);
        let scores: Vec<(NodeId, f64)> = children
            .iter()
            .copied()
            .filter(|&child| self.visits[child] > min_visits)
            .map(|child| (child, self.mean(child)))
            .collect();
        if scores.is_empty() {
            return children.choose(rng).copied();
        }
        best_with_ties(&scores, rng)
    }
}

fn best_with_ties<R: Rng + ?Sized>(scores: &[(NodeId, f64)], rng: &mut R) -> Option<NodeId> {
    let best = scores
        .iter()
        .map(|(_, score)| *score)
        .fold(f64::NEG_INFINITY, f64::max);
    let tolerance = TIE_EPSILON * best.abs().max(1.0);
    let tied: Vec<NodeId> = scores
        .iter()
        .filter(|(_, score)| (best - *score).abs() <= tolerance)
        .map(|(id, _)| *id)
        .collect();
    tied.choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use super::SearchTree;
    use hanabi_core::model::moves::Move;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn moves(count: usize) -> Vec<Move> {
        (0..count).map(|slot| Move::Play { slot }).collect()
    }

    #[test]
    fn nodes_are_identified_by_move_sequence() {
        let mut tree = SearchTree::new(1.0);
        tree.expand(SearchTree::ROOT, &moves(3));
        let child = tree.children(SearchTree::ROOT)[1];
        assert_eq!(tree.path(child), &[Move::Play { slot: 1 }]);
        assert_eq!(tree.intern(vec![Move::Play { slot: 1 }]), child);
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn expand_is_idempotent_and_collapses_duplicates() {
        let mut tree = SearchTree::new(1.0);
        let proposed = [
            Move::Play { slot: 0 },
            Move::Discard { slot: 1 },
            Move::Play { slot: 0 },
        ];
        tree.expand(SearchTree::ROOT, &proposed);
        tree.expand(SearchTree::ROOT, &moves(5));
        let children = tree.children(SearchTree::ROOT);
        assert_eq!(children.len(), 2);
        assert_eq!(tree.last_move(children[0]), Some(Move::Play { slot: 0 }));
        assert_eq!(tree.last_move(children[1]), Some(Move::Discard { slot: 1 }));
    }

    #[test]
    fn backpropagation_is_linear() {
        let mut tree = SearchTree::new(1.0);
        tree.expand(SearchTree::ROOT, &moves(2));
        let child = tree.children(SearchTree::ROOT)[0];
        tree.expand(child, &moves(2));
        let grandchild = tree.children(child)[1];
        let path = [SearchTree::ROOT, child, grandchild];
        for _ in 0..7 {
            tree.backpropagate(&path, 2.5);
        }
        for id in path {
            assert_eq!(tree.visits(id), 7);
            assert!((tree.value(id) - 17.5).abs() < 1e-9);
        }
        assert_eq!(tree.visits(tree.children(SearchTree::ROOT)[1]), 0);
    }

    #[test]
    fn unvisited_children_are_tried_first() {
        let mut tree = SearchTree::new(1.0);
        tree.expand(SearchTree::ROOT, &moves(3));
        let children = tree.children(SearchTree::ROOT).to_vec();
        tree.backpropagate(&[SearchTree::ROOT, children[0]], 10.0);
        tree.backpropagate(&[SearchTree::ROOT, children[2]], 10.0);
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..20 {
            assert_eq!(tree.uct_select(SearchTree::ROOT, &mut rng), Some(children[1]));
        }
    }

    #[test]
    fn uct_ties_are_broken_uniformly() {
        let mut tree = SearchTree::new(1.4);
        tree.expand(SearchTree::ROOT, &moves(4));
        let children = tree.children(SearchTree::ROOT).to_vec();
        for &child in &children {
            for _ in 0..3 {
                tree.backpropagate(&[SearchTree::ROOT, child], 1.0);
            }
        }
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts = [0u32; 4];
        let trials = 4000;
        for _ in 0..trials {
            let picked = tree.uct_select(SearchTree::ROOT, &mut rng).unwrap();
            let index = children.iter().position(|&c| c == picked).unwrap();
            counts[index] += 1;
        }
        for count in counts {
            assert!((850..=1150).contains(&count), "skewed selection: {counts:?}");
        }
    }

    #[test]
    fn choose_prefers_best_mean_above_threshold() {
        let mut tree = SearchTree::new(1.0);
        tree.expand(SearchTree::ROOT, &moves(3));
        let children = tree.children(SearchTree::ROOT).to_vec();
        tree.backpropagate(&[SearchTree::ROOT, children[0]], 5.0);
        for _ in 0..3 {
            tree.backpropagate(&[SearchTree::ROOT, children[1]], 2.0);
        }
        tree.backpropagate(&[SearchTree::ROOT, children[2]], 1.0);
        tree.backpropagate(&[SearchTree::ROOT, children[2]], 2.0);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(tree.choose(SearchTree::ROOT, 0, &mut rng), Some(children[0]));
        assert_eq!(tree.choose(SearchTree::ROOT, 1, &mut rng), Some(children[1]));
    }

    #[test]
    fn choose_falls_back_to_random_child() {
        let mut tree = SearchTree::new(1.0);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(tree.choose(SearchTree::ROOT, 0, &mut rng), None);
        tree.expand(SearchTree::ROOT, &moves(2));
        let picked = tree.choose(SearchTree::ROOT, 10, &mut rng).unwrap();
        assert!(tree.children(SearchTree::ROOT).contains(&picked));
    }
}
