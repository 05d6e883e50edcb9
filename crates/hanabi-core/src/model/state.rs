use crate::model::card::Card;
use crate::model::color::Color;
use crate::model::config::{ConfigError, GameConfig};
use crate::model::deck::CardCounts;
use crate::model::hand::Hand;
use crate::model::knowledge::CardKnowledge;
use crate::model::moves::Move;
use crate::model::observation::Observation;
use crate::model::rank::Rank;
use core::fmt;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::vec::Vec;

/// Who moves next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Actor {
    Player(usize),
    /// A replacement card must be dealt before play continues.
    Chance,
    Terminal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndOfGame {
    NotFinished,
    OutOfLifeTokens,
    OutOfCards,
    CompletedFireworks,
}

/// Result of a successfully applied move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub player: usize,
    pub applied: Move,
    /// Card that left the hand on a play or discard.
    pub card: Option<Card>,
    pub scored: bool,
    pub life_lost: bool,
}

/// Explicit table position used to set up analysis and test states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub hands: Vec<Vec<Card>>,
    #[serde(default)]
    pub fireworks: Vec<u8>,
    #[serde(default)]
    pub discard_pile: Vec<Card>,
    pub information_tokens: u8,
    pub life_tokens: u8,
    #[serde(default)]
    pub cur_player: usize,
}

/// Full, perfect-information Hanabi state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    config: GameConfig,
    hands: Vec<Hand>,
    deck: CardCounts,
    discard_pile: Vec<Card>,
    fireworks: [u8; Color::COUNT],
    information_tokens: u8,
    life_tokens: u8,
    cur_player: usize,
    pending_deal: Option<usize>,
    turns_to_play: Option<usize>,
    turns_taken: u32,
}

impl GameState {
    /// Deals a fresh game.
    pub fn new<R: Rng + ?Sized>(config: GameConfig, rng: &mut R) -> Result<Self, MoveError> {
        config.validate().map_err(MoveError::Config)?;
        let mut state = Self::empty(config);
        for seat in 0..config.players {
            for _ in 0..config.hand_size {
                let card = state.deck.sample(rng).ok_or(MoveError::DeckEmpty)?;
                state.deck.remove(card);
                let knowledge = state.fresh_knowledge();
                state.hands[seat].push(card, knowledge);
            }
        }
        state.start_final_round_if_deck_empty();
        Ok(state)
    }

    /// Builds a state from an explicit position. The draw pile holds everything not
    /// accounted for by hands, discards and fireworks.
    pub fn from_position(config: GameConfig, position: &Position) -> Result<Self, MoveError> {
        config.validate().map_err(MoveError::Config)?;
        if position.hands.len() != config.players {
            return Err(MoveError::Position(format!(
                "expected {} hands, got {}",
                config.players,
                position.hands.len()
            )));
        }
        if position.cur_player >= config.players {
            return Err(MoveError::InvalidSeat(position.cur_player));
        }
        if position.information_tokens > config.max_information_tokens
            || position.life_tokens > config.max_life_tokens
        {
            return Err(MoveError::Position("token count exceeds maximum".to_string()));
        }

        let mut state = Self::empty(config);
        for (color_index, &height) in position.fireworks.iter().enumerate() {
            let color = Color::from_index(color_index)
                .filter(|c| c.index() < config.colors)
                .ok_or_else(|| MoveError::Position(format!("firework {color_index} not in play")))?;
            if height as usize > config.ranks {
                return Err(MoveError::Position(format!("firework {color} too high")));
            }
            for rank in Rank::in_play(height as usize) {
                state.take_from_deck(Card::new(color, rank))?;
            }
            state.fireworks[color_index] = height;
        }
        for &card in &position.discard_pile {
            state.take_from_deck(card)?;
            state.discard_pile.push(card);
        }
        for (seat, cards) in position.hands.iter().enumerate() {
            if cards.len() > config.hand_size {
                return Err(MoveError::Position(format!("hand {seat} is oversized")));
            }
            for &card in cards {
                state.take_from_deck(card)?;
                let knowledge = state.fresh_knowledge();
                state.hands[seat].push(card, knowledge);
            }
        }
        state.information_tokens = position.information_tokens;
        state.life_tokens = position.life_tokens;
        state.cur_player = position.cur_player;
        state.start_final_round_if_deck_empty();
        Ok(state)
    }

    fn empty(config: GameConfig) -> Self {
        Self {
            config,
            hands: vec![Hand::new(); config.players],
            deck: CardCounts::full(config.colors, config.ranks),
            discard_pile: Vec::new(),
            fireworks: [0; Color::COUNT],
            information_tokens: config.max_information_tokens,
            life_tokens: config.max_life_tokens,
            cur_player: 0,
            pending_deal: None,
            turns_to_play: None,
            turns_taken: 0,
        }
    }

    fn take_from_deck(&mut self, card: Card) -> Result<(), MoveError> {
        if card.color.index() >= self.config.colors || card.rank.index() >= self.config.ranks {
            return Err(MoveError::CardNotInPlay(card));
        }
        if self.deck.remove(card) {
            Ok(())
        } else {
            Err(MoveError::CardUnavailable(card))
        }
    }

    fn start_final_round_if_deck_empty(&mut self) {
        if self.deck.is_empty() && self.turns_to_play.is_none() {
            self.turns_to_play = Some(self.config.players);
        }
    }

    pub fn fresh_knowledge(&self) -> CardKnowledge {
        CardKnowledge::fresh(self.config.colors, self.config.ranks)
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn num_players(&self) -> usize {
        self.config.players
    }

    pub fn cur_player(&self) -> Actor {
        if self.is_terminal() {
            Actor::Terminal
        } else if self.pending_deal.is_some() {
            Actor::Chance
        } else {
            Actor::Player(self.cur_player)
        }
    }

    /// Seat whose turn it is, ignoring pending chance events.
    pub fn next_to_act(&self) -> usize {
        self.cur_player
    }

    pub fn pending_deal(&self) -> Option<usize> {
        self.pending_deal
    }

    pub fn hands(&self) -> &[Hand] {
        &self.hands
    }

    pub fn hand(&self, seat: usize) -> &Hand {
        &self.hands[seat]
    }

    /// Physical cards per seat, oldest first.
    pub fn player_hands(&self) -> Vec<Vec<Card>> {
        self.hands.iter().map(|hand| hand.cards().collect()).collect()
    }

    pub fn deck(&self) -> &CardCounts {
        &self.deck
    }

    pub fn deck_size(&self) -> usize {
        self.deck.total()
    }

    pub fn discard_pile(&self) -> &[Card] {
        &self.discard_pile
    }

    /// Firework heights for the colors in play.
    pub fn fireworks(&self) -> &[u8] {
        &self.fireworks[..self.config.colors]
    }

    pub fn fireworks_score(&self) -> u32 {
        self.fireworks().iter().map(|&h| h as u32).sum()
    }

    pub fn information_tokens(&self) -> u8 {
        self.information_tokens
    }

    pub fn life_tokens(&self) -> u8 {
        self.life_tokens
    }

    pub fn turns_taken(&self) -> u32 {
        self.turns_taken
    }

    pub fn card_playable_on_fireworks(&self, card: Card) -> bool {
        card.is_playable_on(self.fireworks())
    }

    pub fn end_of_game(&self) -> EndOfGame {
        if self.life_tokens == 0 {
            EndOfGame::OutOfLifeTokens
        } else if self.fireworks_score() >= self.config.max_score() {
            EndOfGame::CompletedFireworks
        } else if self.turns_to_play == Some(0) {
            EndOfGame::OutOfCards
        } else {
            EndOfGame::NotFinished
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.end_of_game() != EndOfGame::NotFinished
    }

    /// Cooperative score: the fireworks total, or zero once every life is lost.
    pub fn score(&self) -> u32 {
        if self.life_tokens == 0 {
            0
        } else {
            self.fireworks_score()
        }
    }

    /// Ordinary moves available to the acting player. Empty on chance and terminal nodes.
    pub fn legal_moves(&self) -> Vec<Move> {
        let Actor::Player(seat) = self.cur_player() else {
            return Vec::new();
        };
        let hand = &self.hands[seat];
        let mut moves = Vec::new();
        if self.information_tokens < self.config.max_information_tokens {
            moves.extend((0..hand.len()).map(|slot| Move::Discard { slot }));
        }
        moves.extend((0..hand.len()).map(|slot| Move::Play { slot }));
        if self.information_tokens > 0 {
            for offset in 1..self.config.players {
                let target = (seat + offset) % self.config.players;
                let target_hand = &self.hands[target];
                for color in Color::in_play(self.config.colors) {
                    if target_hand.cards().any(|c| c.color == color) {
                        moves.push(Move::RevealColor { target, color });
                    }
                }
                for rank in Rank::in_play(self.config.ranks) {
                    if target_hand.cards().any(|c| c.rank == rank) {
                        moves.push(Move::RevealRank { target, rank });
                    }
                }
            }
        }
        moves
    }

    pub fn is_legal(&self, mv: &Move) -> bool {
        self.check(mv).is_ok()
    }

    /// Validates a move without applying it.
    pub fn check(&self, mv: &Move) -> Result<(), MoveError> {
        match *mv {
            Move::ReturnCard { seat, slot } => {
                let hand = self.hands.get(seat).ok_or(MoveError::InvalidSeat(seat))?;
                if slot >= hand.len() {
                    return Err(MoveError::SlotOutOfRange { seat, slot });
                }
                if hand.card(slot).is_none() {
                    return Err(MoveError::SlotEmpty { seat, slot });
                }
                Ok(())
            }
            Move::DealSpecific { seat, slot, card } => {
                let hand = self.hands.get(seat).ok_or(MoveError::InvalidSeat(seat))?;
                if slot >= hand.len() {
                    return Err(MoveError::SlotOutOfRange { seat, slot });
                }
                if hand.card(slot).is_some() {
                    return Err(MoveError::SlotOccupied { seat, slot });
                }
                if !self.deck.contains(card) {
                    return Err(MoveError::CardUnavailable(card));
                }
                Ok(())
            }
            _ => self.check_turn_move(mv),
        }
    }

    fn check_turn_move(&self, mv: &Move) -> Result<(), MoveError> {
        let seat = match self.cur_player() {
            Actor::Player(seat) => seat,
            Actor::Chance => return Err(MoveError::AwaitingChance),
            Actor::Terminal => return Err(MoveError::Terminal),
        };
        if !self.hands.iter().all(Hand::is_complete) {
            return Err(MoveError::IncompleteHands);
        }
        let hand = &self.hands[seat];
        match *mv {
            Move::Play { slot } | Move::Discard { slot } => {
                if slot >= hand.len() {
                    return Err(MoveError::SlotOutOfRange { seat, slot });
                }
                if matches!(mv, Move::Discard { .. })
                    && self.information_tokens >= self.config.max_information_tokens
                {
                    return Err(MoveError::InformationTokensFull);
                }
                Ok(())
            }
            Move::RevealColor { target, color } => {
                self.check_hint_target(seat, target)?;
                if color.index() >= self.config.colors {
                    return Err(MoveError::HintNotInPlay);
                }
                if !self.hands[target].cards().any(|c| c.color == color) {
                    return Err(MoveError::HintMatchesNothing);
                }
                Ok(())
            }
            Move::RevealRank { target, rank } => {
                self.check_hint_target(seat, target)?;
                if rank.index() >= self.config.ranks {
                    return Err(MoveError::HintNotInPlay);
                }
                if !self.hands[target].cards().any(|c| c.rank == rank) {
                    return Err(MoveError::HintMatchesNothing);
                }
                Ok(())
            }
            Move::ReturnCard { .. } | Move::DealSpecific { .. } => Ok(()),
        }
    }

    fn check_hint_target(&self, seat: usize, target: usize) -> Result<(), MoveError> {
        if target >= self.config.players || target == seat {
            return Err(MoveError::InvalidTarget(target));
        }
        if self.information_tokens == 0 {
            return Err(MoveError::NoInformationTokens);
        }
        Ok(())
    }

    /// Applies a move for the acting player, or an engine-extension move for any seat.
    pub fn apply_move(&mut self, mv: Move) -> Result<MoveOutcome, MoveError> {
        self.check(&mv)?;
        let player = self.cur_player;
        let mut outcome = MoveOutcome {
            player,
            applied: mv,
            card: None,
            scored: false,
            life_lost: false,
        };

        match mv {
            Move::ReturnCard { seat, slot } => {
                let card = self.hands[seat]
                    .take_card(slot)
                    .ok_or(MoveError::SlotEmpty { seat, slot })?;
                self.deck.add(card);
                outcome.player = seat;
                outcome.card = Some(card);
                return Ok(outcome);
            }
            Move::DealSpecific { seat, slot, card } => {
                self.take_from_deck(card)?;
                self.hands[seat].fill(slot, card);
                outcome.player = seat;
                outcome.card = Some(card);
                return Ok(outcome);
            }
            Move::Play { slot } => {
                let card = self.remove_from_hand(player, slot)?;
                outcome.card = Some(card);
                if self.card_playable_on_fireworks(card) {
                    self.fireworks[card.color.index()] += 1;
                    outcome.scored = true;
                    if card.rank.index() + 1 == self.config.ranks
                        && self.information_tokens < self.config.max_information_tokens
                    {
                        self.information_tokens += 1;
                    }
                } else {
                    self.life_tokens = self.life_tokens.saturating_sub(1);
                    self.discard_pile.push(card);
                    outcome.life_lost = true;
                }
            }
            Move::Discard { slot } => {
                let card = self.remove_from_hand(player, slot)?;
                outcome.card = Some(card);
                self.discard_pile.push(card);
                self.information_tokens += 1;
            }
            Move::RevealColor { target, color } => {
                self.information_tokens -= 1;
                let hand = &mut self.hands[target];
                for slot in 0..hand.len() {
                    let matches = hand.card(slot).is_some_and(|c| c.color == color);
                    if let Some(knowledge) = hand.knowledge_mut(slot) {
                        knowledge.apply_color_hint(color, matches);
                    }
                }
            }
            Move::RevealRank { target, rank } => {
                self.information_tokens -= 1;
                let hand = &mut self.hands[target];
                for slot in 0..hand.len() {
                    let matches = hand.card(slot).is_some_and(|c| c.rank == rank);
                    if let Some(knowledge) = hand.knowledge_mut(slot) {
                        knowledge.apply_rank_hint(rank, matches);
                    }
                }
            }
        }

        self.turns_taken += 1;
        if let Some(remaining) = self.turns_to_play.as_mut() {
            *remaining = remaining.saturating_sub(1);
        }
        if mv.card_slot().is_some() && !self.deck.is_empty() && !self.is_terminal() {
            self.pending_deal = Some(player);
        }
        self.cur_player = (player + 1) % self.config.players;
        Ok(outcome)
    }

    fn remove_from_hand(&mut self, seat: usize, slot: usize) -> Result<Card, MoveError> {
        self.hands[seat]
            .remove(slot)
            .and_then(|removed| removed.card)
            .ok_or(MoveError::SlotEmpty { seat, slot })
    }

    /// Resolves a pending chance event by drawing uniformly from the remaining deck.
    pub fn deal_random_card<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Card, MoveError> {
        let seat = self.pending_deal.ok_or(MoveError::NoPendingDeal)?;
        let card = self.deck.sample(rng).ok_or(MoveError::DeckEmpty)?;
        self.deck.remove(card);
        let knowledge = self.fresh_knowledge();
        self.hands[seat].push(card, knowledge);
        self.pending_deal = None;
        self.start_final_round_if_deck_empty();
        Ok(card)
    }

    /// Overrides a slot's knowledge with that of a freshly dealt card.
    pub fn reset_knowledge(&mut self, seat: usize, slot: usize) -> Result<(), MoveError> {
        let fresh = self.fresh_knowledge();
        let hand = self.hands.get_mut(seat).ok_or(MoveError::InvalidSeat(seat))?;
        if slot >= hand.len() {
            return Err(MoveError::SlotOutOfRange { seat, slot });
        }
        hand.reset_knowledge(slot, fresh);
        Ok(())
    }

    /// Seat-relative view of the table.
    pub fn observation(&self, observer: usize) -> Observation {
        Observation::capture(self, observer)
    }

    /// Deals every pending chance card.
    pub fn resolve_chance<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), MoveError> {
        while self.cur_player() == Actor::Chance {
            self.deal_random_card(rng)?;
        }
        Ok(())
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Life tokens: {}  Info tokens: {}  Deck: {}",
            self.life_tokens,
            self.information_tokens,
            self.deck.total()
        )?;
        f.write_str("Fireworks:")?;
        for (color, height) in Color::in_play(self.config.colors).zip(self.fireworks()) {
            write!(f, " {color}{height}")?;
        }
        writeln!(f)?;
        for (seat, hand) in self.hands.iter().enumerate() {
            let marker = if seat == self.cur_player { "*" } else { " " };
            write!(f, "{marker}P{seat}:")?;
            for slot in hand.slots() {
                match slot.card {
                    Some(card) => write!(f, " {card}[{}]", slot.knowledge)?,
                    None => write!(f, " --[{}]", slot.knowledge)?,
                }
            }
            writeln!(f)?;
        }
        f.write_str("Discards:")?;
        for card in &self.discard_pile {
            write!(f, " {card}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveError {
    Config(ConfigError),
    Position(String),
    Terminal,
    AwaitingChance,
    NoPendingDeal,
    IncompleteHands,
    DeckEmpty,
    InvalidSeat(usize),
    InvalidTarget(usize),
    SlotOutOfRange { seat: usize, slot: usize },
    SlotEmpty { seat: usize, slot: usize },
    SlotOccupied { seat: usize, slot: usize },
    InformationTokensFull,
    NoInformationTokens,
    HintNotInPlay,
    HintMatchesNothing,
    CardNotInPlay(Card),
    CardUnavailable(Card),
}

impl fmt::Display for MoveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveError::Config(err) => write!(f, "invalid game config: {err}"),
            MoveError::Position(message) => write!(f, "invalid position: {message}"),
            MoveError::Terminal => f.write_str("game is over"),
            MoveError::AwaitingChance => f.write_str("a card must be dealt first"),
            MoveError::NoPendingDeal => f.write_str("no card is waiting to be dealt"),
            MoveError::IncompleteHands => f.write_str("a hand has a returned slot"),
            MoveError::DeckEmpty => f.write_str("deck is empty"),
            MoveError::InvalidSeat(seat) => write!(f, "seat {seat} does not exist"),
            MoveError::InvalidTarget(target) => write!(f, "cannot hint player {target}"),
            MoveError::SlotOutOfRange { seat, slot } => {
                write!(f, "player {seat} has no slot {slot}")
            }
            MoveError::SlotEmpty { seat, slot } => {
                write!(f, "player {seat} slot {slot} holds no card")
            }
            MoveError::SlotOccupied { seat, slot } => {
                write!(f, "player {seat} slot {slot} already holds a card")
            }
            MoveError::InformationTokensFull => {
                f.write_str("cannot discard with all information tokens")
            }
            MoveError::NoInformationTokens => f.write_str("no information tokens left"),
            MoveError::HintNotInPlay => f.write_str("hinted value is not in play"),
            MoveError::HintMatchesNothing => f.write_str("hint must touch at least one card"),
            MoveError::CardNotInPlay(card) => write!(f, "card {card} is not in this game"),
            MoveError::CardUnavailable(card) => write!(f, "no copy of {card} left in the deck"),
        }
    }
}

impl std::error::Error for MoveError {}

#[cfg(test)]
mod tests {
    use super::{Actor, EndOfGame, GameState, MoveError, Position};
    use crate::model::card::Card;
    use crate::model::color::Color;
    use crate::model::config::GameConfig;
    use crate::model::moves::Move;
    use crate::model::rank::Rank;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn c(text: &str) -> Card {
        text.parse().expect("card literal")
    }

    fn two_player(hands: [&[&str]; 2]) -> GameState {
        let position = Position {
            hands: hands
                .iter()
                .map(|cards| cards.iter().map(|s| c(s)).collect())
                .collect(),
            fireworks: vec![],
            discard_pile: vec![],
            information_tokens: 8,
            life_tokens: 3,
            cur_player: 0,
        };
        GameState::from_position(GameConfig::full(2), &position).expect("valid position")
    }

    #[test]
    fn new_game_deals_full_hands() {
        let mut rng = StdRng::seed_from_u64(7);
        let state = GameState::new(GameConfig::full(3), &mut rng).unwrap();
        for seat in 0..3 {
            assert_eq!(state.hand(seat).len(), 5);
            for slot in state.hand(seat).slots() {
                assert_eq!(slot.knowledge, state.fresh_knowledge());
            }
        }
        assert_eq!(state.deck_size(), 50 - 15);
        assert_eq!(state.cur_player(), Actor::Player(0));
        assert!(!state.is_terminal());
    }

    #[test]
    fn playing_correct_card_scores_and_requests_deal() {
        let mut state = two_player([&["R1", "B2", "G3", "W4", "Y5"], &["R2", "R3", "R4", "R5", "B1"]]);
        let outcome = state.apply_move(Move::Play { slot: 0 }).unwrap();
        assert!(outcome.scored);
        assert_eq!(state.fireworks()[Color::Red.index()], 1);
        assert_eq!(state.cur_player(), Actor::Chance);
        assert_eq!(state.pending_deal(), Some(0));
        let mut rng = StdRng::seed_from_u64(1);
        state.deal_random_card(&mut rng).unwrap();
        assert_eq!(state.hand(0).len(), 5);
        assert_eq!(state.cur_player(), Actor::Player(1));
    }

    #[test]
    fn misplay_costs_a_life_and_discards() {
        let mut state = two_player([&["R2", "B2", "G3", "W4", "Y5"], &["R1", "R3", "R4", "R5", "B1"]]);
        let outcome = state.apply_move(Move::Play { slot: 0 }).unwrap();
        assert!(outcome.life_lost);
        assert_eq!(state.life_tokens(), 2);
        assert_eq!(state.discard_pile(), &[c("R2")]);
    }

    #[test]
    fn discard_requires_spent_token() {
        let mut state = two_player([&["R2", "B2", "G3", "W4", "Y5"], &["R1", "R3", "R4", "R5", "B1"]]);
        assert_eq!(
            state.apply_move(Move::Discard { slot: 0 }),
            Err(MoveError::InformationTokensFull)
        );
        assert!(!state.legal_moves().iter().any(|m| matches!(m, Move::Discard { .. })));
    }

    #[test]
    fn hints_update_positive_and_negative_knowledge() {
        let mut state = two_player([&["R2", "B2", "G3", "W4", "Y5"], &["R1", "R3", "B4", "R5", "B1"]]);
        state
            .apply_move(Move::RevealColor {
                target: 1,
                color: Color::Red,
            })
            .unwrap();
        let hand = state.hand(1);
        assert_eq!(hand.knowledge(0).unwrap().color(), Some(Color::Red));
        assert!(!hand.knowledge(2).unwrap().color_plausible(Color::Red));
        assert_eq!(state.information_tokens(), 7);
        assert_eq!(state.cur_player(), Actor::Player(1));
    }

    #[test]
    fn hint_must_touch_a_card() {
        let state = two_player([&["R2", "B2", "G3", "W4", "Y5"], &["R1", "R3", "B4", "R5", "B1"]]);
        assert_eq!(
            state.check(&Move::RevealColor {
                target: 1,
                color: Color::Green
            }),
            Err(MoveError::HintMatchesNothing)
        );
        assert_eq!(
            state.check(&Move::RevealRank {
                target: 0,
                rank: Rank::Two
            }),
            Err(MoveError::InvalidTarget(0))
        );
    }

    #[test]
    fn return_and_deal_specific_swap_card_only() {
        let mut state = two_player([&["R2", "B2", "G3", "W4", "Y5"], &["R1", "R3", "B4", "R5", "B1"]]);
        let tokens = state.information_tokens();
        state.apply_move(Move::ReturnCard { seat: 1, slot: 0 }).unwrap();
        assert_eq!(state.hand(1).card(0), None);
        assert_eq!(state.apply_move(Move::Play { slot: 0 }), Err(MoveError::IncompleteHands));
        state
            .apply_move(Move::DealSpecific {
                seat: 1,
                slot: 0,
                card: c("G1"),
            })
            .unwrap();
        assert_eq!(state.hand(1).card(0), Some(c("G1")));
        assert_eq!(state.information_tokens(), tokens);
        assert_eq!(state.cur_player(), Actor::Player(0));
        assert_eq!(state.deck().count(c("R1")), 3);
    }

    #[test]
    fn deal_specific_rejects_exhausted_card() {
        let mut state = two_player([&["R5", "B2", "G3", "W4", "Y5"], &["R1", "R3", "B4", "G5", "B1"]]);
        state.apply_move(Move::ReturnCard { seat: 1, slot: 3 }).unwrap();
        assert_eq!(
            state.apply_move(Move::DealSpecific {
                seat: 1,
                slot: 3,
                card: c("R5"),
            }),
            Err(MoveError::CardUnavailable(c("R5")))
        );
    }

    #[test]
    fn final_round_ends_game() {
        let config = GameConfig::very_small(2);
        let mut rng = StdRng::seed_from_u64(11);
        let mut state = GameState::new(config, &mut rng).unwrap();
        let mut guard = 0;
        while !state.is_terminal() {
            if state.cur_player() == Actor::Chance {
                state.deal_random_card(&mut rng).unwrap();
                continue;
            }
            let moves = state.legal_moves();
            let discard = moves
                .iter()
                .copied()
                .find(|m| matches!(m, Move::Discard { .. }))
                .or_else(|| moves.iter().copied().find(|m| m.is_hint()))
                .unwrap_or(moves[0]);
            state.apply_move(discard).unwrap();
            guard += 1;
            assert!(guard < 100, "game did not terminate");
        }
        assert_ne!(state.end_of_game(), EndOfGame::NotFinished);
        assert_eq!(state.cur_player(), Actor::Terminal);
        assert!(state.legal_moves().is_empty());
    }

    #[test]
    fn from_position_rejects_oversubscribed_cards() {
        let position = Position {
            hands: vec![vec![c("R5")], vec![c("R5")]],
            fireworks: vec![],
            discard_pile: vec![],
            information_tokens: 8,
            life_tokens: 3,
            cur_player: 0,
        };
        let err = GameState::from_position(GameConfig::full(2), &position).unwrap_err();
        assert_eq!(err, MoveError::CardUnavailable(c("R5")));
    }

    #[test]
    fn score_is_zero_without_lives() {
        let position = Position {
            hands: vec![vec![c("R3")], vec![c("B1")]],
            fireworks: vec![1, 0, 0, 0, 0],
            discard_pile: vec![],
            information_tokens: 8,
            life_tokens: 1,
            cur_player: 0,
        };
        let mut state = GameState::from_position(GameConfig::full(2), &position).unwrap();
        assert_eq!(state.score(), 1);
        state.apply_move(Move::Play { slot: 0 }).unwrap();
        assert_eq!(state.end_of_game(), EndOfGame::OutOfLifeTokens);
        assert_eq!(state.score(), 0);
        assert_eq!(state.fireworks_score(), 1);
    }
}
