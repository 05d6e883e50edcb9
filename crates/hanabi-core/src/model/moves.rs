use crate::model::card::Card;
use crate::model::color::Color;
use crate::model::rank::Rank;
use core::fmt;
use serde::{Deserialize, Serialize};

/// Every way a [`crate::model::state::GameState`] can change.
///
/// `ReturnCard` and `DealSpecific` are engine extensions reserved for determinization:
/// they swap physical cards without touching tokens, fireworks or turn order, and are
/// never reported as legal moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Move {
    Play { slot: usize },
    Discard { slot: usize },
    RevealColor { target: usize, color: Color },
    RevealRank { target: usize, rank: Rank },
    ReturnCard { seat: usize, slot: usize },
    DealSpecific { seat: usize, slot: usize, card: Card },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    Play,
    Discard,
    RevealColor,
    RevealRank,
    ReturnCard,
    DealSpecific,
}

impl Move {
    pub const fn kind(&self) -> MoveKind {
        match self {
            Move::Play { .. } => MoveKind::Play,
            Move::Discard { .. } => MoveKind::Discard,
            Move::RevealColor { .. } => MoveKind::RevealColor,
            Move::RevealRank { .. } => MoveKind::RevealRank,
            Move::ReturnCard { .. } => MoveKind::ReturnCard,
            Move::DealSpecific { .. } => MoveKind::DealSpecific,
        }
    }

    /// Hand slot removed by a play or discard.
    pub const fn card_slot(&self) -> Option<usize> {
        match self {
            Move::Play { slot } | Move::Discard { slot } => Some(*slot),
            _ => None,
        }
    }

    pub const fn is_hint(&self) -> bool {
        matches!(self, Move::RevealColor { .. } | Move::RevealRank { .. })
    }

    pub const fn is_extension(&self) -> bool {
        matches!(self, Move::ReturnCard { .. } | Move::DealSpecific { .. })
    }

    pub const fn hint_target(&self) -> Option<usize> {
        match self {
            Move::RevealColor { target, .. } | Move::RevealRank { target, .. } => Some(*target),
            _ => None,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Play { slot } => write!(f, "(Play {slot})"),
            Move::Discard { slot } => write!(f, "(Discard {slot})"),
            Move::RevealColor { target, color } => write!(f, "(Reveal player {target} color {color})"),
            Move::RevealRank { target, rank } => write!(f, "(Reveal player {target} rank {rank})"),
            Move::ReturnCard { seat, slot } => write!(f, "(Return player {seat} slot {slot})"),
            Move::DealSpecific { seat, slot, card } => {
                write!(f, "(Deal {card} to player {seat} slot {slot})")
            }
        }
    }
}
