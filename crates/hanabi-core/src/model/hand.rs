use crate::model::card::Card;
use crate::model::knowledge::CardKnowledge;
use serde::{Deserialize, Serialize};
use std::vec::Vec;

/// One position in a hand: the physical card (absent while returned to the deck)
/// and what the owner has been told about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub card: Option<Card>,
    pub knowledge: CardKnowledge,
}

/// Cards ordered oldest to newest. New cards are appended at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hand {
    slots: Vec<Slot>,
}

impl Hand {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn push(&mut self, card: Card, knowledge: CardKnowledge) {
        self.slots.push(Slot {
            card: Some(card),
            knowledge,
        });
    }

    /// Removes a slot entirely, shifting newer cards down.
    pub fn remove(&mut self, index: usize) -> Option<Slot> {
        (index < self.slots.len()).then(|| self.slots.remove(index))
    }

    /// Takes the physical card out of a slot, keeping its knowledge in place.
    pub fn take_card(&mut self, index: usize) -> Option<Card> {
        self.slots.get_mut(index).and_then(|slot| slot.card.take())
    }

    /// Puts a card into an empty slot without touching its knowledge.
    pub fn fill(&mut self, index: usize, card: Card) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) if slot.card.is_none() => {
                slot.card = Some(card);
                true
            }
            _ => false,
        }
    }

    pub fn reset_knowledge(&mut self, index: usize, knowledge: CardKnowledge) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.knowledge = knowledge;
        }
    }

    pub fn card(&self, index: usize) -> Option<Card> {
        self.slots.get(index).and_then(|slot| slot.card)
    }

    pub fn knowledge(&self, index: usize) -> Option<&CardKnowledge> {
        self.slots.get(index).map(|slot| &slot.knowledge)
    }

    pub fn knowledge_mut(&mut self, index: usize) -> Option<&mut CardKnowledge> {
        self.slots.get_mut(index).map(|slot| &mut slot.knowledge)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Physical cards currently held, skipping returned slots.
    pub fn cards(&self) -> impl Iterator<Item = Card> + '_ {
        self.slots.iter().filter_map(|slot| slot.card)
    }

    /// True when every slot holds a card.
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(|slot| slot.card.is_some())
    }
}
