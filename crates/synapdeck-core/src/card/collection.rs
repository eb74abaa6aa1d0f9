//! Card collection - keyed in-memory record store
//!
//! The engine treats persistence as a collaborator concern; this is the
//! in-memory shape it works against. Lookups are by card id, iteration
//! order is unspecified (selectors sort their own output).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Card, CardId};

/// Keyed store of cards, indexed by id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardCollection {
    cards: HashMap<CardId, Card>,
}

impl CardCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from an iterator of cards, keyed by their ids.
    /// Later duplicates replace earlier ones.
    pub fn from_cards(cards: impl IntoIterator<Item = Card>) -> Self {
        Self {
            cards: cards.into_iter().map(|c| (c.id, c)).collect(),
        }
    }

    /// Insert or replace a card, returning the previous record if any
    pub fn insert(&mut self, card: Card) -> Option<Card> {
        self.cards.insert(card.id, card)
    }

    /// Look up a card by id
    pub fn get(&self, id: CardId) -> Option<&Card> {
        self.cards.get(&id)
    }

    /// Look up a card by id, mutably
    pub fn get_mut(&mut self, id: CardId) -> Option<&mut Card> {
        self.cards.get_mut(&id)
    }

    /// Whether a card with this id exists
    pub fn contains(&self, id: CardId) -> bool {
        self.cards.contains_key(&id)
    }

    /// Number of cards
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether the collection is empty
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Iterate over all cards
    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.values()
    }

    /// Iterate over all cards, mutably
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Card> {
        self.cards.values_mut()
    }

    /// The next unused card id (one past the current maximum)
    pub fn next_id(&self) -> CardId {
        self.cards.keys().max().map_or(1, |max| max + 1)
    }
}

impl FromIterator<Card> for CardCollection {
    fn from_iter<I: IntoIterator<Item = Card>>(iter: I) -> Self {
        Self::from_cards(iter)
    }
}
