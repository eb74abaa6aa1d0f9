//! Relationship graph - peer and prerequisite edges between cards
//!
//! In-memory adjacency keyed by card id. Peer edges are symmetric
//! (same-topic alternatives that should not be shown twice in a day);
//! prereq/dependent edges are directed, stored as two maps kept mutually
//! inverse. The graph only reads card state; edges are authored by
//! collaborators.
//!
//! Authored graphs can contain cycles. Eligibility traversal carries a
//! visited set and treats a cycle as mutually eligible — the graph fails
//! open rather than ever blocking review.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::card::{CardCollection, CardId};

static EMPTY_SET: BTreeSet<CardId> = BTreeSet::new();

// ============================================================================
// EDGES
// ============================================================================

/// Type of relationship between two cards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    /// Symmetric: same-topic alternatives, suppressed on the same day
    Peer,
    /// Directed ordering constraint: `source` must be learned before `target`
    Prereq,
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelationKind::Peer => write!(f, "peer"),
            RelationKind::Prereq => write!(f, "prereq"),
        }
    }
}

/// A single relationship edge, as persisted by the collaborator's edge
/// table. For `Prereq`, `source` is the prerequisite and `target` the
/// dependent. Peer edges are emitted once with `source < target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationEdge {
    /// Source card id
    pub source: CardId,
    /// Target card id
    pub target: CardId,
    /// Edge type
    pub kind: RelationKind,
}

// ============================================================================
// GRAPH
// ============================================================================

/// Adjacency over peer and prereq/dependent edges
#[derive(Debug, Clone, Default)]
pub struct RelationshipGraph {
    peers: HashMap<CardId, BTreeSet<CardId>>,
    /// card id -> its prerequisites
    prereqs: HashMap<CardId, BTreeSet<CardId>>,
    /// card id -> cards that depend on it (inverse of `prereqs`)
    dependents: HashMap<CardId, BTreeSet<CardId>>,
}

impl RelationshipGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from persisted edges
    pub fn from_edges(edges: impl IntoIterator<Item = RelationEdge>) -> Self {
        let mut graph = Self::new();
        for edge in edges {
            match edge.kind {
                RelationKind::Peer => graph.add_peer(edge.source, edge.target),
                RelationKind::Prereq => graph.add_prereq(edge.target, edge.source),
            }
        }
        graph
    }

    /// Export the graph as a sorted edge list (peer edges once, `a < b`)
    pub fn edges(&self) -> Vec<RelationEdge> {
        let mut edges = Vec::new();
        for (&a, set) in &self.peers {
            for &b in set {
                if a < b {
                    edges.push(RelationEdge {
                        source: a,
                        target: b,
                        kind: RelationKind::Peer,
                    });
                }
            }
        }
        for (&dependent, set) in &self.prereqs {
            for &prereq in set {
                edges.push(RelationEdge {
                    source: prereq,
                    target: dependent,
                    kind: RelationKind::Prereq,
                });
            }
        }
        edges.sort_by_key(|e| (e.source, e.target, e.kind as u8));
        edges
    }

    /// Add a symmetric peer edge. Self-edges are ignored.
    pub fn add_peer(&mut self, a: CardId, b: CardId) {
        if a == b {
            return;
        }
        self.peers.entry(a).or_default().insert(b);
        self.peers.entry(b).or_default().insert(a);
    }

    /// Remove a peer edge
    pub fn remove_peer(&mut self, a: CardId, b: CardId) {
        if let Some(set) = self.peers.get_mut(&a) {
            set.remove(&b);
        }
        if let Some(set) = self.peers.get_mut(&b) {
            set.remove(&a);
        }
    }

    /// Record that `dependent` requires `prereq`. Self-edges are ignored;
    /// cycles are allowed (eligibility tolerates them).
    pub fn add_prereq(&mut self, dependent: CardId, prereq: CardId) {
        if dependent == prereq {
            return;
        }
        self.prereqs.entry(dependent).or_default().insert(prereq);
        self.dependents.entry(prereq).or_default().insert(dependent);
    }

    /// Remove a prereq edge
    pub fn remove_prereq(&mut self, dependent: CardId, prereq: CardId) {
        if let Some(set) = self.prereqs.get_mut(&dependent) {
            set.remove(&prereq);
        }
        if let Some(set) = self.dependents.get_mut(&prereq) {
            set.remove(&dependent);
        }
    }

    /// Peers of a card
    pub fn peers(&self, id: CardId) -> &BTreeSet<CardId> {
        self.peers.get(&id).unwrap_or(&EMPTY_SET)
    }

    /// Prerequisites of a card
    pub fn prereqs(&self, id: CardId) -> &BTreeSet<CardId> {
        self.prereqs.get(&id).unwrap_or(&EMPTY_SET)
    }

    /// Cards depending on this card
    pub fn dependents(&self, id: CardId) -> &BTreeSet<CardId> {
        self.dependents.get(&id).unwrap_or(&EMPTY_SET)
    }

    /// Whether a card's prerequisite chain permits showing it: every
    /// prerequisite must have graduated past initial learning.
    ///
    /// Traversal is cycle-safe: revisiting a card treats it as satisfied
    /// (mutually eligible), and dangling edges fail open.
    pub fn is_eligible(&self, id: CardId, cards: &CardCollection) -> bool {
        let mut visited = HashSet::new();
        self.prereqs_satisfied(id, cards, &mut visited)
    }

    fn prereqs_satisfied(
        &self,
        id: CardId,
        cards: &CardCollection,
        visited: &mut HashSet<CardId>,
    ) -> bool {
        if !visited.insert(id) {
            // Cycle (or shared prerequisite already checked): fail open
            return true;
        }
        for &prereq in self.prereqs(id) {
            let Some(card) = cards.get(prereq) else {
                // Dangling edge: never block review over missing records
                continue;
            };
            if !card.graduated() {
                return false;
            }
            if !self.prereqs_satisfied(prereq, cards, visited) {
                return false;
            }
        }
        true
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Card, CardPhase, Grade};
    use chrono::Utc;

    fn graduated_card(id: CardId) -> Card {
        let mut card = Card::new(id, "deck");
        card.past_reviews.push(Utc::now());
        card.past_grades.push(Grade::Good);
        card.last_reviewed = Some(Utc::now());
        card.stability = 3.0;
        card.phase = CardPhase::Review;
        card
    }

    fn learning_card(id: CardId) -> Card {
        let mut card = graduated_card(id);
        card.phase = CardPhase::Learning;
        card
    }

    #[test]
    fn test_peer_edges_are_symmetric() {
        let mut graph = RelationshipGraph::new();
        graph.add_peer(1, 2);
        assert!(graph.peers(1).contains(&2));
        assert!(graph.peers(2).contains(&1));

        graph.remove_peer(2, 1);
        assert!(graph.peers(1).is_empty());
        assert!(graph.peers(2).is_empty());
    }

    #[test]
    fn test_prereq_and_dependents_stay_inverse() {
        let mut graph = RelationshipGraph::new();
        graph.add_prereq(10, 5); // 10 depends on 5
        assert!(graph.prereqs(10).contains(&5));
        assert!(graph.dependents(5).contains(&10));
        assert!(graph.prereqs(5).is_empty());

        graph.remove_prereq(10, 5);
        assert!(graph.prereqs(10).is_empty());
        assert!(graph.dependents(5).is_empty());
    }

    #[test]
    fn test_edge_list_roundtrip() {
        let mut graph = RelationshipGraph::new();
        graph.add_peer(3, 1);
        graph.add_prereq(4, 2);

        let edges = graph.edges();
        assert_eq!(edges.len(), 2);
        // Peer edge normalized to source < target
        assert_eq!(edges[0], RelationEdge { source: 1, target: 3, kind: RelationKind::Peer });
        assert_eq!(edges[1], RelationEdge { source: 2, target: 4, kind: RelationKind::Prereq });

        let rebuilt = RelationshipGraph::from_edges(edges);
        assert!(rebuilt.peers(1).contains(&3));
        assert!(rebuilt.prereqs(4).contains(&2));
    }

    #[test]
    fn test_unrelated_card_is_eligible() {
        let graph = RelationshipGraph::new();
        let cards = CardCollection::from_cards([Card::new(1, "deck")]);
        assert!(graph.is_eligible(1, &cards));
    }

    #[test]
    fn test_dependent_blocked_by_unreviewed_prereq() {
        let mut graph = RelationshipGraph::new();
        graph.add_prereq(2, 1);
        let cards = CardCollection::from_cards([Card::new(1, "deck"), Card::new(2, "deck")]);
        assert!(!graph.is_eligible(2, &cards));
        assert!(graph.is_eligible(1, &cards));
    }

    #[test]
    fn test_dependent_blocked_by_learning_prereq() {
        let mut graph = RelationshipGraph::new();
        graph.add_prereq(2, 1);
        let cards = CardCollection::from_cards([learning_card(1), Card::new(2, "deck")]);
        assert!(!graph.is_eligible(2, &cards));
    }

    #[test]
    fn test_dependent_eligible_once_prereq_graduates() {
        let mut graph = RelationshipGraph::new();
        graph.add_prereq(2, 1);
        let cards = CardCollection::from_cards([graduated_card(1), Card::new(2, "deck")]);
        assert!(graph.is_eligible(2, &cards));
    }

    #[test]
    fn test_transitive_prereq_chain_blocks() {
        // 3 depends on 2 depends on 1; 1 never reviewed
        let mut graph = RelationshipGraph::new();
        graph.add_prereq(3, 2);
        graph.add_prereq(2, 1);
        let cards = CardCollection::from_cards([
            Card::new(1, "deck"),
            graduated_card(2),
            Card::new(3, "deck"),
        ]);
        assert!(!graph.is_eligible(3, &cards));
    }

    #[test]
    fn test_cycle_fails_open_without_looping() {
        let mut graph = RelationshipGraph::new();
        graph.add_prereq(1, 2);
        graph.add_prereq(2, 1);
        let cards = CardCollection::from_cards([graduated_card(1), graduated_card(2)]);
        // Mutually eligible, and the traversal terminates
        assert!(graph.is_eligible(1, &cards));
        assert!(graph.is_eligible(2, &cards));
    }

    #[test]
    fn test_dangling_edge_fails_open() {
        let mut graph = RelationshipGraph::new();
        graph.add_prereq(1, 999);
        let cards = CardCollection::from_cards([graduated_card(1)]);
        assert!(graph.is_eligible(1, &cards));
    }
}
