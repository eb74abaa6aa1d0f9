//! Due-set selector
//!
//! Computes the ordered set of cards eligible for review right now,
//! applying suspension, burial, graph eligibility, same-day peer
//! suppression, and prereq-lapse propagation.
//!
//! Peer suppression is the one mutating step: a candidate whose peer was
//! already reviewed today is buried for the rest of the day. Callers must
//! treat a single invocation as a transaction — commit the returned set
//! together with the burial updates, or neither.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::card::{CardCollection, CardId};
use crate::fsrs::FsrsParameters;
use crate::graph::RelationshipGraph;

// ============================================================================
// RESULT TYPES
// ============================================================================

/// One due card, tagged with its deck and due timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueEntry {
    /// Card id
    pub card_id: CardId,
    /// Owning deck
    pub deck: String,
    /// When the card came due
    pub due_at: DateTime<Utc>,
}

/// The ordered due set plus the side effects of computing it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueSet {
    /// Eligible cards, due ascending, ties by ascending card id
    pub entries: Vec<DueEntry>,
    /// Cards buried this pass by peer suppression (today only)
    pub peer_buried: Vec<CardId>,
    /// Cards scheduled for burial tomorrow because a prerequisite lapsed
    /// today; they remain in today's entries
    pub bury_scheduled: Vec<CardId>,
}

// ============================================================================
// SELECTION
// ============================================================================

/// Compute the due set at `now`.
///
/// Filter order: suspended and future-due cards first, then cards buried
/// for today, then cards whose prerequisite chain is not yet satisfied.
/// Surviving candidates whose peer was reviewed earlier today are buried
/// and dropped; candidates whose peer is merely also due are deferred
/// (only the first of the pair is returned, nothing is buried). Finally,
/// a candidate whose prerequisite lapsed today keeps its place in the set
/// but is marked for burial tomorrow, giving the learner a chance to
/// re-strengthen the prerequisite first.
pub fn due_cards(
    cards: &mut CardCollection,
    graph: &RelationshipGraph,
    params: &FsrsParameters,
    now: DateTime<Utc>,
) -> DueSet {
    let today = params.review_date(now);
    let tomorrow = today.succ_opt().unwrap_or(today);
    let rollover = params.rollover();

    // Base filters over an immutable scan: suspension, due date, burial,
    // then graph eligibility
    let base: Vec<(DateTime<Utc>, CardId)> = cards
        .iter()
        .filter(|c| !c.is_suspended() && c.due_at <= now && !c.is_buried(today))
        .map(|c| (c.due_at, c.id))
        .collect();
    let mut candidates: Vec<(DateTime<Utc>, CardId)> = base
        .into_iter()
        .filter(|&(_, id)| graph.is_eligible(id, cards))
        .collect();
    candidates.sort_unstable();

    let reviewed_today: HashSet<CardId> = cards
        .iter()
        .filter(|c| c.reviewed_on(today, rollover))
        .map(|c| c.id)
        .collect();

    let mut due_set = DueSet::default();
    let mut selected: HashSet<CardId> = HashSet::new();

    for (_, id) in candidates {
        // Same-day duplicate suppression: a peer already graded today
        // buries this card for the rest of the day
        if graph.peers(id).iter().any(|p| reviewed_today.contains(p)) {
            if let Some(card) = cards.get_mut(id) {
                card.buried_on = Some(today);
            }
            due_set.peer_buried.push(id);
            debug!(card_id = id, "buried for today: peer already reviewed");
            continue;
        }
        // Two un-reviewed peers both due: show only the first, without
        // burying the other (it stays due for a later session)
        if graph.peers(id).iter().any(|p| selected.contains(p)) {
            debug!(card_id = id, "skipped: peer already selected this pass");
            continue;
        }
        selected.insert(id);
    }

    for &id in &selected {
        // A prerequisite graded Again today pulls the dependent out of
        // tomorrow's rotation; dependents reviewed today never bury their
        // prerequisites (the constraint points one way only)
        let prereq_lapsed_today = graph.prereqs(id).iter().any(|&p| {
            reviewed_today.contains(&p)
                && cards
                    .get(p)
                    .is_some_and(|c| c.most_recent_grade.is_some_and(|g| !g.is_success()))
        });
        if prereq_lapsed_today {
            if let Some(card) = cards.get_mut(id) {
                card.bury_on = Some(tomorrow);
            }
            due_set.bury_scheduled.push(id);
            debug!(card_id = id, "bury scheduled for tomorrow: prerequisite lapsed today");
        }
    }

    let mut entries: Vec<DueEntry> = selected
        .iter()
        .filter_map(|&id| cards.get(id))
        .map(|card| DueEntry {
            card_id: card.id,
            deck: card.deck.clone(),
            due_at: card.due_at,
        })
        .collect();
    entries.sort_by(|a, b| a.due_at.cmp(&b.due_at).then(a.card_id.cmp(&b.card_id)));
    due_set.entries = entries;
    due_set.bury_scheduled.sort_unstable();
    due_set.peer_buried.sort_unstable();
    due_set
}

/// Schedule burial of every dependent of a card that just lapsed, so the
/// dependents are skipped on the next review day. Called by the submit
/// path right after a lapse; direct dependents only, so cyclic graphs
/// cannot loop. Returns the affected ids.
pub fn bury_dependents_after_lapse(
    cards: &mut CardCollection,
    graph: &RelationshipGraph,
    card_id: CardId,
    params: &FsrsParameters,
    now: DateTime<Utc>,
) -> Vec<CardId> {
    let today = params.review_date(now);
    let tomorrow = today.succ_opt().unwrap_or(today);

    let mut buried = Vec::new();
    for &dependent in graph.dependents(card_id) {
        if let Some(card) = cards.get_mut(dependent) {
            if card.is_suspended() {
                continue;
            }
            card.bury_on = Some(tomorrow);
            buried.push(dependent);
        }
    }
    if !buried.is_empty() {
        debug!(
            card_id,
            dependents = buried.len(),
            "scheduled dependents for burial after lapse"
        );
    }
    buried
}

// ============================================================================
// TESTS
// ============================================================================
