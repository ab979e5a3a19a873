use crate::proxy::ProxyRotator;
use crate::state::dedup::{DedupTracker, DedupeKey};
use crate::state::traversal_state::TraversalState;
use crate::HarvestError;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// One (what, where) search combination
///
/// `location` holds the "where" term. Sites that are not term-driven use
/// [`SearchTerms::empty`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SearchTerms {
    pub what: String,
    pub location: String,
}

impl SearchTerms {
    pub fn new(what: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            what: what.into(),
            location: location.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Cartesian product of both term lists, `what` major
    ///
    /// A pair repeated in the inputs appears once, at its first position.
    pub fn product(whats: &[String], wheres: &[String]) -> Vec<Self> {
        let mut seen = HashSet::new();
        whats
            .iter()
            .flat_map(|what| wheres.iter().map(move |location| Self::new(what, location)))
            .filter(|pair| seen.insert(pair.clone()))
            .collect()
    }
}

impl fmt::Display for SearchTerms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "what='{}' where='{}'", self.what, self.location)
    }
}

/// Run-scoped counters, mutated only while the run is in progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub total_requests_issued: u64,
    pub total_responses_received: u64,
    pub unique_items: u64,
    pub duplicate_items: u64,
    pub excluded_items: u64,
    pub errors: u64,
}

impl RunCounters {
    /// Every listing seen is either unique or a duplicate
    pub fn total_encountered(&self) -> u64 {
        self.unique_items + self.duplicate_items
    }

    /// Unique listings that survived the category filter
    pub fn saved_items(&self) -> u64 {
        self.unique_items.saturating_sub(self.excluded_items)
    }
}

/// All mutable state of one run
///
/// Owned by the traversal driver. Constructed at run start and consumed by
/// the summary at run end.
#[derive(Debug, Default)]
pub struct RunState {
    pub counters: RunCounters,
    pub rotator: ProxyRotator,
    dedup: DedupTracker,
    traversals: HashMap<SearchTerms, TraversalState>,
}

impl RunState {
    pub fn new(rotator: ProxyRotator) -> Self {
        Self {
            rotator,
            ..Self::default()
        }
    }

    /// Admits a listing by its dedupe key
    ///
    /// Returns `true` and bumps `unique_items` for a new key. A repeated key
    /// bumps `duplicate_items` and returns `false`.
    pub fn admit(&mut self, key: DedupeKey) -> bool {
        if self.dedup.insert(key) {
            self.counters.unique_items += 1;
            true
        } else {
            self.counters.duplicate_items += 1;
            false
        }
    }

    /// Counts an admitted listing that the category filter rejected
    pub fn exclude(&mut self) {
        self.counters.excluded_items += 1;
    }

    pub fn record_request(&mut self) {
        self.counters.total_requests_issued += 1;
    }

    pub fn record_response(&mut self) {
        self.counters.total_responses_received += 1;
    }

    pub fn record_error(&mut self) {
        self.counters.errors += 1;
    }

    /// Number of distinct keys admitted
    pub fn seen_keys(&self) -> usize {
        self.dedup.len()
    }

    /// Registers a term pair in the `Start` state
    pub fn begin_traversal(&mut self, terms: SearchTerms) {
        self.traversals.entry(terms).or_insert(TraversalState::Start);
    }

    pub fn traversal_state(&self, terms: &SearchTerms) -> Option<TraversalState> {
        self.traversals.get(terms).copied()
    }

    /// Moves a term pair's traversal to `to`
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The transition was legal and applied
    /// * `Err(HarvestError::InvalidTransition)` - The move is not allowed from
    ///   the current state, or the pair was never registered
    pub fn transition(&mut self, terms: &SearchTerms, to: TraversalState) -> crate::Result<()> {
        let current = self
            .traversals
            .get_mut(terms)
            .ok_or(HarvestError::InvalidTransition {
                from: TraversalState::Start,
                to,
            })?;

        if !current.can_transition_to(to) {
            return Err(HarvestError::InvalidTransition {
                from: *current,
                to,
            });
        }

        tracing::trace!("Traversal {}: {} -> {}", terms, current, to);
        *current = to;
        Ok(())
    }

    /// Number of traversals in each terminal state: `(done, abandoned)`
    pub fn traversal_outcomes(&self) -> (usize, usize) {
        self.traversals
            .values()
            .fold((0, 0), |(done, abandoned), state| match state {
                TraversalState::Done => (done + 1, abandoned),
                TraversalState::Abandoned => (done, abandoned + 1),
                _ => (done, abandoned),
            })
    }

    /// True once every registered traversal is terminal
    pub fn all_traversals_finished(&self) -> bool {
        self.traversals.values().all(TraversalState::is_terminal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admit_counts_unique_and_duplicates() {
        let mut state = RunState::default();

        assert!(state.admit(DedupeKey::ListingId("1".to_string())));
        assert!(!state.admit(DedupeKey::ListingId("1".to_string())));
        assert!(state.admit(DedupeKey::ListingId("2".to_string())));

        assert_eq!(state.counters.unique_items, 2);
        assert_eq!(state.counters.duplicate_items, 1);
        assert_eq!(state.counters.total_encountered(), 3);
        assert_eq!(state.seen_keys(), 2);
    }

    #[test]
    fn test_saved_items_never_negative() {
        let counters = RunCounters {
            unique_items: 1,
            excluded_items: 3,
            ..RunCounters::default()
        };
        assert_eq!(counters.saved_items(), 0);

        let counters = RunCounters {
            unique_items: 5,
            excluded_items: 2,
            ..RunCounters::default()
        };
        assert_eq!(counters.saved_items(), 3);
    }

    #[test]
    fn test_product_of_terms() {
        let whats = vec!["bakery".to_string(), "florist".to_string()];
        let wheres = vec!["Toronto".to_string(), "Ottawa".to_string()];
        let pairs = SearchTerms::product(&whats, &wheres);

        assert_eq!(pairs.len(), 4);
        assert_eq!(pairs[0], SearchTerms::new("bakery", "Toronto"));
        assert_eq!(pairs[3], SearchTerms::new("florist", "Ottawa"));
    }

    #[test]
    fn test_product_drops_repeated_pairs() {
        let whats = vec!["bakery".to_string(), "florist".to_string(), "bakery".to_string()];
        let wheres = vec!["Toronto".to_string(), "Toronto".to_string()];
        let pairs = SearchTerms::product(&whats, &wheres);

        assert_eq!(
            pairs,
            vec![
                SearchTerms::new("bakery", "Toronto"),
                SearchTerms::new("florist", "Toronto"),
            ]
        );
    }

    #[test]
    fn test_traversal_transitions() {
        let mut state = RunState::default();
        let terms = SearchTerms::new("bakery", "Toronto");
        state.begin_traversal(terms.clone());

        state
            .transition(&terms, TraversalState::AwaitingResponse)
            .unwrap();
        state.transition(&terms, TraversalState::Extracting).unwrap();
        assert!(!state.all_traversals_finished());

        state.transition(&terms, TraversalState::Done).unwrap();
        assert!(state.all_traversals_finished());
        assert_eq!(state.traversal_outcomes(), (1, 0));
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let mut state = RunState::default();
        let terms = SearchTerms::new("bakery", "Toronto");
        state.begin_traversal(terms.clone());

        let result = state.transition(&terms, TraversalState::Done);
        assert!(matches!(
            result,
            Err(HarvestError::InvalidTransition {
                from: TraversalState::Start,
                to: TraversalState::Done
            })
        ));
        assert_eq!(state.traversal_state(&terms), Some(TraversalState::Start));
    }

    #[test]
    fn test_unknown_pair_rejected() {
        let mut state = RunState::default();
        let result = state.transition(
            &SearchTerms::new("x", "y"),
            TraversalState::AwaitingResponse,
        );
        assert!(result.is_err());
    }
}
