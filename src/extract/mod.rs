//! Listing extraction and normalization
//!
//! Site policies turn markup into [`ListingFields`] using the helpers here.
//! The [`Extractor`] then applies the run-level rules: dedupe, the optional
//! category filter, and provenance stamping into a [`ListingRecord`].
//!
//! Every listing ends up counted as exactly one of duplicate, excluded or
//! saved.

pub mod address;
pub mod categories;
pub mod contact;
mod fields;
pub mod markup;
pub mod phones;
mod record;

pub use address::AddressParts;
pub use fields::ListingFields;
pub use record::{ListingRecord, Provenance};

use crate::state::{DedupeKey, RunState, SearchTerms};

/// Applies dedupe, category filtering and provenance to extracted listings
#[derive(Debug, Clone)]
pub struct Extractor {
    provenance: Provenance,
    category_matching: bool,
}

impl Extractor {
    pub fn new(provenance: Provenance, category_matching: bool) -> Self {
        Self {
            provenance,
            category_matching,
        }
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn category_matching(&self) -> bool {
        self.category_matching
    }

    /// Handles a listing whose fields all came from the results page
    ///
    /// # Returns
    ///
    /// * `Some(record)` - New listing that passed the category filter
    /// * `None` - Duplicate (counted in `duplicate_items`) or excluded
    ///   (counted in `excluded_items`)
    pub fn extract(
        &self,
        fields: ListingFields,
        terms: &SearchTerms,
        state: &mut RunState,
    ) -> Option<ListingRecord> {
        let key = fields.dedupe_key();
        if !self.admit(key, state) {
            return None;
        }
        self.finish(fields, terms, state)
    }

    /// Dedupes a listing before its detail page is fetched
    ///
    /// Returns `true` when the key is new and the detail page should be requested.
    pub fn admit(&self, key: DedupeKey, state: &mut RunState) -> bool {
        let label = key.to_string();
        if state.admit(key) {
            true
        } else {
            tracing::debug!("Skipping duplicate listing {}", label);
            false
        }
    }

    /// Applies the category filter to an admitted listing and builds its record
    pub fn finish(
        &self,
        fields: ListingFields,
        terms: &SearchTerms,
        state: &mut RunState,
    ) -> Option<ListingRecord> {
        if self.category_matching && !categories::matches_category(&terms.what, &fields.categories)
        {
            tracing::debug!(
                "Excluding '{}': categories {:?} do not match '{}'",
                fields.company,
                fields.categories,
                terms.what
            );
            state.exclude();
            return None;
        }

        Some(ListingRecord::new(fields, terms, &self.provenance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(id: &str, categories: &[&str]) -> ListingFields {
        ListingFields {
            listing_id: Some(id.to_string()),
            company: format!("Company {}", id),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            ..ListingFields::default()
        }
    }

    fn extractor(category_matching: bool) -> Extractor {
        Extractor::new(
            Provenance {
                scraper_name: "yellowpages_canada".to_string(),
                default_country: "CA".to_string(),
                ..Provenance::default()
            },
            category_matching,
        )
    }

    #[test]
    fn test_duplicate_yields_nothing() {
        let extractor = extractor(false);
        let mut state = RunState::default();
        let terms = SearchTerms::new("bakery", "Toronto");

        assert!(extractor.extract(fields("1", &[]), &terms, &mut state).is_some());
        assert!(extractor.extract(fields("1", &[]), &terms, &mut state).is_none());
        assert!(extractor.extract(fields("2", &[]), &terms, &mut state).is_some());

        assert_eq!(state.counters.unique_items, 2);
        assert_eq!(state.counters.duplicate_items, 1);
        assert_eq!(state.counters.total_encountered(), 3);
    }

    #[test]
    fn test_category_mismatch_excluded() {
        let extractor = extractor(true);
        let mut state = RunState::default();
        let terms = SearchTerms::new("plumber", "Toronto");

        let record = extractor.extract(fields("9", &["Electrician"]), &terms, &mut state);
        assert!(record.is_none());
        assert_eq!(state.counters.excluded_items, 1);
        assert_eq!(state.counters.unique_items, 1);
        assert_eq!(state.counters.saved_items(), 0);

        let record = extractor.extract(fields("10", &["Plumbers & Plumbing"]), &terms, &mut state);
        assert!(record.is_some());
        assert_eq!(state.counters.saved_items(), 1);
    }

    #[test]
    fn test_category_filter_never_increases_unique() {
        let listings = [
            fields("1", &["Electrician"]),
            fields("2", &["Plumbers"]),
            fields("2", &["Plumbers"]),
        ];
        let terms = SearchTerms::new("plumber", "Toronto");

        let mut unfiltered = RunState::default();
        let mut filtered = RunState::default();
        for listing in &listings {
            extractor(false).extract(listing.clone(), &terms, &mut unfiltered);
            extractor(true).extract(listing.clone(), &terms, &mut filtered);
        }

        assert_eq!(filtered.counters.unique_items, unfiltered.counters.unique_items);
        assert_eq!(filtered.counters.duplicate_items, unfiltered.counters.duplicate_items);
        assert_eq!(filtered.counters.excluded_items, 1);
        assert_eq!(
            filtered.counters.saved_items() + filtered.counters.excluded_items,
            unfiltered.counters.saved_items()
        );
    }

    #[test]
    fn test_duplicate_not_counted_as_excluded() {
        let extractor = extractor(true);
        let mut state = RunState::default();
        let terms = SearchTerms::new("plumber", "Toronto");

        extractor.extract(fields("3", &["Electrician"]), &terms, &mut state);
        extractor.extract(fields("3", &["Electrician"]), &terms, &mut state);

        assert_eq!(state.counters.excluded_items, 1);
        assert_eq!(state.counters.duplicate_items, 1);
    }
}
