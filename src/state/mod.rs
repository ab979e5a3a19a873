//! State module for tracking run progress
//!
//! # Components
//!
//! - `TraversalState`: Pagination state of one search term pair
//! - `RunState`: Counters, dedupe set, proxy cursor and traversal states of one run
//! - `DedupeKey`: Derived listing identity used to drop repeats

mod dedup;
mod run_state;
mod traversal_state;

// Re-export main types
pub use dedup::{DedupTracker, DedupeKey};
pub use run_state::{RunCounters, RunState, SearchTerms};
pub use traversal_state::TraversalState;
