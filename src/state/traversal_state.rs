/// Traversal state definitions for tracking pagination progress
///
/// One state machine runs per search term pair. It follows the results-page
/// chain only; detail-page fetches fan out from `Extracting` and are tracked
/// by the driver's in-flight count instead.
use std::fmt;

/// Represents the current state of one term pair's traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraversalState {
    // ===== Active States =====
    /// Term pair loaded, first results page not yet requested
    Start,

    /// A results-page request is out and its response has not arrived
    AwaitingResponse,

    /// A results page arrived and its listings are being extracted
    Extracting,

    /// The last attempt failed and the same request is being reissued
    Retrying,

    // ===== Terminal States =====
    /// No further results page exists
    Done,

    /// A results-page request failed permanently, or the first one could not be built
    Abandoned,
}

impl TraversalState {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Abandoned)
    }

    /// Returns true if the traversal still expects a response
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Checks whether moving from `self` to `next` is a legal step
    ///
    /// Legal steps:
    /// - `Start -> AwaitingResponse | Abandoned`
    /// - `AwaitingResponse -> Extracting | Retrying | Abandoned`
    /// - `Extracting -> AwaitingResponse | Done`
    /// - `Retrying -> AwaitingResponse | Abandoned`
    pub fn can_transition_to(&self, next: TraversalState) -> bool {
        use TraversalState::*;
        matches!(
            (self, next),
            (Start, AwaitingResponse)
                | (Start, Abandoned)
                | (AwaitingResponse, Extracting)
                | (AwaitingResponse, Retrying)
                | (AwaitingResponse, Abandoned)
                | (Extracting, AwaitingResponse)
                | (Extracting, Done)
                | (Retrying, AwaitingResponse)
                | (Retrying, Abandoned)
        )
    }

    /// Short lowercase label used in logs and the summary report
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::AwaitingResponse => "awaiting_response",
            Self::Extracting => "extracting",
            Self::Retrying => "retrying",
            Self::Done => "done",
            Self::Abandoned => "abandoned",
        }
    }

    /// Returns all traversal states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Start,
            Self::AwaitingResponse,
            Self::Extracting,
            Self::Retrying,
            Self::Done,
            Self::Abandoned,
        ]
    }
}

impl fmt::Display for TraversalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
