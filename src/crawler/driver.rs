//! Pagination and traversal driver
//!
//! The driver is purely reactive. It turns "response arrived" and "failure
//! arrived" events into new request descriptors and finished records, and
//! never performs I/O itself. Between a request and its outcome it keeps no
//! per-request state; everything it needs comes back in the
//! [`RequestContext`].

use crate::crawler::fetcher::{FetchFailure, FetchResponse};
use crate::crawler::request::{RequestBuilder, RequestContext, RequestDescriptor, RequestKind};
use crate::extract::{Extractor, ListingRecord};
use crate::sites::{ExtractionPolicy, ListingHit};
use crate::state::{RunState, SearchTerms, TraversalState};
use std::sync::Arc;
use url::Url;

/// What one event produced
#[derive(Debug, Default)]
pub struct DriverOutput {
    /// Requests to hand to the scheduler
    pub requests: Vec<RequestDescriptor>,

    /// Records ready for the output sink
    pub records: Vec<ListingRecord>,
}

impl DriverOutput {
    fn merge(&mut self, other: DriverOutput) {
        self.requests.extend(other.requests);
        self.records.extend(other.records);
    }
}

/// One driver serves every site; the policy supplies the site-specific parts
pub struct TraversalDriver {
    policy: Arc<dyn ExtractionPolicy>,
    extractor: Extractor,
    builder: RequestBuilder,
    state: RunState,
    max_attempts: u32,
}

impl TraversalDriver {
    pub fn new(
        policy: Arc<dyn ExtractionPolicy>,
        extractor: Extractor,
        state: RunState,
        max_attempts: u32,
    ) -> Self {
        let builder = RequestBuilder::new(policy.headers());
        Self {
            policy,
            extractor,
            builder,
            state,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Term pairs to traverse for this site
    ///
    /// Term-driven sites get the cartesian product of both lists. Other
    /// sites get a single traversal with empty terms.
    pub fn traversal_terms(&self, whats: &[String], wheres: &[String]) -> Vec<SearchTerms> {
        if self.policy.kind().uses_search_terms() {
            SearchTerms::product(whats, wheres)
        } else {
            vec![SearchTerms::empty()]
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Gives up the run state, for the summary
    pub fn into_state(self) -> RunState {
        self.state
    }

    /// Starts one traversal per term pair by requesting its first results page
    pub fn start(&mut self, terms: &[SearchTerms]) -> DriverOutput {
        let mut output = DriverOutput::default();

        for terms in terms {
            if self.state.traversal_state(terms).is_some() {
                tracing::debug!("Skipping repeated term pair {}", terms);
                continue;
            }
            self.state.begin_traversal(terms.clone());

            match self.policy.build_search_url(terms, 1) {
                Ok(url) => {
                    self.advance_traversal(terms, TraversalState::AwaitingResponse);
                    let descriptor =
                        self.builder
                            .build(url, RequestContext::search(terms.clone(), 1), &mut self.state);
                    output.requests.push(descriptor);
                }
                Err(e) => {
                    tracing::error!("Cannot build first results URL for {}: {}", terms, e);
                    self.state.record_error();
                    self.advance_traversal(terms, TraversalState::Abandoned);
                }
            }
        }

        tracing::info!(
            "Started {} traversal(s) on {}",
            output.requests.len(),
            self.policy.kind()
        );
        output
    }

    /// Handles a response to the request that was built for `url` and `context`
    ///
    /// Any status outside 2xx goes down the failure path.
    pub fn on_response(
        &mut self,
        url: Url,
        context: RequestContext,
        response: FetchResponse,
    ) -> DriverOutput {
        self.state.record_response();

        if !response.is_success() {
            return self.on_failure(url, context, FetchFailure::Status(response.status));
        }

        match context.kind.clone() {
            RequestKind::SearchPage => self.on_search_page(context, response),
            RequestKind::DetailPage { listing_id } => {
                self.on_detail_page(context, listing_id, response)
            }
        }
    }

    /// Handles a failed attempt at `url`
    ///
    /// With proxies configured the rotator advances once and the same
    /// logical request is reissued, until `max_attempts` is reached. Without
    /// proxies, or past the cap, the request is counted in `errors` and
    /// dropped. Only a results-page request abandons its traversal.
    pub fn on_failure(
        &mut self,
        url: Url,
        context: RequestContext,
        failure: FetchFailure,
    ) -> DriverOutput {
        let mut output = DriverOutput::default();
        let has_proxies = !self.state.rotator.is_empty();

        if has_proxies {
            let index = self.state.rotator.advance();
            tracing::warn!(
                "{} for {} (attempt {}), rotated to proxy #{}",
                failure,
                url,
                context.attempt,
                index
            );
        }

        if has_proxies && context.attempt < self.max_attempts {
            if context.is_search_page() {
                self.advance_traversal(&context.terms, TraversalState::Retrying);
                self.advance_traversal(&context.terms, TraversalState::AwaitingResponse);
            }
            let descriptor = self.builder.build(url, context.retry(), &mut self.state);
            output.requests.push(descriptor);
            return output;
        }

        self.state.record_error();
        tracing::error!(
            "Giving up on {} after {} attempt(s): {}",
            url,
            context.attempt,
            failure
        );

        if context.is_search_page() {
            self.advance_traversal(&context.terms, TraversalState::Abandoned);
        }

        output
    }

    fn on_search_page(&mut self, context: RequestContext, response: FetchResponse) -> DriverOutput {
        let terms = context.terms;
        self.advance_traversal(&terms, TraversalState::Extracting);

        let page = self
            .policy
            .parse_search_page(&response.final_url, &response.body);

        let mut output = DriverOutput::default();
        for hit in page.listings {
            output.merge(self.on_listing(hit, &terms, context.page));
        }

        match page.next_page {
            Some(next) => {
                self.advance_traversal(&terms, TraversalState::AwaitingResponse);
                let next_context = RequestContext::search(terms, context.page + 1);
                let descriptor = self.builder.build(next, next_context, &mut self.state);
                output.requests.push(descriptor);
            }
            None => {
                tracing::info!("Traversal {} done after page {}", terms, context.page);
                self.advance_traversal(&terms, TraversalState::Done);
            }
        }

        output
    }

    fn on_listing(&mut self, hit: ListingHit, terms: &SearchTerms, page: u32) -> DriverOutput {
        let mut output = DriverOutput::default();

        match hit {
            ListingHit::Complete(fields) => {
                if let Some(record) = self.extractor.extract(fields, terms, &mut self.state) {
                    output.records.push(record);
                }
            }
            ListingHit::Detail {
                key,
                url,
                listing_id,
            } => {
                if self.extractor.admit(key, &mut self.state) {
                    let context = RequestContext::detail(terms.clone(), page, listing_id);
                    output
                        .requests
                        .push(self.builder.build(url, context, &mut self.state));
                }
            }
        }

        output
    }

    fn on_detail_page(
        &mut self,
        context: RequestContext,
        listing_id: Option<String>,
        response: FetchResponse,
    ) -> DriverOutput {
        let fields = self.policy.parse_detail_page(
            &response.final_url,
            &response.body,
            listing_id.as_deref(),
        );

        let mut output = DriverOutput::default();
        if let Some(record) = self.extractor.finish(fields, &context.terms, &mut self.state) {
            output.records.push(record);
        }
        output
    }

    fn advance_traversal(&mut self, terms: &SearchTerms, to: TraversalState) {
        if let Err(e) = self.state.transition(terms, to) {
            tracing::error!("Traversal {}: {}", terms, e);
        }
    }
}
