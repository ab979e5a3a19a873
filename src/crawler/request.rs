//! Request descriptors handed to the fetch collaborator
//!
//! A descriptor carries everything needed to perform one fetch attempt plus a
//! strongly typed [`RequestContext`] that comes back unchanged with the
//! response, so the driver can resume the right traversal.

use crate::proxy::ProxyCredential;
use crate::state::{RunState, SearchTerms};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, PROXY_AUTHORIZATION};
use url::Url;

/// What a request is for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    /// A results page of a term pair's traversal
    SearchPage,

    /// A listing's own page, fetched after the listing was admitted
    DetailPage { listing_id: Option<String> },
}

/// Context threaded through a fetch and returned with its outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub terms: SearchTerms,

    /// 1-based results page this request belongs to
    pub page: u32,

    /// Rotator index the descriptor was built with, `None` without proxies
    pub proxy_index: Option<usize>,

    /// 1 for the first attempt, incremented on every reissue
    pub attempt: u32,

    pub kind: RequestKind,
}

impl RequestContext {
    pub fn search(terms: SearchTerms, page: u32) -> Self {
        Self {
            terms,
            page,
            proxy_index: None,
            attempt: 1,
            kind: RequestKind::SearchPage,
        }
    }

    pub fn detail(terms: SearchTerms, page: u32, listing_id: Option<String>) -> Self {
        Self {
            terms,
            page,
            proxy_index: None,
            attempt: 1,
            kind: RequestKind::DetailPage { listing_id },
        }
    }

    pub fn is_search_page(&self) -> bool {
        matches!(self.kind, RequestKind::SearchPage)
    }

    /// Same logical request, one attempt later
    pub fn retry(&self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self.clone()
        }
    }
}

/// One fetch attempt
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub url: Url,
    pub headers: HeaderMap,
    pub proxy: Option<ProxyCredential>,
    pub context: RequestContext,
}

impl RequestDescriptor {
    /// Value of the `Proxy-Authorization` header, if one was injected
    pub fn proxy_authorization(&self) -> Option<&HeaderValue> {
        self.headers.get(PROXY_AUTHORIZATION)
    }
}

/// Builds descriptors with a site's fixed header set and the active proxy
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    headers: HeaderMap,
}

impl RequestBuilder {
    /// Creates a builder from a policy's static header list
    ///
    /// Entries that are not valid HTTP header names or values are skipped
    /// with a warning.
    pub fn new(headers: &[(&str, &str)]) -> Self {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    map.insert(name, value);
                }
                _ => tracing::warn!("Skipping invalid request header {}: {}", name, value),
            }
        }
        Self { headers: map }
    }

    /// Produces the descriptor for one attempt at `url`
    ///
    /// Counts one issued request in `state`. The proxy is whatever the
    /// rotator currently points at; `Proxy-Authorization` is set only when
    /// that proxy has both a user and a password.
    pub fn build(&self, url: Url, mut context: RequestContext, state: &mut RunState) -> RequestDescriptor {
        let mut headers = self.headers.clone();

        let proxy = state.rotator.current().cloned();
        context.proxy_index = state.rotator.current_index();

        if let Some(auth) = proxy.as_ref().and_then(ProxyCredential::authorization) {
            match HeaderValue::from_str(&auth) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(PROXY_AUTHORIZATION, value);
                }
                Err(e) => tracing::warn!("Proxy credentials are not a valid header value: {}", e),
            }
        }

        state.record_request();
        tracing::trace!(
            "Request #{} {} (attempt {}, proxy {:?})",
            state.counters.total_requests_issued,
            url,
            context.attempt,
            context.proxy_index
        );

        RequestDescriptor {
            url,
            headers,
            proxy,
            context,
        }
    }
}
