//! Per-site extraction policies
//!
//! One traversal driver serves every directory. What differs per site (URL
//! shapes, selectors, whether listings need a detail page) lives behind
//! [`ExtractionPolicy`], selected from [`SiteKind`] when the run starts.

mod manufacturier;
mod yp_canada;
mod yp_us;

pub use manufacturier::ManufacturierQuebec;
pub use yp_canada::YellowPagesCanada;
pub use yp_us::YellowPagesUs;

use crate::extract::ListingFields;
use crate::state::{DedupeKey, SearchTerms};
use crate::{ConfigError, UrlError};
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Directory sites the harvester knows how to crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum SiteKind {
    #[value(name = "yellowpages-canada")]
    YellowPagesCanada,
    #[value(name = "yellowpages-us")]
    YellowPagesUs,
    #[value(name = "manufacturier-quebec")]
    ManufacturierQuebec,
}

impl SiteKind {
    /// Name recorded in every record's `scraper_source` and in the run id
    pub fn scraper_name(&self) -> &'static str {
        match self {
            Self::YellowPagesCanada => "yellowpages_canada",
            Self::YellowPagesUs => "yellowpages_us",
            Self::ManufacturierQuebec => "manf_companies",
        }
    }

    /// Directory under the output base dir
    pub fn output_dir(&self) -> &'static str {
        match self {
            Self::YellowPagesCanada => "YP_Canada",
            Self::YellowPagesUs => "YP_US",
            Self::ManufacturierQuebec => "Manufacturier_Quebec",
        }
    }

    /// Country for records that do not state one
    pub fn default_country(&self) -> &'static str {
        match self {
            Self::YellowPagesCanada | Self::ManufacturierQuebec => "CA",
            Self::YellowPagesUs => "US",
        }
    }

    /// Whether traversals are driven by (what, where) term pairs
    pub fn uses_search_terms(&self) -> bool {
        !matches!(self, Self::ManufacturierQuebec)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::YellowPagesCanada => "yellowpages-canada",
            Self::YellowPagesUs => "yellowpages-us",
            Self::ManufacturierQuebec => "manufacturier-quebec",
        }
    }
}

impl fmt::Display for SiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One listing found on a results page
#[derive(Debug, Clone, PartialEq)]
pub enum ListingHit {
    /// All fields were on the results page
    Complete(ListingFields),

    /// Fields live on the listing's own page; `key` dedupes before fetching it
    Detail {
        key: DedupeKey,
        url: Url,
        listing_id: Option<String>,
    },
}

/// What a results page yielded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    pub listings: Vec<ListingHit>,
    pub next_page: Option<Url>,
}

/// Site-specific half of the crawl
///
/// Implementations are pure: they turn URLs and markup into values and never
/// touch run state.
pub trait ExtractionPolicy: Send + Sync {
    fn kind(&self) -> SiteKind;

    /// Root all relative links are resolved against
    fn base_url(&self) -> &Url;

    /// Fixed browser-like headers sent with every request
    fn headers(&self) -> &'static [(&'static str, &'static str)];

    /// URL of results page `page` (1-based) for a term pair
    fn build_search_url(&self, terms: &SearchTerms, page: u32) -> Result<Url, UrlError>;

    /// Extracts listings and the next-page link from a results page
    fn parse_search_page(&self, page_url: &Url, body: &str) -> SearchPage;

    /// Extracts the fields of one listing from its own page
    ///
    /// Only called for [`ListingHit::Detail`] hits. Policies whose listings
    /// are complete on the results page keep the default.
    fn parse_detail_page(
        &self,
        page_url: &Url,
        _body: &str,
        listing_id: Option<&str>,
    ) -> ListingFields {
        ListingFields {
            listing_id: listing_id.map(str::to_string),
            source_url: page_url.to_string(),
            ..ListingFields::default()
        }
    }
}

/// Builds the policy for `kind`, optionally pointed at a different base URL
pub fn policy_for(
    kind: SiteKind,
    base_override: Option<&str>,
) -> Result<Arc<dyn ExtractionPolicy>, ConfigError> {
    let base = match base_override {
        Some(base) => Some(
            Url::parse(base)
                .map_err(|e| ConfigError::InvalidUrl(format!("Invalid site base-url: {}", e)))?,
        ),
        None => None,
    };

    let policy: Arc<dyn ExtractionPolicy> = match kind {
        SiteKind::YellowPagesCanada => Arc::new(YellowPagesCanada::new(base)),
        SiteKind::YellowPagesUs => Arc::new(YellowPagesUs::new(base)),
        SiteKind::ManufacturierQuebec => Arc::new(ManufacturierQuebec::new(base)),
    };
    Ok(policy)
}

/// Parses one of the built-in base URLs
pub(crate) fn default_base(url: &'static str) -> Url {
    Url::parse(url).unwrap_or_else(|e| panic!("invalid built-in base url {}: {}", url, e))
}
