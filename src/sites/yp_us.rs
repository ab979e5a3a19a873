use crate::extract::address::parse_us_locality;
use crate::extract::categories::clean_categories;
use crate::extract::contact::email_from_json_ld;
use crate::extract::markup::{all_texts, css, first_attr, first_text, own_text};
use crate::extract::phones::merge_phones;
use crate::extract::{AddressParts, ListingFields};
use crate::sites::{default_base, ExtractionPolicy, ListingHit, SearchPage, SiteKind};
use crate::state::{DedupeKey, SearchTerms};
use crate::url::{canonical_url, resolve_website};
use crate::UrlError;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

const BASE_URL: &str = "https://www.yellowpages.com";

const HEADERS: &[(&str, &str)] = &[
    (
        "User-Agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/139.0.0.0 Safari/537.36 Edg/139.0.0.0",
    ),
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
    ),
    ("Accept-Language", "en-US,en;q=0.9"),
    ("Cache-Control", "max-age=0"),
    ("Upgrade-Insecure-Requests", "1"),
    ("Sec-Fetch-Dest", "document"),
    ("Sec-Fetch-Mode", "navigate"),
    ("Sec-Fetch-Site", "none"),
    ("Sec-Fetch-User", "?1"),
];

static RESULT: Lazy<Selector> = Lazy::new(|| css(r#"div[class="result"]"#));
static BUSINESS_NAME: Lazy<Selector> = Lazy::new(|| css(r#"a[class="business-name"]"#));
static NEXT_PAGE: Lazy<Selector> = Lazy::new(|| css(r#"a[class="next ajax-page"]"#));

static COMPANY: Lazy<Selector> = Lazy::new(|| css("h1"));
static YEARS_IN_BUSINESS: Lazy<Selector> = Lazy::new(|| css(r#"div[class="years-in-business"]"#));
static YEARS_WITH_YP: Lazy<Selector> = Lazy::new(|| css(r#"div[class="years-with-yp"]"#));
static CATEGORIES: Lazy<Selector> = Lazy::new(|| css(r#"dd > div[class="categories"] > a"#));
static PRIMARY_PHONES: Lazy<Selector> =
    Lazy::new(|| css(r#"a[class="phone dockable"] > span[class="full"]"#));
static EXTRA_PHONES: Lazy<Selector> =
    Lazy::new(|| css(r#"dd[class="extra-phones"] span:nth-of-type(2)"#));
static JSON_LD: Lazy<Selector> = Lazy::new(|| css(r#"script[type="application/ld+json"]"#));
static WEBSITE: Lazy<Selector> = Lazy::new(|| css(r#"a[class="website-link dockable"]"#));
static ADDRESS: Lazy<Selector> = Lazy::new(|| css(r#"span[class="address"]"#));
static STREET: Lazy<Selector> = Lazy::new(|| css("span"));

/// yellowpages.com: results pages link to a detail page per listing
#[derive(Debug, Clone)]
pub struct YellowPagesUs {
    base: Url,
}

impl YellowPagesUs {
    pub fn new(base: Option<Url>) -> Self {
        Self {
            base: base.unwrap_or_else(|| default_base(BASE_URL)),
        }
    }
}

impl ExtractionPolicy for YellowPagesUs {
    fn kind(&self) -> SiteKind {
        SiteKind::YellowPagesUs
    }

    fn base_url(&self) -> &Url {
        &self.base
    }

    fn headers(&self) -> &'static [(&'static str, &'static str)] {
        HEADERS
    }

    /// `<base>/search?search_terms=<what>&geo_location_terms=<where>[&page=<n>]`
    fn build_search_url(&self, terms: &SearchTerms, page: u32) -> Result<Url, UrlError> {
        let mut url = self
            .base
            .join("/search")
            .map_err(|e| UrlError::Parse(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("search_terms", &terms.what)
                .append_pair("geo_location_terms", &terms.location);
            if page > 1 {
                query.append_pair("page", &page.to_string());
            }
        }
        Ok(url)
    }

    fn parse_search_page(&self, page_url: &Url, body: &str) -> SearchPage {
        let document = Html::parse_document(body);
        let root = document.root_element();
        let mut listings = Vec::new();

        for result in root.select(&RESULT) {
            let listing_id = result
                .value()
                .attr("id")
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string);
            let name = first_text(result, &BUSINESS_NAME);

            let Some(href) = first_attr(result, &BUSINESS_NAME, "href") else {
                tracing::debug!("Result {:?} on {} has no business link", listing_id, page_url);
                continue;
            };
            let Ok(url) = page_url.join(&href) else {
                tracing::debug!("Unresolvable business link {} on {}", href, page_url);
                continue;
            };

            let canonical = canonical_url(page_url, &href).ok().map(|u| u.to_string());
            let key = DedupeKey::derive(listing_id.as_deref(), canonical.as_deref(), &name, "");

            listings.push(ListingHit::Detail {
                key,
                url,
                listing_id,
            });
        }

        let next_page = first_attr(root, &NEXT_PAGE, "href").and_then(|href| page_url.join(&href).ok());

        tracing::debug!(
            "{} results on {} (next page: {})",
            listings.len(),
            page_url,
            next_page.is_some()
        );

        SearchPage {
            listings,
            next_page,
        }
    }

    fn parse_detail_page(&self, page_url: &Url, body: &str, listing_id: Option<&str>) -> ListingFields {
        let document = Html::parse_document(body);
        let root = document.root_element();

        let years_in_business = first_text(root, &YEARS_IN_BUSINESS);
        let years_with_yp = first_text(root, &YEARS_WITH_YP);
        let note = [years_in_business, years_with_yp]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        let phones = merge_phones(
            all_texts(root, &PRIMARY_PHONES)
                .into_iter()
                .chain(all_texts(root, &EXTRA_PHONES)),
        );

        let scripts: Vec<String> = root
            .select(&JSON_LD)
            .map(|script| script.text().collect::<String>())
            .collect();
        let email = email_from_json_ld(scripts.iter().map(String::as_str)).unwrap_or_default();

        let website = first_attr(root, &WEBSITE, "href")
            .map(|href| resolve_website(&href, page_url))
            .unwrap_or_default();

        let address = match root.select(&ADDRESS).next() {
            Some(element) => {
                let street = first_text(element, &STREET);
                let locality = own_text(element);
                let (city, state, zip) = if locality.is_empty() {
                    Default::default()
                } else {
                    parse_us_locality(&locality)
                };
                AddressParts::new(street, city, state, zip)
            }
            None => AddressParts::default(),
        };

        ListingFields {
            listing_id: listing_id.map(str::to_string),
            company: first_text(root, &COMPANY),
            phones,
            email,
            website,
            address,
            categories: clean_categories(all_texts(root, &CATEGORIES)),
            sponsored: false,
            note,
            source_url: page_url.to_string(),
        }
    }
}
