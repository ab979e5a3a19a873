use crate::extract::categories::{clean_categories, split_heading};
use crate::extract::markup::{all_texts, css, element_text, first_attr, first_text, outermost, text_nodes};
use crate::extract::phones::extract_phones;
use crate::extract::{AddressParts, ListingFields};
use crate::sites::{default_base, ExtractionPolicy, ListingHit, SearchPage, SiteKind};
use crate::state::SearchTerms;
use crate::url::{canonical_url, resolve_website};
use crate::UrlError;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

const BASE_URL: &str = "https://www.yellowpages.ca";

const HEADERS: &[(&str, &str)] = &[
    ("User-Agent", "Mozilla/5.0 (Windows NT 10.0; Win64; x64)"),
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
    ),
    ("Accept-Language", "en-US,en;q=0.9"),
];

static LISTING: Lazy<Selector> = Lazy::new(|| css(r#"div[class*="listing__content"]"#));
static NAME_LINK: Lazy<Selector> = Lazy::new(|| css(r#"a[class*="jsListingName"]"#));
static PHONE_MENU: Lazy<Selector> = Lazy::new(|| css(r#"ul[class*="mlr__submenu"]"#));
static PLACEMENT: Lazy<Selector> = Lazy::new(|| css(r#"span[class="listing__placement"]"#));
static HEADINGS: Lazy<Selector> = Lazy::new(|| css(r#"div[class*="listing__headings"]"#));
static HEADING_LINKS: Lazy<Selector> = Lazy::new(|| css(r#"div[class*="listing__headings"] a"#));
static STREET: Lazy<Selector> = Lazy::new(|| css(r#"span[itemprop="streetAddress"]"#));
static LOCALITY: Lazy<Selector> = Lazy::new(|| css(r#"span[itemprop="addressLocality"]"#));
static REGION: Lazy<Selector> = Lazy::new(|| css(r#"span[itemprop="addressRegion"]"#));
static POSTAL_CODE: Lazy<Selector> = Lazy::new(|| css(r#"span[itemprop="postalCode"]"#));
static WEBSITE: Lazy<Selector> = Lazy::new(|| css(r#"li[class*="mlr__item--website"] > a"#));
static ANCHORS: Lazy<Selector> = Lazy::new(|| css("a[href]"));

/// Numeric id right before `.html` in a listing link
static LISTING_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/(\d+)\.html").expect("valid id pattern"));

/// yellowpages.ca: every field is on the results page
#[derive(Debug, Clone)]
pub struct YellowPagesCanada {
    base: Url,
}

impl YellowPagesCanada {
    pub fn new(base: Option<Url>) -> Self {
        Self {
            base: base.unwrap_or_else(|| default_base(BASE_URL)),
        }
    }

    fn parse_listing(&self, fragment: ElementRef<'_>) -> ListingFields {
        let company = first_text(fragment, &NAME_LINK);
        let link = first_attr(fragment, &NAME_LINK, "href");

        let listing_id = link.as_deref().and_then(listing_id_from_link);
        let source_url = link
            .as_deref()
            .and_then(|href| canonical_url(&self.base, href).ok())
            .map(|url| url.to_string())
            .unwrap_or_default();

        let mut phone_texts: Vec<String> = fragment
            .select(&PHONE_MENU)
            .flat_map(text_nodes)
            .collect();
        if phone_texts.is_empty() {
            phone_texts = text_nodes(fragment);
        }
        let phones = extract_phones(phone_texts.iter().map(String::as_str));

        let mut raw_categories = all_texts(fragment, &HEADING_LINKS);
        if raw_categories.is_empty() {
            raw_categories = split_heading(&first_text(fragment, &HEADINGS));
        }

        let address = AddressParts::new(
            first_text(fragment, &STREET),
            first_text(fragment, &LOCALITY),
            first_text(fragment, &REGION),
            first_text(fragment, &POSTAL_CODE),
        );

        let website = first_attr(fragment, &WEBSITE, "href")
            .map(|href| resolve_website(&href, &self.base))
            .unwrap_or_default();

        ListingFields {
            listing_id,
            company,
            phones,
            email: String::new(),
            website,
            address,
            categories: clean_categories(raw_categories),
            sponsored: fragment.select(&PLACEMENT).next().is_some(),
            note: String::new(),
            source_url,
        }
    }
}

impl ExtractionPolicy for YellowPagesCanada {
    fn kind(&self) -> SiteKind {
        SiteKind::YellowPagesCanada
    }

    fn base_url(&self) -> &Url {
        &self.base
    }

    fn headers(&self) -> &'static [(&'static str, &'static str)] {
        HEADERS
    }

    /// `<base>/search/si/<page>/<what>/<where>`
    fn build_search_url(&self, terms: &SearchTerms, page: u32) -> Result<Url, UrlError> {
        let page = page.to_string();
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| UrlError::Parse(format!("cannot append path to {}", self.base)))?
            .pop_if_empty()
            .extend([
                "search",
                "si",
                page.as_str(),
                terms.what.as_str(),
                terms.location.as_str(),
            ]);
        Ok(url)
    }

    fn parse_search_page(&self, page_url: &Url, body: &str) -> SearchPage {
        let document = Html::parse_document(body);
        let root = document.root_element();

        let listings: Vec<ListingHit> = outermost(root, &LISTING)
            .into_iter()
            .map(|fragment| ListingHit::Complete(self.parse_listing(fragment)))
            .collect();

        // Listing names can contain "Next"; only pagination links count
        let next_page = root
            .select(&ANCHORS)
            .filter(|anchor| !inside_listing(*anchor))
            .find(|anchor| element_text(*anchor).contains("Next"))
            .and_then(|anchor| anchor.value().attr("href"))
            .and_then(|href| page_url.join(href.trim()).ok());

        tracing::debug!(
            "{} listings on {} (next page: {})",
            listings.len(),
            page_url,
            next_page.is_some()
        );

        SearchPage {
            listings,
            next_page,
        }
    }
}

fn inside_listing(element: ElementRef) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| LISTING.matches(&ancestor))
}

fn listing_id_from_link(href: &str) -> Option<String> {
    LISTING_ID.captures(href).map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS_PAGE: &str = r#"
<html><body>
  <div class="listing listing--bottomcta">
    <div class="listing__content">
      <a class="listing__name--link jsListingName" href="/bus/Ontario/Toronto/Acme-Bakery/1234567.html">  Acme Bakery </a>
      <span class="listing__placement">Ad</span>
      <div class="listing__headings"><a href="/cat/1">Bakeries</a><a href="/cat/2">Cafes More...</a><a>More...</a></div>
      <div class="listing__address">
        <span itemprop="streetAddress">12 Queen St W</span>
        <span itemprop="addressLocality">Toronto</span>
        <span itemprop="addressRegion">ON</span>
        <span itemprop="postalCode">M5H 2N2</span>
      </div>
      <ul class="mlr">
        <li class="mlr__item mlr__item--phone"><ul class="mlr__submenu"><li>416-555-0100</li><li>Fax 416-555-0199</li></ul></li>
        <li class="mlr__item mlr__item--website"><a href="/gourl/abc?redirect=https%3A%2F%2Facmebakery.ca">Website</a></li>
      </ul>
    </div>
  </div>
  <div class="listing">
    <div class="listing__content">
      <a class="jsListingName" href="/bus/Ontario/Toronto/Corner-Cafe/7654321.html">Corner Cafe</a>
      <div class="listing__headings">Coffee Shops, Bakeries More...</div>
      <p>Call (647) 555-0111 now</p>
    </div>
  </div>
  <div class="pagination"><a href="/search/si/2/bakery/Toronto">Next &raquo;</a></div>
</body></html>
"#;

    fn policy() -> YellowPagesCanada {
        YellowPagesCanada::new(None)
    }

    fn page_url() -> Url {
        Url::parse("https://www.yellowpages.ca/search/si/1/bakery/Toronto").unwrap()
    }

    fn complete(hit: &ListingHit) -> &ListingFields {
        match hit {
            ListingHit::Complete(fields) => fields,
            other => panic!("expected complete listing, got {:?}", other),
        }
    }

    #[test]
    fn test_search_url() {
        let url = policy()
            .build_search_url(&SearchTerms::new("bakery", "Toronto"), 1)
            .unwrap();
        assert_eq!(url.as_str(), "https://www.yellowpages.ca/search/si/1/bakery/Toronto");

        let url = policy()
            .build_search_url(&SearchTerms::new("pet food", "Québec City"), 3)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.yellowpages.ca/search/si/3/pet%20food/Qu%C3%A9bec%20City"
        );
    }

    #[test]
    fn test_full_listing() {
        let page = policy().parse_search_page(&page_url(), RESULTS_PAGE);
        assert_eq!(page.listings.len(), 2);

        let first = complete(&page.listings[0]);
        assert_eq!(first.listing_id.as_deref(), Some("1234567"));
        assert_eq!(first.company, "Acme Bakery");
        assert_eq!(
            first.source_url,
            "https://www.yellowpages.ca/bus/Ontario/Toronto/Acme-Bakery/1234567.html"
        );
        assert_eq!(first.phones, vec!["416-555-0100", "416-555-0199"]);
        assert_eq!(first.categories, vec!["Bakeries", "Cafes"]);
        assert!(first.sponsored);
        assert_eq!(first.address.full_address(), "12 Queen St W, Toronto, ON, M5H 2N2");
        assert_eq!(first.website, "https://acmebakery.ca");
    }

    #[test]
    fn test_fallbacks() {
        let page = policy().parse_search_page(&page_url(), RESULTS_PAGE);
        let second = complete(&page.listings[1]);

        assert_eq!(second.listing_id.as_deref(), Some("7654321"));
        assert_eq!(second.categories, vec!["Coffee Shops", "Bakeries"]);
        assert_eq!(second.phones, vec!["(647) 555-0111"]);
        assert!(!second.sponsored);
        assert_eq!(second.website, "");
        assert_eq!(second.address.full_address(), "");
    }

    #[test]
    fn test_next_page() {
        let page = policy().parse_search_page(&page_url(), RESULTS_PAGE);
        assert_eq!(
            page.next_page.unwrap().as_str(),
            "https://www.yellowpages.ca/search/si/2/bakery/Toronto"
        );
    }

    #[test]
    fn test_next_page_ignores_listing_names() {
        let body = r#"
<html><body>
  <div class="listing">
    <div class="listing__content">
      <a class="jsListingName" href="/bus/Ontario/Toronto/Next-Door-Bakery/5555555.html">Next Door Bakery</a>
    </div>
  </div>
  <div class="pagination"><a href="/search/si/2/bakery/Toronto">Next &raquo;</a></div>
</body></html>
"#;
        let page = policy().parse_search_page(&page_url(), body);
        assert_eq!(complete(&page.listings[0]).company, "Next Door Bakery");
        assert_eq!(
            page.next_page.unwrap().as_str(),
            "https://www.yellowpages.ca/search/si/2/bakery/Toronto"
        );

        let last = body.replace(r#"<div class="pagination"><a href="/search/si/2/bakery/Toronto">Next &raquo;</a></div>"#, "");
        assert!(policy().parse_search_page(&page_url(), &last).next_page.is_none());
    }

    #[test]
    fn test_last_page_and_empty_page() {
        let page = policy().parse_search_page(&page_url(), "<html><body><p>No results</p></body></html>");
        assert!(page.listings.is_empty());
        assert!(page.next_page.is_none());
    }

    #[test]
    fn test_listing_id_from_link() {
        assert_eq!(listing_id_from_link("/bus/A/B/C/100200.html").as_deref(), Some("100200"));
        assert_eq!(listing_id_from_link("/bus/A/B/C/"), None);
    }
}
