use crate::extract::address::parse_manufacturer_address;
use crate::extract::categories::clean_categories;
use crate::extract::markup::{css, element_text, first_attr, first_text, text_nodes};
use crate::extract::phones::extract_phones;
use crate::extract::ListingFields;
use crate::sites::{default_base, ExtractionPolicy, ListingHit, SearchPage, SiteKind};
use crate::state::{DedupeKey, SearchTerms};
use crate::url::resolve_website;
use crate::UrlError;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

const BASE_URL: &str = "https://www.manufacturier.quebec";

const DIRECTORY_PATH: &str = "/fr/repertoire-des-manufacturiers";

/// Last page of the organization listing
const LAST_PAGE: u32 = 187;

const HEADERS: &[(&str, &str)] = &[
    (
        "User-Agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0 Safari/537.36",
    ),
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
    ),
    ("Accept-Language", "fr-CA,fr;q=0.9,en;q=0.8"),
];

static ROWS: Lazy<Selector> = Lazy::new(|| css("tbody tr[id]"));
static TOPBAR: Lazy<Selector> = Lazy::new(|| css(r#"div[data-zone-alias="Topbar"]"#));
static ACTIVE_PAGE: Lazy<Selector> = Lazy::new(|| css(r#"a[class="page disabled active"]"#));

static NAME: Lazy<Selector> = Lazy::new(|| css("h1"));
static ADDRESS: Lazy<Selector> = Lazy::new(|| css("div.org-card__inner > p.org-card__address"));
static PHONE: Lazy<Selector> = Lazy::new(|| css("div.org-card__inner > p.org-card__phone"));
static WEBSITE: Lazy<Selector> = Lazy::new(|| css("a.org-card__website"));
static HEADINGS: Lazy<Selector> = Lazy::new(|| css("h2"));

static ROW_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"view_detailorganization_(\d+)").expect("valid row id pattern"));
static RANDOM_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"randomId=(\d+)").expect("valid random id pattern"));
static ADDRESS_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(address|adresse)\s*:?").expect("valid address label pattern"));

/// manufacturier.quebec: a paginated organization table, one detail page per row
///
/// The directory is not searched by terms; the run has a single traversal.
#[derive(Debug, Clone)]
pub struct ManufacturierQuebec {
    base: Url,
}

impl ManufacturierQuebec {
    pub fn new(base: Option<Url>) -> Self {
        Self {
            base: base.unwrap_or_else(|| default_base(BASE_URL)),
        }
    }

    fn directory_url(&self, path: &str) -> Result<Url, UrlError> {
        self.base
            .join(&format!("{}/{}", DIRECTORY_PATH, path))
            .map_err(|e| UrlError::Parse(e.to_string()))
    }

    fn pagination_url(&self, page: u32, zone_id: &str, random_id: &str) -> Result<Url, UrlError> {
        let mut url = self.directory_url(&format!("pagination/pageNumber/{}", page))?;
        url.query_pairs_mut()
            .append_pair("activetab", "organization")
            .append_pair("zoneId", zone_id)
            .append_pair("randomId", random_id);
        Ok(url)
    }
}

impl ExtractionPolicy for ManufacturierQuebec {
    fn kind(&self) -> SiteKind {
        SiteKind::ManufacturierQuebec
    }

    fn base_url(&self) -> &Url {
        &self.base
    }

    fn headers(&self) -> &'static [(&'static str, &'static str)] {
        HEADERS
    }

    /// Page 1 is the organization tab; later pages use the pagination endpoint
    fn build_search_url(&self, _terms: &SearchTerms, page: u32) -> Result<Url, UrlError> {
        if page <= 1 {
            self.directory_url("organization")
        } else {
            self.pagination_url(page, "", "")
        }
    }

    fn parse_search_page(&self, page_url: &Url, body: &str) -> SearchPage {
        let document = Html::parse_document(body);
        let root = document.root_element();

        let mut listings = Vec::new();
        for row in root.select(&ROWS) {
            let Some(id) = row
                .value()
                .attr("id")
                .and_then(|id| ROW_ID.captures(id))
                .map(|caps| caps[1].to_string())
            else {
                continue;
            };

            match self.directory_url(&format!("detailorganization/id/{}", id)) {
                Ok(url) => listings.push(ListingHit::Detail {
                    key: DedupeKey::ListingId(id.clone()),
                    url,
                    listing_id: Some(id),
                }),
                Err(e) => tracing::warn!("Cannot build detail URL for organization {}: {}", id, e),
            }
        }

        let current_page = first_text(root, &ACTIVE_PAGE).parse::<u32>().unwrap_or(1);
        let next_page = if listings.is_empty() || current_page >= LAST_PAGE {
            None
        } else {
            let zone_id = first_attr(root, &TOPBAR, "data-zone-id").unwrap_or_default();
            let random_id = RANDOM_ID
                .captures(page_url.as_str())
                .map(|caps| caps[1].to_string())
                .unwrap_or_default();
            self.pagination_url(current_page + 1, &zone_id, &random_id).ok()
        };

        tracing::debug!(
            "{} organizations on page {} (next page: {})",
            listings.len(),
            current_page,
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

        let address_lines: Vec<String> = root
            .select(&ADDRESS)
            .flat_map(text_nodes)
            .map(|line| clean_text(&line))
            .filter(|line| !line.is_empty())
            .collect();

        let phone_text = clean_text(&first_text(root, &PHONE));
        let mut phones = extract_phones([phone_text.as_str()]);
        if phones.is_empty() && !phone_text.is_empty() {
            phones.push(phone_text);
        }

        let website = first_attr(root, &WEBSITE, "href")
            .map(|href| resolve_website(&href, page_url))
            .unwrap_or_default();

        ListingFields {
            listing_id: listing_id.map(str::to_string),
            company: clean_text(&first_text(root, &NAME)),
            phones,
            email: String::new(),
            website,
            address: parse_manufacturer_address(&address_lines),
            categories: clean_categories(sector_names(root)),
            sponsored: false,
            note: String::new(),
            source_url: page_url.to_string(),
        }
    }
}

/// Items of the list that follows the "Secteurs d'activités" heading
fn sector_names(root: ElementRef<'_>) -> Vec<String> {
    let Some(heading) = root
        .select(&HEADINGS)
        .find(|h2| element_text(*h2).to_lowercase().contains("secteurs d"))
    else {
        return Vec::new();
    };

    heading
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .filter(|sibling| sibling.value().name() == "ul")
        .flat_map(|list| list.children().filter_map(ElementRef::wrap))
        .filter(|item| item.value().name() == "li")
        .map(|item| clean_text(&element_text(item)))
        .collect()
}

/// Trims and drops a leading "Address :" label
fn clean_text(value: &str) -> String {
    ADDRESS_LABEL.replace(value.trim(), "").trim().to_string()
}
