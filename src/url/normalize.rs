use crate::UrlError;
use url::Url;

/// Query parameters that never identify a listing
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "ref"];

/// Resolves `href` against `base` and canonicalizes the result
///
/// The canonical form is what the dedupe tracker keys on when a listing has
/// no site id, so two links to the same listing must produce the same string.
///
/// # Normalization Steps
///
/// 1. Join `href` onto `base`; reject if malformed
/// 2. Require an http(s) scheme and a host
/// 3. Lowercase the host (done by the parser)
/// 4. Remove dot segments, empty segments and the trailing slash (root keeps `/`)
/// 5. Remove the fragment
/// 6. Remove tracking query parameters and sort the rest by key
///
/// # Arguments
///
/// * `base` - Page the link was found on, or the site root
/// * `href` - Absolute or relative link target
///
/// # Examples
///
/// ```
/// use url::Url;
/// use yp_harvest::url::canonical_url;
///
/// let base = Url::parse("https://www.yellowpages.ca/search/si/1/bakery/Toronto").unwrap();
/// let url = canonical_url(&base, "/bus/Ontario/Toronto/Acme/123.html#top").unwrap();
/// assert_eq!(url.as_str(), "https://www.yellowpages.ca/bus/Ontario/Toronto/Acme/123.html");
/// ```
pub fn canonical_url(base: &Url, href: &str) -> Result<Url, UrlError> {
    let mut url = base
        .join(href.trim())
        .map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Removes dot segments, doubled slashes and a trailing slash
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort();
    params
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
