use url::Url;

/// Path segment the directories use for outbound click tracking
const REDIRECT_MARKER: &str = "/gourl/";

/// Query parameter holding the wrapped target
const REDIRECT_PARAM: &str = "redirect";

/// Resolves a listing's website link to the business's own URL
///
/// Redirect wrappers (`/gourl/...` paths or a `redirect=` parameter) are
/// unwrapped and the target is percent-decoded. Any other link is resolved
/// against `base`. Whenever parsing fails the raw href is returned as-is.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use yp_harvest::url::resolve_website;
///
/// let base = Url::parse("https://www.yellowpages.ca").unwrap();
/// assert_eq!(
///     resolve_website("/gourl/abc?redirect=https%3A%2F%2Fexample.com", &base),
///     "https://example.com"
/// );
/// assert_eq!(resolve_website("/biz", &base), "https://www.yellowpages.ca/biz");
/// ```
pub fn resolve_website(href: &str, base: &Url) -> String {
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }

    if is_redirect_wrapper(href) {
        return unwrap_redirect(href, base).unwrap_or_else(|| href.to_string());
    }

    match base.join(href) {
        Ok(url) => url.to_string(),
        Err(e) => {
            tracing::debug!("Keeping unresolvable website href {}: {}", href, e);
            href.to_string()
        }
    }
}

/// True when the link goes through the directory's click-tracking redirect
pub fn is_redirect_wrapper(href: &str) -> bool {
    href.contains(REDIRECT_MARKER) || href.contains("redirect=")
}

/// Extracts and decodes the `redirect` parameter
///
/// Query parsing decodes once; the directories sometimes double-encode the
/// target, so one more decode pass is applied when it yields valid UTF-8.
fn unwrap_redirect(href: &str, base: &Url) -> Option<String> {
    let url = base.join(href).ok()?;
    let target = url
        .query_pairs()
        .find(|(key, _)| key == REDIRECT_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())?;

    let decoded = urlencoding::decode(&target)
        .map(|value| value.into_owned())
        .unwrap_or(target);

    Some(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.yellowpages.ca").unwrap()
    }

    #[test]
    fn test_redirect_param_unwrapped() {
        assert_eq!(
            resolve_website("/gourl/123?redirect=https%3A%2F%2Fexample.com", &base()),
            "https://example.com"
        );
    }

    #[test]
    fn test_redirect_param_without_marker() {
        assert_eq!(
            resolve_website(
                "https://track.example.net/click?id=9&redirect=http%3A%2F%2Facme.ca%2Fshop",
                &base()
            ),
            "http://acme.ca/shop"
        );
    }

    #[test]
    fn test_double_encoded_target() {
        assert_eq!(
            resolve_website("/gourl/1?redirect=https%253A%252F%252Fexample.com", &base()),
            "https://example.com"
        );
    }

    #[test]
    fn test_marker_without_param_returns_raw() {
        assert_eq!(resolve_website("/gourl/abc", &base()), "/gourl/abc");
    }

    #[test]
    fn test_relative_href_resolved_against_base() {
        assert_eq!(
            resolve_website("/biz", &base()),
            "https://www.yellowpages.ca/biz"
        );
    }

    #[test]
    fn test_absolute_href_kept() {
        assert_eq!(
            resolve_website("https://acme.ca/", &base()),
            "https://acme.ca/"
        );
    }

    #[test]
    fn test_unparseable_href_returned_raw() {
        assert_eq!(resolve_website("http://[::1", &base()), "http://[::1");
    }

    #[test]
    fn test_empty_href() {
        assert_eq!(resolve_website("   ", &base()), "");
    }
}
