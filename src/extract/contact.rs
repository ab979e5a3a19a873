use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static EMAIL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern"));

/// Used when a JSON-LD block does not parse as JSON
static EMAIL_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""email"\s*:\s*"(?:mailto:)?([^"]+)""#).expect("valid email field pattern")
});

/// Finds the first plausible email address in a page's JSON-LD blocks
///
/// Blocks that parse are searched for an `email` property on the top-level
/// object, on array members and inside `@graph`. Blocks that fail to parse
/// are scanned with a regex instead.
pub fn email_from_json_ld<'a, I>(scripts: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    for script in scripts {
        let candidate = match serde_json::from_str::<Value>(script) {
            Ok(value) => email_in_value(&value),
            Err(_) => EMAIL_FIELD
                .captures(script)
                .map(|caps| caps[1].trim().to_string()),
        };

        if let Some(email) = candidate.filter(|email| is_email(email)) {
            return Some(email);
        }
    }
    None
}

fn email_in_value(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(raw)) = map.get("email") {
                let email = raw.trim();
                return Some(email.strip_prefix("mailto:").unwrap_or(email).trim().to_string());
            }
            map.get("@graph").and_then(email_in_value)
        }
        Value::Array(items) => items.iter().find_map(email_in_value),
        _ => None,
    }
}

/// `local@domain.tld` shape check
pub fn is_email(candidate: &str) -> bool {
    EMAIL_SHAPE.is_match(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_from_object() {
        let scripts = [r#"{"@type":"LocalBusiness","email":"mailto:info@acme.com"}"#];
        assert_eq!(email_from_json_ld(scripts).as_deref(), Some("info@acme.com"));
    }

    #[test]
    fn test_email_from_array_and_graph() {
        let scripts = [
            r#"[{"@type":"Organization"},{"email":"sales@acme.com"}]"#,
        ];
        assert_eq!(email_from_json_ld(scripts).as_deref(), Some("sales@acme.com"));

        let scripts = [r#"{"@graph":[{"email":"hi@acme.org"}]}"#];
        assert_eq!(email_from_json_ld(scripts).as_deref(), Some("hi@acme.org"));
    }

    #[test]
    fn test_regex_fallback_on_broken_json() {
        let scripts = [r#"{"name":"Acme", "email" : "mailto:broken@acme.com", }"#];
        assert_eq!(email_from_json_ld(scripts).as_deref(), Some("broken@acme.com"));
    }

    #[test]
    fn test_invalid_email_skipped() {
        let scripts = [
            r#"{"email":"not-an-email"}"#,
            r#"{"email":"second@acme.ca"}"#,
        ];
        assert_eq!(email_from_json_ld(scripts).as_deref(), Some("second@acme.ca"));
    }

    #[test]
    fn test_no_email() {
        assert_eq!(email_from_json_ld([r#"{"name":"Acme"}"#]), None);
        assert_eq!(email_from_json_ld(Vec::<&str>::new()), None);
    }
}
