use once_cell::sync::Lazy;
use regex::Regex;

/// Optional `+` or `(`, a digit, at least six digits or separators, a closing digit
static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\+?\(?\d[\d\-\s().]{6,}\d)").expect("valid phone pattern"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Candidates with fewer digits are street numbers, postal codes or dates
const MIN_PHONE_DIGITS: usize = 8;

/// Scans a pool of text nodes for phone numbers
///
/// Every phone-shaped match in every text node is a candidate; a short one
/// such as a suite number does not hide a real phone later in the same node.
/// Internal whitespace is collapsed and repeats are dropped, keeping
/// first-seen order, so the first entry is the primary phone.
pub fn extract_phones<'a, I>(texts: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut phones: Vec<String> = Vec::new();

    for found in texts.into_iter().flat_map(|text| PHONE_PATTERN.find_iter(text)) {
        let candidate = WHITESPACE.replace_all(found.as_str(), " ").trim().to_string();
        if digit_count(&candidate) < MIN_PHONE_DIGITS {
            continue;
        }

        if !phones.contains(&candidate) {
            phones.push(candidate);
        }
    }

    phones
}

/// Merges phone lists, dropping blanks and repeats
pub fn merge_phones<I, S>(phones: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut merged: Vec<String> = Vec::new();
    for phone in phones {
        let phone = phone.as_ref().trim();
        if !phone.is_empty() && !merged.iter().any(|p| p == phone) {
            merged.push(phone.to_string());
        }
    }
    merged
}

fn digit_count(s: &str) -> usize {
    s.chars().filter(char::is_ascii_digit).count()
}
