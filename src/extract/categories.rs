use once_cell::sync::Lazy;
use regex::Regex;

/// An entry that is only the "More..." expander
static MORE_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^more(\.\.\.|…)?$").expect("valid more pattern"));

/// A trailing "More..." glued onto a real category
static MORE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*More(\.\.\.|…)?$").expect("valid more suffix pattern"));

static COMMA_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*").expect("valid comma pattern"));

/// Drops "More..." entries, strips "More..." suffixes and removes blanks
pub fn clean_categories<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .map(|category| category.as_ref().trim().to_string())
        .filter(|category| !MORE_ONLY.is_match(category))
        .map(|category| MORE_SUFFIX.replace(&category, "").trim().to_string())
        .filter(|category| !category.is_empty())
        .collect()
}

/// Splits a heading such as `"Bakeries, Cafes More..."` on commas
pub fn split_heading(text: &str) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    COMMA_SPLIT.split(text).map(str::to_string).collect()
}

/// True when `what` appears, case-insensitively, inside at least one category
pub fn matches_category(what: &str, categories: &[String]) -> bool {
    let what = what.trim().to_lowercase();
    categories
        .iter()
        .any(|category| category.to_lowercase().contains(&what))
}
