//! Small query helpers over `scraper` element trees
//!
//! Every helper returns trimmed text, and an absent node gives an empty
//! string or `None`, never an error.

use scraper::{ElementRef, Selector};

/// Parses a CSS selector written as a constant in this crate
pub(crate) fn css(selector: &'static str) -> Selector {
    Selector::parse(selector).unwrap_or_else(|e| panic!("invalid selector {:?}: {:?}", selector, e))
}

/// Concatenated descendant text with whitespace collapsed
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first match under `scope`, empty when nothing matches
pub fn first_text(scope: ElementRef<'_>, selector: &Selector) -> String {
    scope
        .select(selector)
        .next()
        .map(element_text)
        .unwrap_or_default()
}

/// Attribute of the first match under `scope` that carries it
pub fn first_attr(scope: ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    scope
        .select(selector)
        .find_map(|element| element.value().attr(attr))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Collapsed text of every match under `scope`, blanks dropped
pub fn all_texts(scope: ElementRef<'_>, selector: &Selector) -> Vec<String> {
    scope
        .select(selector)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect()
}

/// Every non-blank descendant text node, trimmed
pub fn text_nodes(element: ElementRef<'_>) -> Vec<String> {
    element
        .text()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .collect()
}

/// First non-blank text node that is a direct child of `element`
pub fn own_text(element: ElementRef<'_>) -> String {
    element
        .children()
        .filter_map(|node| node.value().as_text())
        .map(|text| text.trim())
        .find(|text| !text.is_empty())
        .map(str::to_string)
        .unwrap_or_default()
}

/// Matches of `selector` that are not nested inside another match
pub fn outermost<'a>(scope: ElementRef<'a>, selector: &Selector) -> Vec<ElementRef<'a>> {
    scope
        .select(selector)
        .filter(|element| {
            !element
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|ancestor| selector.matches(&ancestor))
        })
        .collect()
}
