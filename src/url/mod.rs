//! URL handling module for yp-harvest
//!
//! Canonicalization of listing links (used for dedupe keys) and resolution
//! of website links, including unwrapping of click-tracking redirects.

mod normalize;
mod redirect;

pub use normalize::canonical_url;
pub use redirect::{is_redirect_wrapper, resolve_website};
