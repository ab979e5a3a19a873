//! Run inputs: search term lists and the proxy pool

mod proxies;
mod terms;

pub use proxies::load_proxies;
pub use terms::load_terms;
