//! Proxy credentials and round-robin rotation
//!
//! A run loads its proxy pool once. Every fetch failure advances the cursor by
//! one so the reissued request goes out through the next proxy.

mod credential;
mod rotator;

pub use credential::ProxyCredential;
pub use rotator::ProxyRotator;
