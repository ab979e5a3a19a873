use std::collections::HashSet;
use std::fmt;

/// Identity used to suppress repeated listings within a run
///
/// Derived in priority order: site listing id, then canonical absolute URL,
/// then lowercased name plus first phone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupeKey {
    ListingId(String),
    Url(String),
    NamePhone { name: String, phone: String },
}

impl DedupeKey {
    /// Derives the key from whatever identity a fragment exposes
    ///
    /// # Arguments
    ///
    /// * `listing_id` - Site-assigned id, if one was found
    /// * `url` - Canonical absolute URL of the listing, if one was found
    /// * `name` - Business name as displayed
    /// * `first_phone` - Primary phone, empty when none
    pub fn derive(
        listing_id: Option<&str>,
        url: Option<&str>,
        name: &str,
        first_phone: &str,
    ) -> Self {
        if let Some(id) = listing_id.map(str::trim).filter(|id| !id.is_empty()) {
            return Self::ListingId(id.to_string());
        }
        if let Some(url) = url.map(str::trim).filter(|url| !url.is_empty()) {
            return Self::Url(url.to_string());
        }
        Self::NamePhone {
            name: name.trim().to_lowercase(),
            phone: first_phone.trim().to_string(),
        }
    }
}

impl fmt::Display for DedupeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ListingId(id) => write!(f, "id:{}", id),
            Self::Url(url) => write!(f, "url:{}", url),
            Self::NamePhone { name, phone } => write!(f, "name_phone:{}_{}", name, phone),
        }
    }
}

/// Run-scoped set of dedupe keys already admitted
#[derive(Debug, Default)]
pub struct DedupTracker {
    seen: HashSet<DedupeKey>,
}

impl DedupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the key, returning `true` the first time it is seen
    pub fn insert(&mut self, key: DedupeKey) -> bool {
        self.seen.insert(key)
    }

    pub fn contains(&self, key: &DedupeKey) -> bool {
        self.seen.contains(key)
    }

    /// Number of distinct keys admitted so far
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
