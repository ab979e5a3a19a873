use crate::extract::address::AddressParts;
use crate::state::DedupeKey;

/// Everything a site policy pulled out of one listing
///
/// Text fields are trimmed and absent ones are empty strings. Only the
/// listing id is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingFields {
    pub listing_id: Option<String>,
    pub company: String,
    /// Distinct phones in first-seen order; the first is the primary phone
    pub phones: Vec<String>,
    pub email: String,
    pub website: String,
    pub address: AddressParts,
    pub categories: Vec<String>,
    pub sponsored: bool,
    pub note: String,
    /// Absolute URL of the listing's own page, empty when unknown
    pub source_url: String,
}

impl ListingFields {
    pub fn primary_phone(&self) -> &str {
        self.phones.first().map(String::as_str).unwrap_or("")
    }

    pub fn all_phones(&self) -> String {
        self.phones.join(",")
    }

    /// Dedupe key by listing id, then source URL, then name and first phone
    pub fn dedupe_key(&self) -> DedupeKey {
        DedupeKey::derive(
            self.listing_id.as_deref(),
            Some(self.source_url.as_str()),
            &self.company,
            self.primary_phone(),
        )
    }
}
