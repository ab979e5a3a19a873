use crate::extract::fields::ListingFields;
use crate::state::SearchTerms;
use serde::Serialize;

/// Run-level provenance stamped onto every record
#[derive(Debug, Clone, Default)]
pub struct Provenance {
    /// Scraper name of the site policy, e.g. `yellowpages_canada`
    pub scraper_name: String,
    /// Operator-supplied source label
    pub source: String,
    pub run_id: String,
    /// Country used when the listing itself does not state one
    pub default_country: String,
}

/// One output row
///
/// Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingRecord {
    pub listing_id: String,
    pub company: String,
    pub phone: String,
    pub all_phones: String,
    pub email: String,
    pub website: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub full_address: String,
    pub country: String,
    pub what: String,
    #[serde(rename = "where")]
    pub location: String,
    pub scraper_source: String,
    pub source_url: String,
    pub note: String,
    pub sponsored: bool,
    pub category: String,
    pub source: String,
    pub run_id: String,
}

impl ListingRecord {
    /// CSV header, in column order
    pub const COLUMNS: [&'static str; 21] = [
        "listing_id",
        "company",
        "phone",
        "all_phones",
        "email",
        "website",
        "address",
        "city",
        "state",
        "postal_code",
        "full_address",
        "country",
        "what",
        "where",
        "scraper_source",
        "source_url",
        "note",
        "sponsored",
        "category",
        "source",
        "run_id",
    ];

    /// Builds the output row from extracted fields and run context
    pub fn new(fields: ListingFields, terms: &SearchTerms, provenance: &Provenance) -> Self {
        let phone = fields.primary_phone().to_string();
        let all_phones = fields.all_phones();
        let full_address = fields.address.full_address();
        let country = if fields.address.country.is_empty() {
            provenance.default_country.clone()
        } else {
            fields.address.country.clone()
        };
        let note = if fields.note.is_empty() && fields.sponsored {
            "Sponsored".to_string()
        } else {
            fields.note
        };

        Self {
            listing_id: fields.listing_id.unwrap_or_default(),
            company: fields.company,
            phone,
            all_phones,
            email: fields.email,
            website: fields.website,
            address: fields.address.street,
            city: fields.address.city,
            state: fields.address.region,
            postal_code: fields.address.postal_code,
            full_address,
            country,
            what: terms.what.clone(),
            location: terms.location.clone(),
            scraper_source: provenance.scraper_name.clone(),
            source_url: fields.source_url,
            note,
            sponsored: fields.sponsored,
            category: fields.categories.join(","),
            source: provenance.source.clone(),
            run_id: provenance.run_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::address::AddressParts;

    fn provenance() -> Provenance {
        Provenance {
            scraper_name: "yellowpages_canada".to_string(),
            source: "weekly".to_string(),
            run_id: "yellowpages_canada-20240101T000000Z".to_string(),
            default_country: "CA".to_string(),
        }
    }

    #[test]
    fn test_record_from_fields() {
        let fields = ListingFields {
            listing_id: Some("123".to_string()),
            company: "Acme Bakery".to_string(),
            phones: vec!["416-555-0100".to_string(), "416-555-0199".to_string()],
            address: AddressParts::new("1 King St", "Toronto", "ON", "M5H 1A1"),
            categories: vec!["Bakeries".to_string(), "Cafes".to_string()],
            sponsored: true,
            source_url: "https://www.yellowpages.ca/bus/123.html".to_string(),
            ..ListingFields::default()
        };
        let terms = SearchTerms::new("bakery", "Toronto");

        let record = ListingRecord::new(fields, &terms, &provenance());

        assert_eq!(record.listing_id, "123");
        assert_eq!(record.phone, "416-555-0100");
        assert_eq!(record.all_phones, "416-555-0100,416-555-0199");
        assert_eq!(record.full_address, "1 King St, Toronto, ON, M5H 1A1");
        assert_eq!(record.country, "CA");
        assert_eq!(record.location, "Toronto");
        assert_eq!(record.note, "Sponsored");
        assert_eq!(record.category, "Bakeries,Cafes");
        assert_eq!(record.scraper_source, "yellowpages_canada");
        assert_eq!(record.source, "weekly");
    }

    #[test]
    fn test_listing_country_overrides_default() {
        let mut address = AddressParts::default();
        address.country = "Canada".to_string();
        let fields = ListingFields {
            address,
            note: "10 years in business".to_string(),
            sponsored: true,
            ..ListingFields::default()
        };
        let record = ListingRecord::new(fields, &SearchTerms::empty(), &provenance());
        assert_eq!(record.country, "Canada");
        assert_eq!(record.note, "10 years in business");
        assert_eq!(record.listing_id, "");
    }

    #[test]
    fn test_serialized_header_matches_columns() {
        let mut writer = csv::Writer::from_writer(Vec::new());
        let record = ListingRecord::new(
            ListingFields::default(),
            &SearchTerms::empty(),
            &provenance(),
        );
        writer.serialize(&record).unwrap();
        let bytes = writer.into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(header, ListingRecord::COLUMNS.join(","));
    }
}
