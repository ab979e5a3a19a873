use once_cell::sync::Lazy;
use regex::Regex;

/// `City, ST 12345` or `City, ST 12345-6789`
static US_LOCALITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.*?),\s*([A-Za-z]{2})\s+(\d{5}(?:-\d{4})?)$").expect("valid locality pattern")
});

static HAS_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d").expect("valid digit pattern"));

static STARTS_WITH_DIGIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d").expect("valid leading digit pattern"));

/// Province name that marks the province slot in manufacturer addresses
const QUEBEC: &str = "québec";

/// Structured address of one listing; absent parts are empty strings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressParts {
    pub street: String,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country: String,
}

impl AddressParts {
    /// Trims each part independently
    pub fn new(
        street: impl AsRef<str>,
        city: impl AsRef<str>,
        region: impl AsRef<str>,
        postal_code: impl AsRef<str>,
    ) -> Self {
        Self {
            street: street.as_ref().trim().to_string(),
            city: city.as_ref().trim().to_string(),
            region: region.as_ref().trim().to_string(),
            postal_code: postal_code.as_ref().trim().to_string(),
            country: String::new(),
        }
    }

    /// Comma-joined non-empty street, city, region and postal code, in that order
    pub fn full_address(&self) -> String {
        [
            self.street.as_str(),
            self.city.as_str(),
            self.region.as_str(),
            self.postal_code.as_str(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

/// Parses a US locality line into `(city, state, zip)`
///
/// Falls back to a comma split (`City, ST ZIP` with loose spacing). When
/// neither shape matches, the whole line becomes the city.
pub fn parse_us_locality(line: &str) -> (String, String, String) {
    let line = line.trim();

    if let Some(caps) = US_LOCALITY.captures(line) {
        return (
            caps[1].trim().to_string(),
            caps[2].to_string(),
            caps[3].to_string(),
        );
    }

    let parts: Vec<&str> = line
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    if parts.len() >= 2 {
        let rest: Vec<&str> = parts[1].split_whitespace().collect();
        if rest.len() >= 2 {
            return (parts[0].to_string(), rest[0].to_string(), rest[1].to_string());
        }
        return (parts[0].to_string(), String::new(), String::new());
    }

    (line.to_string(), String::new(), String::new())
}

/// Parses the ordered address lines of a manufacturer card
///
/// A last part containing digits is the postal code. A leading `Québec`
/// means there is no street or city. Otherwise a part starting with a digit
/// is the street and the following parts are city, province and country.
pub fn parse_manufacturer_address(parts: &[String]) -> AddressParts {
    let mut parts: Vec<&str> = parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();
    let mut address = AddressParts::default();

    if parts.last().is_some_and(|last| HAS_DIGIT.is_match(last)) {
        if let Some(postal) = parts.pop() {
            address.postal_code = postal.to_string();
        }
    }

    let Some(first) = parts.first() else {
        return address;
    };

    if first.to_lowercase() == QUEBEC {
        address.region = first.to_string();
        if let Some(country) = parts.get(1) {
            address.country = country.to_string();
        }
        return address;
    }

    if STARTS_WITH_DIGIT.is_match(first) {
        address.street = first.to_string();
    }

    match parts.get(1) {
        Some(second) if second.to_lowercase() == QUEBEC => {
            address.region = second.to_string();
            if let Some(country) = parts.get(2) {
                address.country = country.to_string();
            }
        }
        Some(second) => {
            address.city = second.to_string();
            if let Some(region) = parts.get(2) {
                address.region = region.to_string();
            }
            if let Some(country) = parts.get(3) {
                address.country = country.to_string();
            }
        }
        None => {}
    }

    address
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_full_address_skips_empty_parts() {
        let address = AddressParts::new("12 King St W", "", "ON", " M5H 1A1 ");
        assert_eq!(address.full_address(), "12 King St W, ON, M5H 1A1");
        assert_eq!(AddressParts::default().full_address(), "");
    }

    #[test]
    fn test_us_locality_regex() {
        assert_eq!(
            parse_us_locality("Austin, TX 78701"),
            ("Austin".to_string(), "TX".to_string(), "78701".to_string())
        );
        assert_eq!(
            parse_us_locality("New York, NY 10001-1234"),
            ("New York".to_string(), "NY".to_string(), "10001-1234".to_string())
        );
    }

    #[test]
    fn test_us_locality_fallback_split() {
        assert_eq!(
            parse_us_locality("Springfield ,  IL   6270A"),
            ("Springfield".to_string(), "IL".to_string(), "6270A".to_string())
        );
        assert_eq!(
            parse_us_locality("Somewhere"),
            ("Somewhere".to_string(), String::new(), String::new())
        );
    }

    #[test]
    fn test_manufacturer_full_address() {
        let address = parse_manufacturer_address(&owned(&[
            "1234 rue Principale",
            "Laval",
            "Québec",
            "Canada",
            "H7A 1B2",
        ]));
        assert_eq!(address.street, "1234 rue Principale");
        assert_eq!(address.city, "Laval");
        assert_eq!(address.region, "Québec");
        assert_eq!(address.country, "Canada");
        assert_eq!(address.postal_code, "H7A 1B2");
    }

    #[test]
    fn test_manufacturer_province_only() {
        let address = parse_manufacturer_address(&owned(&["Québec", "Canada"]));
        assert_eq!(address.region, "Québec");
        assert_eq!(address.country, "Canada");
        assert!(address.street.is_empty());
        assert!(address.postal_code.is_empty());
    }

    #[test]
    fn test_manufacturer_street_then_province() {
        let address = parse_manufacturer_address(&owned(&["55 boul. Est", "QUÉBEC", "Canada", "G1K 3A1"]));
        assert_eq!(address.street, "55 boul. Est");
        assert!(address.city.is_empty());
        assert_eq!(address.region, "QUÉBEC");
        assert_eq!(address.country, "Canada");
    }

    #[test]
    fn test_manufacturer_no_street_number() {
        let address = parse_manufacturer_address(&owned(&["Parc industriel", "Lévis", "Québec"]));
        assert!(address.street.is_empty());
        assert_eq!(address.city, "Lévis");
        assert_eq!(address.region, "Québec");
    }

    #[test]
    fn test_manufacturer_empty() {
        assert_eq!(parse_manufacturer_address(&[]), AddressParts::default());
    }
}
