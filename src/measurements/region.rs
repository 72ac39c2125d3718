//! Region code normalization.

/// Build the region code used to key the measurement tables.
///
/// Only the US and Canada keep sub-national detail (`USVA`, `CAON`); every
/// other country collapses to its bare country code. A region equal to the
/// country code itself means no sub-region was recorded.
pub fn region_code(country: &str, region: &str) -> String {
    let keeps_region = (country.contains("US") && region != "US")
        || (country.contains("CA") && region != "CA");

    if keeps_region {
        format!("{}{}", country, region)
    } else {
        country.to_string()
    }
}
