//! Country lookup for dotted-quad IPv4 addresses.
//!
//! A linear scan in file order. It runs once per relay node, so the table is
//! never indexed; an interval index would also change which of two
//! overlapping ranges wins.

use super::table::GeoTable;
use crate::error::RecordError;

/// Country code returned when no range contains the address
pub const FALLBACK_COUNTRY: &str = "US";

/// Convert a dotted-quad address to `a*2^24 + b*2^16 + c*2^8 + d`.
///
/// Octets are read as plain decimal numbers, so `010.1.2.3` is `10.1.2.3`.
pub fn ipv4_to_u32(ip: &str) -> Result<u32, RecordError> {
    let invalid = || RecordError::InvalidIp(ip.to_string());

    let mut value = 0u32;
    let mut octets = 0;
    for part in ip.trim().split('.') {
        let octet: u8 = part.parse().map_err(|_| invalid())?;
        octets += 1;
        if octets > 4 {
            return Err(invalid());
        }
        value = (value << 8) | u32::from(octet);
    }

    if octets != 4 {
        return Err(invalid());
    }
    Ok(value)
}

impl GeoTable {
    /// Country of the first range containing `value`, bounds inclusive
    pub fn country_for(&self, value: u32) -> &str {
        self.ranges()
            .iter()
            .find(|range| range.contains(value))
            .map(|range| range.country.as_str())
            .unwrap_or(FALLBACK_COUNTRY)
    }

    /// Country of a dotted-quad address
    pub fn lookup(&self, ip: &str) -> Result<&str, RecordError> {
        Ok(self.country_for(ipv4_to_u32(ip)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoRange;

    fn range(low: u32, high: u32, country: &str) -> GeoRange {
        GeoRange { low, high, country: country.to_string() }
    }

    #[test]
    fn test_ipv4_to_u32() {
        assert_eq!(ipv4_to_u32("0.0.0.0").unwrap(), 0);
        assert_eq!(ipv4_to_u32("1.2.3.4").unwrap(), 16909060);
        assert_eq!(ipv4_to_u32("255.255.255.255").unwrap(), u32::MAX);
        assert!(ipv4_to_u32("256.1.1.1").is_err());
        assert!(ipv4_to_u32("not.an.ip").is_err());
        assert!(ipv4_to_u32("1.2.3.4.5").is_err());
        assert!(ipv4_to_u32("1..3.4").is_err());
    }

    #[test]
    fn test_ipv4_to_u32_accepts_leading_zeros() {
        assert_eq!(ipv4_to_u32("010.1.2.3").unwrap(), ipv4_to_u32("10.1.2.3").unwrap());
        assert_eq!(ipv4_to_u32("001.000.000.001").unwrap(), 16777217);
    }

    #[test]
    fn test_full_range_matches_everything() {
        let table = GeoTable::new(vec![range(0, u32::MAX, "US")]);

        assert_eq!(table.lookup("0.0.0.0").unwrap(), "US");
        assert_eq!(table.lookup("141.161.20.54").unwrap(), "US");
        assert_eq!(table.lookup("255.255.255.255").unwrap(), "US");
    }

    #[test]
    fn test_bounds_are_inclusive() {
        // 1.0.0.0 .. 1.0.0.255
        let table = GeoTable::new(vec![range(16777216, 16777471, "AU")]);

        assert_eq!(table.lookup("1.0.0.0").unwrap(), "AU");
        assert_eq!(table.lookup("1.0.0.255").unwrap(), "AU");
        assert_eq!(table.lookup("1.0.1.0").unwrap(), FALLBACK_COUNTRY);
    }

    #[test]
    fn test_miss_falls_back() {
        let table = GeoTable::new(vec![range(10, 20, "DE")]);
        assert_eq!(table.lookup("8.8.8.8").unwrap(), "US");

        let empty = GeoTable::default();
        assert_eq!(empty.lookup("8.8.8.8").unwrap(), "US");
    }

    #[test]
    fn test_first_match_wins_on_overlap() {
        let table = GeoTable::new(vec![range(0, 100, "FR"), range(50, 150, "DE")]);

        assert_eq!(table.country_for(75), "FR");
        assert_eq!(table.country_for(120), "DE");
    }

    #[test]
    fn test_lookup_rejects_bad_ip() {
        let table = GeoTable::default();
        assert_eq!(
            table.lookup("1.2.3").unwrap_err(),
            RecordError::InvalidIp("1.2.3".to_string())
        );
    }
}
