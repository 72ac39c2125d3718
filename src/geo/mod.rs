//! IPv4 geolocation from a range table.
//!
//! The table is the plain-text `geoip` format: one `low,high,country` entry
//! per line with the bounds given as 32-bit integers.

pub mod table;
pub mod lookup;

pub use table::{load_geo_table, GeoRange, GeoTable};
pub use lookup::{ipv4_to_u32, FALLBACK_COUNTRY};
