//! Per-region network measurements.
//!
//! This module turns the bandwidth and packet-loss CSV exports into lookup
//! tables keyed by normalized region code. Both tables keep the first value
//! seen for a region code and ignore later duplicates.

pub mod types;
pub mod region;
pub mod bandwidth;
pub mod packet_loss;

pub use types::{BandwidthRecord, BandwidthTable, PacketLossRecord, PacketLossTable};
pub use region::region_code;
pub use bandwidth::{kbit_to_kib, load_bandwidth};
pub use packet_loss::{format_fraction, load_packet_loss};
