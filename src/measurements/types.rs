//! Measurement record and aggregate table definitions.

use serde::Deserialize;
use std::collections::BTreeMap;

/// One row of the bandwidth export: `country, region, download, upload`.
///
/// Throughput columns are in kilobits per second.
#[derive(Debug, Clone, Deserialize)]
pub struct BandwidthRecord {
    pub country: String,
    pub region: String,
    pub download_kbps: f64,
    pub upload_kbps: f64,
}

/// One row of the network-quality export:
/// `country, region, jitter, packet_loss_percent, latency`.
#[derive(Debug, Clone, Deserialize)]
pub struct PacketLossRecord {
    pub country: String,
    pub region: String,
    pub jitter: f64,
    pub packet_loss_percent: f64,
    pub latency: f64,
}

/// Download and upload throughput per region code, in KiB/s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BandwidthTable {
    pub download: BTreeMap<String, u64>,
    pub upload: BTreeMap<String, u64>,
}

impl BandwidthTable {
    /// Number of distinct region codes seen
    pub fn len(&self) -> usize {
        self.upload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upload.is_empty()
    }
}

/// Packet-loss fraction per region code, plus the mean over all codes.
#[derive(Debug, Clone, PartialEq)]
pub struct PacketLossTable {
    pub fractions: BTreeMap<String, f64>,
    pub mean: f64,
}

impl PacketLossTable {
    /// Loss fraction for a region, falling back to the table mean
    pub fn fraction_or_mean(&self, code: &str) -> f64 {
        self.fractions.get(code).copied().unwrap_or(self.mean)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.fractions.contains_key(code)
    }
}
