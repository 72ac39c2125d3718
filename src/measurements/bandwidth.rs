//! Bandwidth aggregation.
//!
//! Reads the per-region throughput export and keeps one download and one
//! upload value per region code, converted from kbit/s to KiB/s.

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{debug, info};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::region::region_code;
use super::types::{BandwidthRecord, BandwidthTable};
use crate::error::RecordError;

/// Convert kilobits per second to kibibytes per second.
///
/// Halfway values round away from zero, so 64 kbit/s (62.5 KiB/s) becomes 63.
pub fn kbit_to_kib(kbps: f64) -> u64 {
    (kbps * 1000.0 / 1024.0).round() as u64
}

/// Convert one throughput value, rejecting anything that is negative, not
/// finite, or too large to fit a u64 once converted.
fn checked_kib(code: &str, kbps: f64) -> Result<u64, RecordError> {
    if !kbps.is_finite() || kbps < 0.0 || (kbps * 1000.0 / 1024.0).round() >= u64::MAX as f64 {
        return Err(RecordError::InvalidThroughput {
            code: code.to_string(),
            value: kbps,
        });
    }
    Ok(kbit_to_kib(kbps))
}

/// Fold bandwidth records into a table, keeping the first value per region code
pub fn aggregate_bandwidth<I>(records: I) -> Result<BandwidthTable, RecordError>
where
    I: IntoIterator<Item = BandwidthRecord>,
{
    let mut table = BandwidthTable::default();

    for record in records {
        let code = region_code(&record.country, &record.region);
        let down = checked_kib(&code, record.download_kbps)?;
        let up = checked_kib(&code, record.upload_kbps)?;

        if table.download.contains_key(&code) {
            debug!("Ignoring duplicate bandwidth entry for region {}", code);
        }
        table.download.entry(code.clone()).or_insert(down);
        table.upload.entry(code).or_insert(up);
    }

    Ok(table)
}

/// Decode headerless bandwidth CSV rows from a reader
pub fn read_bandwidth<R: Read>(reader: R) -> Result<BandwidthTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let records = csv_reader
        .deserialize::<BandwidthRecord>()
        .collect::<Result<Vec<_>, _>>()
        .wrap_err("Failed to decode bandwidth record")?;

    Ok(aggregate_bandwidth(records)?)
}

/// Load the bandwidth table from a CSV file
pub fn load_bandwidth(path: &Path) -> Result<BandwidthTable> {
    info!("Loading bandwidth measurements from: {:?}", path);

    let file = File::open(path)
        .wrap_err_with(|| format!("Failed to open bandwidth file '{}'", path.display()))?;
    let table = read_bandwidth(file)
        .wrap_err_with(|| format!("Invalid bandwidth file '{}'", path.display()))?;

    info!("Loaded bandwidth for {} region codes", table.len());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(country: &str, region: &str, down: f64, up: f64) -> BandwidthRecord {
        BandwidthRecord {
            country: country.to_string(),
            region: region.to_string(),
            download_kbps: down,
            upload_kbps: up,
        }
    }

    #[test]
    fn test_kbit_to_kib() {
        assert_eq!(kbit_to_kib(1000.0), 977);
        assert_eq!(kbit_to_kib(1024.0), 1000);
        assert_eq!(kbit_to_kib(0.0), 0);
    }

    #[test]
    fn test_kbit_to_kib_rounds_ties_away_from_zero() {
        // 64 * 1000 / 1024 == 62.5 exactly
        assert_eq!(kbit_to_kib(64.0), 63);
        // 192 * 1000 / 1024 == 187.5 exactly
        assert_eq!(kbit_to_kib(192.0), 188);
    }

    #[test]
    fn test_first_value_wins() {
        let table = aggregate_bandwidth(vec![
            record("US", "VA", 1024.0, 2048.0),
            record("US", "VA", 4096.0, 4096.0),
            record("DE", "BY", 1000.0, 500.0),
            record("DE", "HE", 9999.0, 9999.0),
        ])
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.download["USVA"], 1000);
        assert_eq!(table.upload["USVA"], 2000);
        assert_eq!(table.download["DE"], 977);
        assert_eq!(table.upload["DE"], 488);
    }

    #[test]
    fn test_negative_throughput_rejected() {
        let err = aggregate_bandwidth(vec![record("FR", "FR", -1.0, 10.0)]).unwrap_err();
        assert!(matches!(err, RecordError::InvalidThroughput { .. }));
    }

    #[test]
    fn test_non_finite_throughput_rejected() {
        for bad in [f64::INFINITY, f64::NAN, 1e300] {
            let err = aggregate_bandwidth(vec![record("US", "DC", bad, 10.0)]).unwrap_err();
            assert!(matches!(err, RecordError::InvalidThroughput { ref code, .. } if code == "USDC"));
        }

        let err = read_bandwidth("US,DC,inf,1e300\n".as_bytes()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RecordError>(),
            Some(RecordError::InvalidThroughput { .. })
        ));
    }

    #[test]
    fn test_read_bandwidth_csv() {
        let csv = "US,DC,1024,512\nFR,FR,2048,1024\n";
        let table = read_bandwidth(csv.as_bytes()).unwrap();

        assert_eq!(table.download["USDC"], 1000);
        assert_eq!(table.upload["USDC"], 500);
        assert_eq!(table.download["FR"], 2000);
        assert_eq!(table.upload["FR"], 1000);
    }

    #[test]
    fn test_read_bandwidth_rejects_garbage() {
        let csv = "US,DC,fast,512\n";
        assert!(read_bandwidth(csv.as_bytes()).is_err());
    }
}
