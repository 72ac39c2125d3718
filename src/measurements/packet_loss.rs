//! Packet-loss aggregation.
//!
//! Reads the per-region network-quality export. Loss is recorded in percent
//! and stored as a fraction that must lie strictly between 0 and 1. Jitter
//! and latency columns are decoded for validation but otherwise unused.

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{debug, info};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::region::region_code;
use super::types::{PacketLossRecord, PacketLossTable};
use crate::error::RecordError;

/// Fold loss records into a table, keeping the first fraction per region code.
///
/// A record of exactly 0% or 100% loss is rejected rather than clamped.
pub fn aggregate_packet_loss<I>(records: I) -> Result<PacketLossTable, RecordError>
where
    I: IntoIterator<Item = PacketLossRecord>,
{
    let mut fractions = BTreeMap::new();

    for record in records {
        let code = region_code(&record.country, &record.region);
        let fraction = record.packet_loss_percent / 100.0;

        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(RecordError::LossOutOfRange { code, fraction });
        }

        if fractions.contains_key(&code) {
            debug!("Ignoring duplicate packet-loss entry for region {}", code);
            continue;
        }
        fractions.insert(code, fraction);
    }

    if fractions.is_empty() {
        return Err(RecordError::NoLossRecords);
    }

    let mean = fractions.values().sum::<f64>() / fractions.len() as f64;
    Ok(PacketLossTable { fractions, mean })
}

/// Significant digits kept when a loss fraction is written out
const FRACTION_DIGITS: i32 = 12;

fn trim_zeros(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// Render a loss fraction with 12 significant digits and no trailing zeros,
/// in exponent form below 1e-4 (`0.00466666666667`, `1e-05`).
pub fn format_fraction(value: f64) -> String {
    let scientific = format!("{:.*e}", (FRACTION_DIGITS - 1) as usize, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return scientific;
    };

    if (-4..FRACTION_DIGITS).contains(&exponent) {
        let decimals = (FRACTION_DIGITS - 1 - exponent).max(0) as usize;
        trim_zeros(&format!("{:.*}", decimals, value)).to_string()
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_zeros(mantissa), sign, exponent.abs())
    }
}

/// Decode headerless packet-loss CSV rows from a reader
pub fn read_packet_loss<R: Read>(reader: R) -> Result<PacketLossTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let records = csv_reader
        .deserialize::<PacketLossRecord>()
        .collect::<Result<Vec<_>, _>>()
        .wrap_err("Failed to decode packet-loss record")?;

    Ok(aggregate_packet_loss(records)?)
}

/// Load the packet-loss table from a CSV file
pub fn load_packet_loss(path: &Path) -> Result<PacketLossTable> {
    info!("Loading packet-loss measurements from: {:?}", path);

    let file = File::open(path)
        .wrap_err_with(|| format!("Failed to open packet-loss file '{}'", path.display()))?;
    let table = read_packet_loss(file)
        .wrap_err_with(|| format!("Invalid packet-loss file '{}'", path.display()))?;

    info!(
        "Loaded packet loss for {} region codes (mean {:.6})",
        table.fractions.len(),
        table.mean
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(country: &str, region: &str, percent: f64) -> PacketLossRecord {
        PacketLossRecord {
            country: country.to_string(),
            region: region.to_string(),
            jitter: 1.5,
            packet_loss_percent: percent,
            latency: 40.0,
        }
    }

    #[test]
    fn test_percent_to_fraction() {
        let table = aggregate_packet_loss(vec![record("FR", "FR", 50.0)]).unwrap();
        assert_eq!(table.fractions["FR"], 0.5);
        assert_eq!(table.mean, 0.5);
    }

    #[test]
    fn test_zero_loss_rejected() {
        let err = aggregate_packet_loss(vec![record("FR", "FR", 0.0)]).unwrap_err();
        assert_eq!(
            err,
            RecordError::LossOutOfRange {
                code: "FR".to_string(),
                fraction: 0.0
            }
        );
    }

    #[test]
    fn test_total_loss_rejected() {
        let err = aggregate_packet_loss(vec![record("US", "VA", 100.0)]).unwrap_err();
        assert!(matches!(err, RecordError::LossOutOfRange { .. }));
    }

    #[test]
    fn test_bad_record_aborts_after_good_ones() {
        let result = aggregate_packet_loss(vec![
            record("FR", "FR", 1.0),
            record("DE", "DE", 150.0),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_first_value_wins_and_mean() {
        let table = aggregate_packet_loss(vec![
            record("US", "VA", 1.0),
            record("US", "VA", 90.0),
            record("DE", "DE", 3.0),
        ])
        .unwrap();

        assert_eq!(table.fractions.len(), 2);
        assert_eq!(table.fractions["USVA"], 0.01);
        assert_eq!(table.fractions["DE"], 0.03);
        assert!((table.mean - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_fraction_or_mean() {
        let table = aggregate_packet_loss(vec![
            record("FR", "FR", 2.0),
            record("DE", "DE", 4.0),
        ])
        .unwrap();

        assert_eq!(table.fraction_or_mean("FR"), 0.02);
        assert!((table.fraction_or_mean("JP") - 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_empty_source_rejected() {
        let err = aggregate_packet_loss(Vec::new()).unwrap_err();
        assert_eq!(err, RecordError::NoLossRecords);
    }

    #[test]
    fn test_format_fraction() {
        assert_eq!(format_fraction(0.5), "0.5");
        assert_eq!(format_fraction(0.001), "0.001");
        assert_eq!(format_fraction(0.3 / 100.0), "0.003");
        assert_eq!(format_fraction(0.014 / 3.0), "0.00466666666667");
        assert_eq!(format_fraction(2.0 / 3.0), "0.666666666667");
        assert_eq!(format_fraction(0.000123456789012345), "0.000123456789012");
        assert_eq!(format_fraction(0.00001), "1e-05");
    }

    #[test]
    fn test_read_packet_loss_csv() {
        let csv = "US,MD,2.1,50.0,31.0\nCA,CA,1.0,0.5,20.0\n";
        let table = read_packet_loss(csv.as_bytes()).unwrap();

        assert_eq!(table.fractions["USMD"], 0.5);
        assert_eq!(table.fractions["CA"], 0.005);
    }
}
