//! Geo range table loading.

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use std::fs;
use std::path::Path;

use crate::error::RecordError;

/// An inclusive range of IPv4 addresses assigned to one country
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoRange {
    pub low: u32,
    pub high: u32,
    pub country: String,
}

impl GeoRange {
    pub fn contains(&self, value: u32) -> bool {
        self.low <= value && value <= self.high
    }
}

/// Ranges in file order. Lookups take the first match, so the order is kept
/// exactly as read: no sorting, no merging of overlaps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoTable {
    ranges: Vec<GeoRange>,
}

impl GeoTable {
    pub fn new(ranges: Vec<GeoRange>) -> Self {
        Self { ranges }
    }

    /// Parse the text form of the table.
    ///
    /// Lines starting with `#` and blank lines are skipped. Line numbers in
    /// errors are 1-based.
    pub fn parse(content: &str) -> Result<Self, RecordError> {
        let mut ranges = Vec::new();

        for (index, line) in content.lines().enumerate() {
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            ranges.push(parse_entry(index + 1, line.trim())?);
        }

        Ok(Self { ranges })
    }

    pub fn ranges(&self) -> &[GeoRange] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

fn parse_entry(line: usize, text: &str) -> Result<GeoRange, RecordError> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    if parts.len() < 3 {
        return Err(RecordError::GeoEntry {
            line,
            reason: format!("expected 'low,high,country', found '{}'", text),
        });
    }

    let bound = |value: &str| {
        value.parse::<u32>().map_err(|_| RecordError::GeoEntry {
            line,
            reason: format!("invalid range bound '{}'", value),
        })
    };

    Ok(GeoRange {
        low: bound(parts[0])?,
        high: bound(parts[1])?,
        country: parts[2].to_string(),
    })
}

/// Load the geo range table from a file
pub fn load_geo_table(path: &Path) -> Result<GeoTable> {
    info!("Loading geo range table from: {:?}", path);

    let content = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read geo table '{}'", path.display()))?;
    let table = GeoTable::parse(&content)
        .wrap_err_with(|| format!("Invalid geo table '{}'", path.display()))?;

    info!("Loaded {} geo ranges", table.len());
    Ok(table)
}
