#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Address to coordinate lookup for HDB blocks.
//!
//! Every block address appearing in the resale datasets was geocoded
//! once through the `OneMap` API and frozen into a reference CSV keyed by
//! the exact `"{block} {street_name}"` string. [`CoordinateTable`] loads
//! that CSV once per process.
//!
//! Blocks reacquired by the state under SERS have been removed from
//! `OneMap` entirely, so their approximate coordinates are maintained by
//! hand in [`overrides`] and layered in front of the primary table.

pub mod overrides;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

/// A latitude/longitude pair (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Coordinates {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

/// Errors from loading the coordinate reference table.
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    /// I/O error reading the reference file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing failed.
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),
}

/// One row of the reference CSV.
#[derive(Debug, Deserialize)]
struct CoordRow {
    address: String,
    latitude: f64,
    longitude: f64,
}

/// Static address → coordinate mapping, loaded once per process.
///
/// Lookups check the manual override layer before the primary table, so
/// a hand-maintained entry always wins over a stale geocode.
pub struct CoordinateTable {
    overrides: BTreeMap<String, Coordinates>,
    primary: BTreeMap<String, Coordinates>,
}

impl CoordinateTable {
    /// Loads the reference CSV at `path` (columns
    /// `address,latitude,longitude`).
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the file cannot be read or a row is
    /// malformed. A broken reference table is a startup failure, not a
    /// per-address condition.
    pub fn load(path: &Path) -> Result<Self, GeocodeError> {
        let table = Self::from_reader(File::open(path)?)?;
        log::info!(
            "Loaded {} address coordinates from {}",
            table.primary.len(),
            path.display()
        );
        Ok(table)
    }

    /// Builds the table from any CSV reader. Used by [`Self::load`] and
    /// by tests injecting fixture data.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if a row cannot be parsed.
    pub fn from_reader(reader: impl Read) -> Result<Self, GeocodeError> {
        let mut primary = BTreeMap::new();
        let mut csv_reader = csv::Reader::from_reader(reader);
        for row in csv_reader.deserialize() {
            let row: CoordRow = row?;
            primary.insert(
                row.address,
                Coordinates {
                    latitude: row.latitude,
                    longitude: row.longitude,
                },
            );
        }

        Ok(Self {
            overrides: overrides::manual_overrides(),
            primary,
        })
    }

    /// Looks up the coordinate for an exact address string.
    ///
    /// Absent addresses resolve to `None`; an address the geocoder never
    /// knew is a missing value downstream, never an error.
    #[must_use]
    pub fn lookup(&self, address: &str) -> Option<Coordinates> {
        self.overrides
            .get(address)
            .or_else(|| self.primary.get(address))
            .copied()
    }

    /// Number of addresses in the primary table (overrides excluded).
    #[must_use]
    pub fn len(&self) -> usize {
        self.primary.len()
    }

    /// Whether the primary table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE_CSV: &str = "\
address,latitude,longitude
123 ANG MO KIO AVE 3,1.369,103.845
456 BEDOK NTH ST 1,1.3278,103.9311
";

    #[test]
    fn looks_up_known_address() {
        let table = CoordinateTable::from_reader(FIXTURE_CSV.as_bytes()).unwrap();
        let coords = table.lookup("123 ANG MO KIO AVE 3").unwrap();
        assert!((coords.latitude - 1.369).abs() < f64::EPSILON);
        assert!((coords.longitude - 103.845).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_address_is_none() {
        let table = CoordinateTable::from_reader(FIXTURE_CSV.as_bytes()).unwrap();
        assert!(table.lookup("999 NOWHERE RD").is_none());
    }

    #[test]
    fn override_layer_resolves_reacquired_blocks() {
        let table = CoordinateTable::from_reader(FIXTURE_CSV.as_bytes()).unwrap();
        // Not in the CSV fixture at all; resolved from the manual layer.
        assert!(table.lookup("1A WOODLANDS CENTRE ROAD").is_some());
    }

    #[test]
    fn override_wins_over_primary_entry() {
        let csv = "\
address,latitude,longitude
1A WOODLANDS CENTRE ROAD,0.0,0.0
";
        let table = CoordinateTable::from_reader(csv.as_bytes()).unwrap();
        let coords = table.lookup("1A WOODLANDS CENTRE ROAD").unwrap();
        assert!(coords.latitude > 1.0, "manual entry should shadow the CSV");
    }

    #[test]
    fn malformed_row_is_a_load_error() {
        let csv = "\
address,latitude,longitude
123 ANG MO KIO AVE 3,not-a-number,103.845
";
        assert!(CoordinateTable::from_reader(csv.as_bytes()).is_err());
    }
}
