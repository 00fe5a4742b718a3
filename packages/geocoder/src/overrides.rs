//! Manual coordinate overrides for addresses `OneMap` no longer knows.
//!
//! Blocks reacquired by the state under SERS (e.g., Woodlands Centre
//! Road) still appear in the historical transaction data but have been
//! dropped from the geocoding API. Their approximate locations are
//! maintained by hand in `overrides.toml`, embedded at compile time the
//! same way as the resource registry.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::Coordinates;

/// Override entries embedded at compile time.
const OVERRIDES_TOML: &str = include_str!("../overrides.toml");

#[derive(Debug, Deserialize)]
struct OverrideFile {
    entries: Vec<OverrideEntry>,
}

#[derive(Debug, Deserialize)]
struct OverrideEntry {
    address: String,
    latitude: f64,
    longitude: f64,
}

/// Returns the manual override layer, keyed by exact address string.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed (this is a compile-time
/// guarantee since the config is embedded).
#[must_use]
pub fn manual_overrides() -> BTreeMap<String, Coordinates> {
    let file: OverrideFile = toml::from_str(OVERRIDES_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse overrides.toml: {e}"));

    file.entries
        .into_iter()
        .map(|entry| {
            (
                entry.address,
                Coordinates {
                    latitude: entry.latitude,
                    longitude: entry.longitude,
                },
            )
        })
        .collect()
}
