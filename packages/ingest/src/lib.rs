#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Address resolution pipeline for the HDB resale dataset.
//!
//! Turns raw datastore records into [`EnrichedTransaction`]s: parses and
//! validates each record, resolves every unique address to its planning
//! area through the coordinate table and boundary index, joins the
//! resolved towns back onto the full record set, and derives the
//! analytic columns (remaining lease, price per square meter) with
//! narrowed storage types.
//!
//! No single bad record or unresolvable address aborts a refresh: bad
//! records are logged and skipped, unresolvable addresses propagate as
//! missing towns.

pub mod dataset;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use hdb_map_geocoder::CoordinateTable;
use hdb_map_resale_models::{EnrichedTransaction, ResaleRecord};
use hdb_map_source::resource_def::ResourceDefinition;
use hdb_map_source::{Datastore, fetch};
use hdb_map_spatial::RegionResolver;
use serde::{Deserialize, Serialize};

/// HDB leases run 99 years from commencement.
const LEASE_YEARS: i32 = 99;

/// The enriched dataset handed to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    /// When this dataset was built.
    pub built_at: DateTime<Utc>,
    /// Unique addresses seen across all transactions.
    pub unique_addresses: usize,
    /// Unique addresses that resolved to no planning area.
    pub unresolved_addresses: usize,
    /// All enriched transactions, in fetch order.
    pub transactions: Vec<EnrichedTransaction>,
}

/// Parses raw datastore records, logging and skipping malformed ones.
#[must_use]
pub fn parse_records(raw: &[serde_json::Value]) -> Vec<ResaleRecord> {
    let mut records = Vec::with_capacity(raw.len());
    let mut skipped: usize = 0;

    for value in raw {
        match ResaleRecord::from_api_record(value) {
            Ok(record) => records.push(record),
            Err(e) => {
                skipped += 1;
                log::warn!("Skipping malformed record: {e}");
            }
        }
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} of {} raw records", raw.len());
    }
    records
}

/// Builds the address → planning area map for all unique addresses in
/// `records`.
///
/// Resolution work happens at most once per unique address, not once
/// per transaction: regions number in the dozens while transactions
/// number in the hundreds of thousands. An address with no known
/// coordinate, or whose coordinate falls outside every boundary, maps
/// to `None`.
#[must_use]
pub fn resolve_towns(
    records: &[ResaleRecord],
    coords: &CoordinateTable,
    resolver: &impl RegionResolver,
) -> BTreeMap<String, Option<Arc<str>>> {
    let addresses: BTreeSet<String> = records.iter().map(ResaleRecord::address).collect();

    let mut town_map = BTreeMap::new();
    let mut unresolved: usize = 0;

    for address in addresses {
        // The coordinate table stores (latitude, longitude); the
        // boundary index speaks (longitude, latitude).
        let town = coords
            .lookup(&address)
            .and_then(|c| resolver.resolve_region(c.longitude, c.latitude));
        if town.is_none() {
            unresolved += 1;
        }
        town_map.insert(address, town);
    }

    log::info!(
        "Resolved {} unique addresses ({unresolved} unresolved)",
        town_map.len()
    );
    town_map
}

/// Joins resolved towns and coordinates back onto every record and
/// derives the analytic columns.
///
/// Records whose month fails to parse or whose numeric fields fall
/// outside their narrowed ranges are logged and dropped; everything
/// else flows through, unresolved towns included.
#[must_use]
pub fn enrich(
    records: &[ResaleRecord],
    town_map: &BTreeMap<String, Option<Arc<str>>>,
    coords: &CoordinateTable,
) -> Vec<EnrichedTransaction> {
    let mut interner: BTreeMap<String, Arc<str>> = BTreeMap::new();
    let mut transactions = Vec::with_capacity(records.len());

    for record in records {
        let Some(transaction) = enrich_one(record, town_map, coords, &mut interner) else {
            continue;
        };
        transactions.push(transaction);
    }

    log::info!(
        "Enriched {} of {} transactions",
        transactions.len(),
        records.len()
    );
    transactions
}

/// Derives one enriched transaction, or `None` (logged) if the record
/// cannot be represented.
#[allow(clippy::cast_possible_truncation)]
fn enrich_one(
    record: &ResaleRecord,
    town_map: &BTreeMap<String, Option<Arc<str>>>,
    coords: &CoordinateTable,
    interner: &mut BTreeMap<String, Arc<str>>,
) -> Option<EnrichedTransaction> {
    let date = match record.transaction_date() {
        Ok(date) => date,
        Err(e) => {
            log::warn!("Dropping record: {e}");
            return None;
        }
    };
    let Ok(year) = u16::try_from(date.year()) else {
        log::warn!("Dropping record with out-of-range year {}", date.year());
        return None;
    };

    let remaining = i32::from(record.lease_commence_date) + LEASE_YEARS - i32::from(year);
    let Ok(remaining_lease) = i16::try_from(remaining) else {
        log::warn!(
            "Dropping record with out-of-range remaining lease {remaining} ({})",
            record.address()
        );
        return None;
    };

    let Ok(resale_price) = i32::try_from(record.resale_price) else {
        log::warn!(
            "Dropping record with out-of-range price {} ({})",
            record.resale_price,
            record.address()
        );
        return None;
    };

    if record.floor_area_sqm < 1.0 || record.floor_area_sqm > f64::from(i16::MAX) {
        log::warn!(
            "Dropping record with implausible floor area {} ({})",
            record.floor_area_sqm,
            record.address()
        );
        return None;
    }
    // Truncation toward zero, same as the display convention.
    let floor_area_sqm = record.floor_area_sqm as i16;

    let address = record.address();
    let coordinates = coords.lookup(&address);
    let town = town_map.get(&address).cloned().flatten();

    let price_per_sqm = (f64::from(resale_price) / record.floor_area_sqm) as f32;

    Some(EnrichedTransaction {
        date,
        year,
        town_original: intern(interner, &record.town),
        town,
        flat_type: record.flat_type,
        flat_model: intern(interner, &record.flat_model),
        storey_range: intern(interner, &record.storey_range),
        address: intern(interner, &address),
        latitude: coordinates.map(|c| c.latitude as f32),
        longitude: coordinates.map(|c| c.longitude as f32),
        floor_area_sqm,
        remaining_lease,
        resale_price,
        price_per_sqm,
    })
}

/// Returns the shared copy of `value`, allocating it on first sight.
/// Category columns repeat a few hundred distinct strings across
/// hundreds of thousands of rows.
fn intern(cache: &mut BTreeMap<String, Arc<str>>, value: &str) -> Arc<str> {
    if let Some(existing) = cache.get(value) {
        return Arc::clone(existing);
    }
    let shared: Arc<str> = value.into();
    cache.insert(value.to_string(), Arc::clone(&shared));
    shared
}

/// Builds an enriched dataset from already-fetched raw records.
#[must_use]
pub fn build_dataset(
    raw: &[serde_json::Value],
    coords: &CoordinateTable,
    resolver: &impl RegionResolver,
) -> Dataset {
    let records = parse_records(raw);
    let town_map = resolve_towns(&records, coords, resolver);
    let unresolved_addresses = town_map.values().filter(|town| town.is_none()).count();
    let transactions = enrich(&records, &town_map, coords);

    Dataset {
        built_at: Utc::now(),
        unique_addresses: town_map.len(),
        unresolved_addresses,
        transactions,
    }
}

/// Runs the full refresh: fetch every resource, then parse, resolve,
/// and enrich. Fetch failures degrade to partial data rather than
/// aborting (see [`fetch::fetch_all`]).
pub async fn refresh_dataset(
    store: &dyn Datastore,
    resources: &[ResourceDefinition],
    coords: &CoordinateTable,
    resolver: &impl RegionResolver,
) -> Dataset {
    let raw = fetch::fetch_all(store, resources).await;
    build_dataset(&raw, coords, resolver)
}
