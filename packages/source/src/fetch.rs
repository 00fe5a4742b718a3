//! Two-phase paginated fetch over the `datastore_search` protocol.
//!
//! The datastore caps uncounted requests at its default page size, but
//! reports the full record count in every envelope. Rather than guessing
//! a page size and walking offsets, each resource is fetched with a
//! 1-record probe to learn the total, then a single request for exactly
//! that many records.

use std::time::Duration;

use crate::{Datastore, SourceError};
use crate::resource_def::ResourceDefinition;

/// Courtesy delay before each resource fetch. The datastore has no
/// published rate limit, but sequential hammering gets throttled.
pub const INTER_RESOURCE_DELAY: Duration = Duration::from_secs(1);

/// Fetches every record of one datastore resource.
///
/// Phase one probes with `limit=1` to read the reported total; phase two
/// requests exactly that many records. An envelope with `success: false`
/// on either phase is an empty contribution, not an error.
///
/// # Errors
///
/// Returns [`SourceError`] if a request or envelope decode fails.
/// Callers treat that as "zero records contributed" and move on.
pub async fn fetch_resource(
    store: &dyn Datastore,
    resource: &ResourceDefinition,
) -> Result<Vec<serde_json::Value>, SourceError> {
    log::info!("First call to {} ({})", resource.id, resource.label);
    let probe = store.search(&resource.id, 1).await?;
    if !probe.success {
        log::warn!("{}: datastore reported failure on probe", resource.id);
        return Ok(Vec::new());
    }

    let total = probe.result.as_ref().map_or(0, |r| r.total);
    if total == 0 {
        log::info!("{}: no records reported", resource.label);
        return Ok(Vec::new());
    }

    log::info!("Second call, retrieving {total} records");
    let full = store.search(&resource.id, total).await?;
    if !full.success {
        log::warn!("{}: datastore reported failure on full page", resource.id);
        return Ok(Vec::new());
    }

    Ok(full.result.map(|r| r.records).unwrap_or_default())
}

/// Fetches all given resources sequentially and concatenates their
/// records.
///
/// A failed resource is logged and skipped; the rest still contribute.
/// The result may be empty, but the function itself never fails.
pub async fn fetch_all(
    store: &dyn Datastore,
    resources: &[ResourceDefinition],
) -> Vec<serde_json::Value> {
    let mut all_records = Vec::new();

    for resource in resources {
        tokio::time::sleep(INTER_RESOURCE_DELAY).await;
        match fetch_resource(store, resource).await {
            Ok(records) => {
                log::info!("{}: {} records", resource.label, records.len());
                all_records.extend(records);
            }
            Err(e) => {
                log::error!("{}: fetch failed, skipping: {e}", resource.id);
            }
        }
    }

    log::info!("Retrieval complete! {} records retrieved", all_records.len());
    all_records
}
