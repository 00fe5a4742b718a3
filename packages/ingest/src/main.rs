#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the HDB resale dataset tool.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use hdb_map_geocoder::CoordinateTable;
use hdb_map_ingest::{Dataset, build_dataset, refresh_dataset};
use hdb_map_source::registry::{all_resources, enabled_resources};
use hdb_map_source::{HttpDatastore, fetch};
use hdb_map_spatial::BoundaryIndex;

#[derive(Parser)]
#[command(name = "hdb_map_ingest", about = "HDB resale dataset tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch raw records from the datastore and write them to a JSON file
    Fetch {
        /// Output path for the raw records
        #[arg(long, default_value = "resale_raw.json")]
        out: PathBuf,
        /// Comma-separated resource ids (overrides `HDB_MAP_RESOURCES` env var)
        #[arg(long)]
        resources: Option<String>,
    },
    /// Full refresh: fetch, resolve planning areas, derive columns
    Refresh {
        /// Path to the address coordinate CSV
        #[arg(long)]
        coords: PathBuf,
        /// Path to the planning area boundary GeoJSON
        #[arg(long)]
        boundaries: PathBuf,
        /// Output path for the enriched dataset
        #[arg(long, default_value = "resale_dataset.json")]
        out: PathBuf,
        /// Comma-separated resource ids (overrides `HDB_MAP_RESOURCES` env var)
        #[arg(long)]
        resources: Option<String>,
    },
    /// Resolve a previously fetched raw JSON file without refetching
    Resolve {
        /// Raw records JSON file produced by `fetch`
        input: PathBuf,
        /// Path to the address coordinate CSV
        #[arg(long)]
        coords: PathBuf,
        /// Path to the planning area boundary GeoJSON
        #[arg(long)]
        boundaries: PathBuf,
        /// Output path for the enriched dataset
        #[arg(long, default_value = "resale_dataset.json")]
        out: PathBuf,
    },
    /// List the configured dataset resources
    Resources,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch { out, resources } => {
            let resources = enabled_resources(resources);
            let store = HttpDatastore::new()?;
            let raw = fetch::fetch_all(&store, &resources).await;
            std::fs::write(&out, serde_json::to_string(&raw)?)?;
            log::info!("Wrote {} raw records to {}", raw.len(), out.display());
        }
        Commands::Refresh {
            coords,
            boundaries,
            out,
            resources,
        } => {
            let resources = enabled_resources(resources);
            let coords = CoordinateTable::load(&coords)?;
            let boundaries = BoundaryIndex::load(&boundaries)?;
            let store = HttpDatastore::new()?;
            let dataset = refresh_dataset(&store, &resources, &coords, &boundaries).await;
            write_dataset(&dataset, &out)?;
        }
        Commands::Resolve {
            input,
            coords,
            boundaries,
            out,
        } => {
            let raw: Vec<serde_json::Value> =
                serde_json::from_str(&std::fs::read_to_string(&input)?)?;
            let coords = CoordinateTable::load(&coords)?;
            let boundaries = BoundaryIndex::load(&boundaries)?;
            let dataset = build_dataset(&raw, &coords, &boundaries);
            write_dataset(&dataset, &out)?;
        }
        Commands::Resources => {
            for resource in all_resources() {
                println!("{}  {}  ({})", resource.id, resource.label, resource.period);
            }
        }
    }

    Ok(())
}

fn write_dataset(dataset: &Dataset, out: &Path) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::write(out, serde_json::to_string(dataset)?)?;
    log::info!(
        "Wrote {} transactions ({} unique addresses, {} unresolved) to {}",
        dataset.transactions.len(),
        dataset.unique_addresses,
        dataset.unresolved_addresses,
        out.display()
    );
    Ok(())
}
