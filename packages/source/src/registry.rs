//! Resource registry — loads the dataset definitions from embedded TOML
//! configs.
//!
//! Each `.toml` file in `packages/source/resources/` is baked into the
//! binary at compile time via [`include_str!`]. When data.gov.sg splits
//! off a new period (as it did at 2012, 2015, and 2017), adding it is a
//! new TOML file plus one line below.

use crate::resource_def::{ResourceDefinition, parse_resource_toml};

/// TOML configs embedded at compile time, in reverse chronological
/// order. Registry order is fetch order.
const RESOURCE_TOMLS: &[(&str, &str)] = &[
    ("from_2017", include_str!("../resources/from_2017.toml")),
    ("2015_2016", include_str!("../resources/2015_2016.toml")),
    ("2012_2014", include_str!("../resources/2012_2014.toml")),
    ("2000_2012", include_str!("../resources/2000_2012.toml")),
];

/// Total number of configured resources (used in tests).
#[cfg(test)]
const EXPECTED_RESOURCE_COUNT: usize = 4;

/// Returns all configured resource definitions, parsed from embedded
/// TOML.
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time
/// guarantee since the configs are embedded).
#[must_use]
pub fn all_resources() -> Vec<ResourceDefinition> {
    RESOURCE_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_resource_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Returns the resources to fetch, filtered by the `--resources` CLI
/// flag or the `HDB_MAP_RESOURCES` environment variable. If neither is
/// set, all resources are returned.
#[must_use]
pub fn enabled_resources(cli_filter: Option<String>) -> Vec<ResourceDefinition> {
    let filter = cli_filter.or_else(|| std::env::var("HDB_MAP_RESOURCES").ok());

    let all = all_resources();

    let Some(filter_str) = filter else {
        return all;
    };

    let ids: Vec<&str> = filter_str.split(',').map(str::trim).collect();

    let filtered: Vec<ResourceDefinition> = all
        .into_iter()
        .filter(|r| ids.contains(&r.id.as_str()))
        .collect();

    if filtered.is_empty() {
        log::warn!(
            "No matching resources found for filter {:?}. Available: {}",
            ids,
            all_resources()
                .iter()
                .map(|r| r.id.clone())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    filtered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_all_resources() {
        let resources = all_resources();
        assert_eq!(resources.len(), EXPECTED_RESOURCE_COUNT);
    }

    #[test]
    fn resource_ids_are_unique() {
        let resources = all_resources();
        let mut ids: Vec<&str> = resources.iter().map(|r| r.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), EXPECTED_RESOURCE_COUNT);
    }

    #[test]
    fn all_resources_have_required_fields() {
        for resource in &all_resources() {
            assert!(!resource.id.is_empty(), "resource id is empty");
            assert!(!resource.label.is_empty(), "{}: no label", resource.id);
            assert!(!resource.period.is_empty(), "{}: no period", resource.id);
        }
    }

    #[test]
    fn filter_selects_a_single_resource() {
        let first = all_resources().remove(0);
        let filtered = enabled_resources(Some(first.id.clone()));
        assert_eq!(filtered, vec![first]);
    }

    #[test]
    fn unknown_filter_selects_nothing() {
        let filtered = enabled_resources(Some("not-a-resource".to_string()));
        assert!(filtered.is_empty());
    }
}
