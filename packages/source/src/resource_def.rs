//! Config-driven datastore resource definition.
//!
//! Each dataset resource on data.gov.sg is described by a small TOML
//! config embedded at compile time (see [`crate::registry`]). The resale
//! history is split across resources by period, so a definition carries
//! the period it covers alongside the opaque resource id.

use serde::Deserialize;

/// One datastore resource covering a slice of the resale history.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResourceDefinition {
    /// Datastore resource id (a UUID assigned by data.gov.sg).
    pub id: String,
    /// Human-readable name for log messages.
    pub label: String,
    /// The period this resource covers (e.g., `"2015-01 to 2016-12"`).
    /// Periods are disjoint by construction of the upstream datasets.
    pub period: String,
}

/// Parses a resource definition from its TOML config.
///
/// # Errors
///
/// Returns a [`toml::de::Error`] if the config is malformed or missing
/// required fields.
pub fn parse_resource_toml(raw: &str) -> Result<ResourceDefinition, toml::de::Error> {
    toml::from_str(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_complete_definition() {
        let def = parse_resource_toml(
            r#"
            id = "f1765b54-a209-4718-8d38-a39237f502b3"
            label = "Resale flat prices from Jan 2017"
            period = "2017-01 onwards"
            "#,
        )
        .unwrap();
        assert_eq!(def.id, "f1765b54-a209-4718-8d38-a39237f502b3");
        assert_eq!(def.period, "2017-01 onwards");
    }

    #[test]
    fn missing_id_is_an_error() {
        let result = parse_resource_toml(
            r#"
            label = "Resale flat prices from Jan 2017"
            period = "2017-01 onwards"
            "#,
        );
        assert!(result.is_err());
    }
}
