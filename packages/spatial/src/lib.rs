#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Planning area boundary index.
//!
//! Loads the Master Plan planning-area polygons from a `GeoJSON` feature
//! collection at startup, builds an R-tree spatial index, and provides
//! point-in-polygon lookups for town attribution.
//!
//! The boundary file mixes two geometry shapes: plain `Polygon` features
//! and `MultiPolygon` features whose first part carries the area. The
//! loader normalizes both to a single exterior ring per feature; any
//! other shape fails loudly at load time, since it means the reference
//! dataset changed format.

use std::path::Path;
use std::sync::Arc;

use geo::{Contains, LineString, Polygon};
use geojson::GeoJson;
use rstar::{AABB, RTree, RTreeObject};

/// Feature property carrying the planning area name.
const NAME_PROPERTY: &str = "PLN_AREA_N";

/// Errors from loading the boundary file.
#[derive(Debug, thiserror::Error)]
pub enum BoundaryError {
    /// I/O error reading the boundary file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not parseable `GeoJSON`.
    #[error("GeoJSON parse error: {0}")]
    Geojson(#[from] geojson::Error),

    /// The top-level value is not a feature collection.
    #[error("boundary file is not a FeatureCollection")]
    NotAFeatureCollection,

    /// A feature is missing the planning area name property.
    #[error("feature {index} has no PLN_AREA_N property")]
    MissingName {
        /// Zero-based feature position in the file.
        index: usize,
    },

    /// A feature has no geometry, or one of an unrecognized shape.
    #[error("feature `{name}` has unsupported geometry: {kind}")]
    UnsupportedGeometry {
        /// Planning area name of the offending feature.
        name: String,
        /// The geometry type encountered.
        kind: &'static str,
    },

    /// A feature's exterior ring is empty or has malformed positions.
    #[error("feature `{name}` has a malformed exterior ring")]
    MalformedRing {
        /// Planning area name of the offending feature.
        name: String,
    },
}

/// Region lookup seam for the resolution pipeline.
///
/// Implemented by [`BoundaryIndex`]; test fakes implement it to count
/// queries.
pub trait RegionResolver {
    /// Returns the name of the region containing the point, if any.
    /// Coordinates are (longitude, latitude), matching the boundary
    /// file's convention.
    fn resolve_region(&self, lng: f64, lat: f64) -> Option<Arc<str>>;
}

/// A planning area polygon stored in the R-tree with its metadata.
#[derive(Debug)]
struct RegionEntry {
    name: Arc<str>,
    /// Position of the feature in the boundary file. Ties between
    /// overlapping regions resolve to the lowest order.
    order: usize,
    envelope: AABB<[f64; 2]>,
    polygon: Polygon<f64>,
}

impl RTreeObject for RegionEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Pre-built spatial index over the planning area boundaries.
///
/// Constructed once per process and shared read-only by all consumers.
#[derive(Debug)]
pub struct BoundaryIndex {
    regions: RTree<RegionEntry>,
    len: usize,
}

impl BoundaryIndex {
    /// Loads the boundary `GeoJSON` file at `path` and builds the index.
    ///
    /// # Errors
    ///
    /// Returns [`BoundaryError`] if the file cannot be read or any
    /// feature fails normalization. Boundary problems are structural
    /// reference-data errors and fatal at startup.
    pub fn load(path: &Path) -> Result<Self, BoundaryError> {
        let raw = std::fs::read_to_string(path)?;
        let index = Self::from_geojson_str(&raw)?;
        log::info!(
            "Loaded {} planning areas into boundary index from {}",
            index.len(),
            path.display()
        );
        Ok(index)
    }

    /// Builds the index from `GeoJSON` text. Used by [`Self::load`] and
    /// by tests injecting fixture collections.
    ///
    /// # Errors
    ///
    /// Returns [`BoundaryError`] if parsing or normalization fails.
    pub fn from_geojson_str(raw: &str) -> Result<Self, BoundaryError> {
        let GeoJson::FeatureCollection(collection) = raw.parse::<GeoJson>()? else {
            return Err(BoundaryError::NotAFeatureCollection);
        };

        let mut entries = Vec::with_capacity(collection.features.len());

        for (index, feature) in collection.features.iter().enumerate() {
            let name: Arc<str> = feature
                .property(NAME_PROPERTY)
                .and_then(serde_json::Value::as_str)
                .ok_or(BoundaryError::MissingName { index })?
                .into();

            let geometry = feature
                .geometry
                .as_ref()
                .ok_or_else(|| BoundaryError::UnsupportedGeometry {
                    name: name.to_string(),
                    kind: "none",
                })?;

            let ring = normalize_exterior_ring(&geometry.value, &name)?;
            let polygon = Polygon::new(ring, Vec::new());
            let envelope = compute_envelope(&polygon);

            entries.push(RegionEntry {
                name,
                order: index,
                envelope,
                polygon,
            });
        }

        let len = entries.len();
        Ok(Self {
            regions: RTree::bulk_load(entries),
            len,
        })
    }

    /// Returns the planning area containing the point, or `None` if the
    /// point falls outside every boundary.
    ///
    /// Coordinates are (longitude, latitude) — callers holding
    /// (latitude, longitude) transaction coordinates must swap.
    ///
    /// Regions are assumed non-overlapping; if they do overlap, the
    /// first containing region in file order wins.
    #[must_use]
    pub fn resolve(&self, lng: f64, lat: f64) -> Option<&str> {
        let point = geo::Point::new(lng, lat);
        let query_env = AABB::from_point([lng, lat]);

        self.regions
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.contains(&point))
            .min_by_key(|entry| entry.order)
            .map(|entry| &*entry.name)
    }

    /// Number of planning areas in the index.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the index holds no planning areas.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl RegionResolver for BoundaryIndex {
    fn resolve_region(&self, lng: f64, lat: f64) -> Option<Arc<str>> {
        let point = geo::Point::new(lng, lat);
        let query_env = AABB::from_point([lng, lat]);

        self.regions
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.contains(&point))
            .min_by_key(|entry| entry.order)
            .map(|entry| Arc::clone(&entry.name))
    }
}

/// Normalizes the two observed geometry shapes to one exterior ring:
/// `Polygon` → first ring; `MultiPolygon` → first ring of the first
/// part. Holes and further parts are not used for containment.
fn normalize_exterior_ring(
    value: &geojson::Value,
    name: &str,
) -> Result<LineString<f64>, BoundaryError> {
    let ring = match value {
        geojson::Value::Polygon(rings) => rings.first(),
        geojson::Value::MultiPolygon(parts) => parts.first().and_then(|rings| rings.first()),
        other => {
            return Err(BoundaryError::UnsupportedGeometry {
                name: name.to_string(),
                kind: geometry_kind(other),
            });
        }
    }
    .ok_or_else(|| BoundaryError::MalformedRing {
        name: name.to_string(),
    })?;

    if ring.len() < 3 {
        return Err(BoundaryError::MalformedRing {
            name: name.to_string(),
        });
    }

    let mut coords = Vec::with_capacity(ring.len());
    for position in ring {
        let (Some(&x), Some(&y)) = (position.first(), position.get(1)) else {
            return Err(BoundaryError::MalformedRing {
                name: name.to_string(),
            });
        };
        coords.push(geo::Coord { x, y });
    }

    Ok(LineString::from(coords))
}

/// The `GeoJSON` type name of a geometry value, for error messages.
const fn geometry_kind(value: &geojson::Value) -> &'static str {
    match value {
        geojson::Value::Point(_) => "Point",
        geojson::Value::MultiPoint(_) => "MultiPoint",
        geojson::Value::LineString(_) => "LineString",
        geojson::Value::MultiLineString(_) => "MultiLineString",
        geojson::Value::Polygon(_) => "Polygon",
        geojson::Value::MultiPolygon(_) => "MultiPolygon",
        geojson::Value::GeometryCollection(_) => "GeometryCollection",
    }
}

/// Compute the bounding box envelope for a [`Polygon`].
fn compute_envelope(polygon: &Polygon<f64>) -> AABB<[f64; 2]> {
    use geo::BoundingRect;

    polygon.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two-feature fixture: "ANG MO KIO" as a plain `Polygon` around
    /// (103.845, 1.369) and "BEDOK" as a single-part `MultiPolygon`.
    const FIXTURE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "PLN_AREA_N": "ANG MO KIO" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[
                        [103.82, 1.35], [103.87, 1.35],
                        [103.87, 1.39], [103.82, 1.39],
                        [103.82, 1.35]
                    ]]
                }
            },
            {
                "type": "Feature",
                "properties": { "PLN_AREA_N": "BEDOK" },
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [[[
                        [103.91, 1.31], [103.96, 1.31],
                        [103.96, 1.34], [103.91, 1.34],
                        [103.91, 1.31]
                    ]]]
                }
            }
        ]
    }"#;

    #[test]
    fn loads_both_geometry_shapes() {
        let index = BoundaryIndex::from_geojson_str(FIXTURE).unwrap();
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn resolves_point_inside_polygon_feature() {
        let index = BoundaryIndex::from_geojson_str(FIXTURE).unwrap();
        assert_eq!(index.resolve(103.845, 1.369), Some("ANG MO KIO"));
    }

    #[test]
    fn resolves_point_inside_multipolygon_feature() {
        let index = BoundaryIndex::from_geojson_str(FIXTURE).unwrap();
        assert_eq!(index.resolve(103.93, 1.32), Some("BEDOK"));
    }

    #[test]
    fn point_outside_every_region_is_none() {
        let index = BoundaryIndex::from_geojson_str(FIXTURE).unwrap();
        assert_eq!(index.resolve(104.5, 1.0), None);
    }

    #[test]
    fn coordinates_are_lng_lat_order() {
        let index = BoundaryIndex::from_geojson_str(FIXTURE).unwrap();
        // Swapped arguments must miss: (1.369, 103.845) is nowhere near
        // the fixture boundaries.
        assert_eq!(index.resolve(1.369, 103.845), None);
    }

    #[test]
    fn overlapping_regions_resolve_to_first_in_file_order() {
        let overlapping = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": { "PLN_AREA_N": "FIRST" },
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[
                            [0.0, 0.0], [2.0, 0.0], [2.0, 2.0],
                            [0.0, 2.0], [0.0, 0.0]
                        ]]
                    }
                },
                {
                    "type": "Feature",
                    "properties": { "PLN_AREA_N": "SECOND" },
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[
                            [1.0, 1.0], [3.0, 1.0], [3.0, 3.0],
                            [1.0, 3.0], [1.0, 1.0]
                        ]]
                    }
                }
            ]
        }"#;
        let index = BoundaryIndex::from_geojson_str(overlapping).unwrap();
        // (1.5, 1.5) sits inside both squares.
        assert_eq!(index.resolve(1.5, 1.5), Some("FIRST"));
    }

    #[test]
    fn unrecognized_geometry_shape_fails_loudly() {
        let bad = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": { "PLN_AREA_N": "RIVER" },
                    "geometry": {
                        "type": "LineString",
                        "coordinates": [[103.8, 1.3], [103.9, 1.4]]
                    }
                }
            ]
        }"#;
        let err = BoundaryIndex::from_geojson_str(bad).unwrap_err();
        assert!(matches!(
            err,
            BoundaryError::UnsupportedGeometry {
                kind: "LineString",
                ..
            }
        ));
    }

    #[test]
    fn missing_name_property_fails_loudly() {
        let bad = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {},
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[
                            [0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]
                        ]]
                    }
                }
            ]
        }"#;
        let err = BoundaryIndex::from_geojson_str(bad).unwrap_err();
        assert!(matches!(err, BoundaryError::MissingName { index: 0 }));
    }

    #[test]
    fn non_feature_collection_fails_loudly() {
        let err = BoundaryIndex::from_geojson_str(r#"{"type": "Point", "coordinates": [0, 0]}"#)
            .unwrap_err();
        assert!(matches!(err, BoundaryError::NotAFeatureCollection));
    }

    #[test]
    fn resolving_twice_is_deterministic() {
        let index = BoundaryIndex::from_geojson_str(FIXTURE).unwrap();
        assert_eq!(
            index.resolve(103.845, 1.369),
            index.resolve(103.845, 1.369)
        );
    }
}
