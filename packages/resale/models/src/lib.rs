#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Canonical HDB resale transaction record types.
//!
//! Every dataset resource on the datastore API produces [`ResaleRecord`]s
//! after per-record parsing, and the resolution pipeline turns those into
//! [`EnrichedTransaction`]s with derived columns and narrowed storage
//! types.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// HDB flat type taxonomy, as reported by the resale datasets.
///
/// The pre-2012 datasets spell multi-generation flats without the hyphen;
/// both spellings parse to the same variant.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum FlatType {
    /// 1 Room flat
    #[serde(rename = "1 ROOM")]
    #[strum(serialize = "1 ROOM")]
    OneRoom,
    /// 2 Room flat
    #[serde(rename = "2 ROOM")]
    #[strum(serialize = "2 ROOM")]
    TwoRoom,
    /// 3 Room flat
    #[serde(rename = "3 ROOM")]
    #[strum(serialize = "3 ROOM")]
    ThreeRoom,
    /// 4 Room flat
    #[serde(rename = "4 ROOM")]
    #[strum(serialize = "4 ROOM")]
    FourRoom,
    /// 5 Room flat
    #[serde(rename = "5 ROOM")]
    #[strum(serialize = "5 ROOM")]
    FiveRoom,
    /// Executive flat
    #[serde(rename = "EXECUTIVE")]
    #[strum(serialize = "EXECUTIVE")]
    Executive,
    /// Multi-generation flat
    #[serde(rename = "MULTI-GENERATION", alias = "MULTI GENERATION")]
    #[strum(to_string = "MULTI-GENERATION", serialize = "MULTI GENERATION")]
    MultiGeneration,
}

/// Errors from parsing a raw datastore record.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// The record is not a JSON object.
    #[error("record is not a JSON object")]
    NotAnObject,

    /// A required field is absent.
    #[error("missing field `{field}`")]
    MissingField {
        /// Name of the absent field.
        field: &'static str,
    },

    /// A field is present but cannot be parsed.
    #[error("invalid value {value:?} for field `{field}`")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// The raw value as reported by the API.
        value: String,
    },
}

/// One resale transaction as reported by the datastore API.
///
/// Field values arrive as JSON strings even when numeric, so
/// [`ResaleRecord::from_api_record`] accepts both representations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResaleRecord {
    /// Transaction month in `YYYY-MM` form.
    pub month: String,
    /// Town as reported by the source (not the resolved planning area).
    pub town: String,
    /// Flat type category.
    pub flat_type: FlatType,
    /// Block identifier (e.g., `"123"` or `"1A"`).
    pub block: String,
    /// Street name (e.g., `"ANG MO KIO AVE 3"`).
    pub street_name: String,
    /// Storey range bucket (e.g., `"01 TO 03"`).
    pub storey_range: String,
    /// Floor area in square meters.
    pub floor_area_sqm: f64,
    /// Flat model category (e.g., `"New Generation"`).
    pub flat_model: String,
    /// Year the 99-year lease commenced.
    pub lease_commence_date: u16,
    /// Resale price in whole Singapore dollars.
    pub resale_price: u32,
}

impl ResaleRecord {
    /// Parses one record object from a datastore search response.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] if a required field is missing or
    /// unparseable. Bad records are expected to be skipped (and logged)
    /// by the caller, never to abort a refresh.
    pub fn from_api_record(value: &serde_json::Value) -> Result<Self, RecordError> {
        if !value.is_object() {
            return Err(RecordError::NotAnObject);
        }

        let flat_type_raw = str_field(value, "flat_type")?;
        let flat_type = flat_type_raw
            .parse::<FlatType>()
            .map_err(|_| RecordError::InvalidField {
                field: "flat_type",
                value: flat_type_raw.to_string(),
            })?;

        let floor_area_sqm = f64_field(value, "floor_area_sqm")?;

        let lease_commence = f64_field(value, "lease_commence_date")?;
        let lease_commence_date =
            to_u16(lease_commence).ok_or_else(|| RecordError::InvalidField {
                field: "lease_commence_date",
                value: lease_commence.to_string(),
            })?;

        let price = f64_field(value, "resale_price")?;
        let resale_price = to_u32(price).ok_or_else(|| RecordError::InvalidField {
            field: "resale_price",
            value: price.to_string(),
        })?;

        Ok(Self {
            month: str_field(value, "month")?.to_string(),
            town: str_field(value, "town")?.to_string(),
            flat_type,
            block: str_field(value, "block")?.to_string(),
            street_name: str_field(value, "street_name")?.to_string(),
            storey_range: str_field(value, "storey_range")?.to_string(),
            floor_area_sqm,
            flat_model: str_field(value, "flat_model")?.to_string(),
            lease_commence_date,
            resale_price,
        })
    }

    /// The lookup address for this transaction: block and street name,
    /// space-joined (e.g., `"123 ANG MO KIO AVE 3"`).
    #[must_use]
    pub fn address(&self) -> String {
        format!("{} {}", self.block, self.street_name)
    }

    /// The transaction month as a date (first day of the month).
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::InvalidField`] if `month` is not `YYYY-MM`.
    pub fn transaction_date(&self) -> Result<NaiveDate, RecordError> {
        NaiveDate::parse_from_str(&format!("{}-01", self.month), "%Y-%m-%d").map_err(|_| {
            RecordError::InvalidField {
                field: "month",
                value: self.month.clone(),
            }
        })
    }
}

/// One resale transaction with derived columns and narrowed storage
/// types.
///
/// Repeated strings (address, categories, resolved town) are shared
/// `Arc<str>`s interned once per dataset build, so hundreds of thousands
/// of transactions reference a few hundred distinct allocations. Numeric
/// columns are narrowed to the smallest representation that preserves
/// display precision: prices fit `i32` exactly, areas and lease years
/// fit `i16`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedTransaction {
    /// Transaction date (first day of the transaction month).
    pub date: NaiveDate,
    /// Transaction year.
    pub year: u16,
    /// Town as reported by the source.
    pub town_original: Arc<str>,
    /// Planning area resolved from the boundary index. `None` when the
    /// address has no known coordinate or falls outside every boundary.
    pub town: Option<Arc<str>>,
    /// Flat type category.
    pub flat_type: FlatType,
    /// Flat model category.
    pub flat_model: Arc<str>,
    /// Storey range bucket.
    pub storey_range: Arc<str>,
    /// Block + street name lookup address.
    pub address: Arc<str>,
    /// Latitude (WGS84). `None` when the address has no known coordinate.
    pub latitude: Option<f32>,
    /// Longitude (WGS84). `None` when the address has no known coordinate.
    pub longitude: Option<f32>,
    /// Floor area in whole square meters.
    pub floor_area_sqm: i16,
    /// Remaining lease in whole years at transaction time
    /// (commencement year + 99 − transaction year).
    pub remaining_lease: i16,
    /// Resale price in whole Singapore dollars.
    pub resale_price: i32,
    /// Resale price divided by floor area.
    pub price_per_sqm: f32,
}

/// Reads a string field, accepting bare JSON numbers for tolerance.
fn str_field<'a>(value: &'a serde_json::Value, field: &'static str) -> Result<&'a str, RecordError> {
    value
        .get(field)
        .ok_or(RecordError::MissingField { field })?
        .as_str()
        .ok_or_else(|| RecordError::InvalidField {
            field,
            value: value[field].to_string(),
        })
}

/// Reads a numeric field reported either as a JSON number or as a string
/// (the datastore API stringifies all values).
fn f64_field(value: &serde_json::Value, field: &'static str) -> Result<f64, RecordError> {
    let raw = value.get(field).ok_or(RecordError::MissingField { field })?;
    match raw {
        serde_json::Value::Number(n) => n.as_f64().ok_or_else(|| RecordError::InvalidField {
            field,
            value: raw.to_string(),
        }),
        serde_json::Value::String(s) => {
            s.trim()
                .parse::<f64>()
                .map_err(|_| RecordError::InvalidField {
                    field,
                    value: s.clone(),
                })
        }
        _ => Err(RecordError::InvalidField {
            field,
            value: raw.to_string(),
        }),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u16(v: f64) -> Option<u16> {
    if v.is_finite() && v >= 0.0 && v <= f64::from(u16::MAX) && v.fract() == 0.0 {
        Some(v as u16)
    } else {
        None
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u32(v: f64) -> Option<u32> {
    let rounded = v.round();
    if v.is_finite() && rounded >= 0.0 && rounded <= f64::from(u32::MAX) {
        Some(rounded as u32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_flat_type_canonical_spellings() {
        assert_eq!("4 ROOM".parse::<FlatType>().unwrap(), FlatType::FourRoom);
        assert_eq!(
            "EXECUTIVE".parse::<FlatType>().unwrap(),
            FlatType::Executive
        );
    }

    #[test]
    fn parses_both_multi_generation_spellings() {
        assert_eq!(
            "MULTI-GENERATION".parse::<FlatType>().unwrap(),
            FlatType::MultiGeneration
        );
        assert_eq!(
            "MULTI GENERATION".parse::<FlatType>().unwrap(),
            FlatType::MultiGeneration
        );
    }

    #[test]
    fn flat_type_displays_canonical_form() {
        assert_eq!(FlatType::MultiGeneration.to_string(), "MULTI-GENERATION");
        assert_eq!(FlatType::OneRoom.to_string(), "1 ROOM");
    }

    fn sample_record() -> serde_json::Value {
        json!({
            "_id": 1,
            "month": "2017-01",
            "town": "ANG MO KIO",
            "flat_type": "3 ROOM",
            "block": "123",
            "street_name": "ANG MO KIO AVE 3",
            "storey_range": "01 TO 03",
            "floor_area_sqm": "67",
            "flat_model": "New Generation",
            "lease_commence_date": "1986",
            "resale_price": "280000"
        })
    }

    #[test]
    fn parses_api_record_with_stringified_numbers() {
        let record = ResaleRecord::from_api_record(&sample_record()).unwrap();
        assert_eq!(record.month, "2017-01");
        assert_eq!(record.flat_type, FlatType::ThreeRoom);
        assert!((record.floor_area_sqm - 67.0).abs() < f64::EPSILON);
        assert_eq!(record.lease_commence_date, 1986);
        assert_eq!(record.resale_price, 280_000);
    }

    #[test]
    fn parses_api_record_with_bare_numbers() {
        let mut value = sample_record();
        value["floor_area_sqm"] = json!(67.5);
        value["resale_price"] = json!(280_000);
        let record = ResaleRecord::from_api_record(&value).unwrap();
        assert!((record.floor_area_sqm - 67.5).abs() < f64::EPSILON);
        assert_eq!(record.resale_price, 280_000);
    }

    #[test]
    fn missing_field_is_an_error() {
        let mut value = sample_record();
        value.as_object_mut().unwrap().remove("storey_range");
        let err = ResaleRecord::from_api_record(&value).unwrap_err();
        assert!(matches!(
            err,
            RecordError::MissingField {
                field: "storey_range"
            }
        ));
    }

    #[test]
    fn unknown_flat_type_is_an_error() {
        let mut value = sample_record();
        value["flat_type"] = json!("6 ROOM");
        let err = ResaleRecord::from_api_record(&value).unwrap_err();
        assert!(matches!(
            err,
            RecordError::InvalidField {
                field: "flat_type",
                ..
            }
        ));
    }

    #[test]
    fn derives_address_from_block_and_street() {
        let record = ResaleRecord::from_api_record(&sample_record()).unwrap();
        assert_eq!(record.address(), "123 ANG MO KIO AVE 3");
    }

    #[test]
    fn parses_transaction_month_as_date() {
        let record = ResaleRecord::from_api_record(&sample_record()).unwrap();
        let date = record.transaction_date().unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2017, 1, 1).unwrap());
    }

    #[test]
    fn rejects_malformed_month() {
        let mut value = sample_record();
        value["month"] = json!("January 2017");
        let record = ResaleRecord::from_api_record(&value).unwrap();
        assert!(record.transaction_date().is_err());
    }
}
