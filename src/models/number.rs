//! Serde helpers for numeric fields that older catalogs stored as strings.
//!
//! Documents written by the first web version of the catalog kept raw form
//! values, so `"1800"` and `1800` must both read as the same altitude.

use serde::de::{self, Deserializer, Visitor};
use std::fmt;

struct LenientF64;

impl<'de> Visitor<'de> for LenientF64 {
    type Value = f64;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a number or a numeric string")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
        Ok(v as f64)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
        Ok(v as f64)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            return Ok(0.0);
        }
        trimmed
            .parse::<f64>()
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }

    fn visit_unit<E: de::Error>(self) -> Result<f64, E> {
        Ok(0.0)
    }
}

/// Deserializes an `f64` from a JSON number, a numeric string, an empty string or null.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(LenientF64)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(deserialize_with = "super::lenient_f64")]
        value: f64,
    }

    fn parse(json: &str) -> Result<f64, serde_json::Error> {
        serde_json::from_str::<Holder>(json).map(|h| h.value)
    }

    #[test]
    fn test_accepts_numbers_and_strings() {
        assert_eq!(parse(r#"{"value": 1800}"#).unwrap(), 1800.0);
        assert_eq!(parse(r#"{"value": 86.5}"#).unwrap(), 86.5);
        assert_eq!(parse(r#"{"value": "86.5"}"#).unwrap(), 86.5);
        assert_eq!(parse(r#"{"value": " 42 "}"#).unwrap(), 42.0);
    }

    #[test]
    fn test_empty_and_null_read_as_zero() {
        assert_eq!(parse(r#"{"value": ""}"#).unwrap(), 0.0);
        assert_eq!(parse(r#"{"value": null}"#).unwrap(), 0.0);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse(r#"{"value": "high"}"#).is_err());
    }
}
