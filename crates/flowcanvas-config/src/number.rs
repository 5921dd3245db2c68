//! Lenient parsing for counts and durations written by other tools.

use serde::de::Error;
use serde::{Deserialize, Deserializer};

/// Read an optional non-negative number into an integer type.
///
/// Any JSON number is accepted; fractions are rounded to the nearest whole
/// value.
pub(crate) fn round_whole<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
  D: Deserializer<'de>,
  T: TryFrom<u64>,
{
  let Some(value) = Option::<f64>::deserialize(deserializer)? else {
    return Ok(None);
  };
  if !value.is_finite() || value < 0.0 {
    return Err(D::Error::custom(format!(
      "expected a non-negative number, got {value}"
    )));
  }

  T::try_from(value.round() as u64)
    .map(Some)
    .map_err(|_| D::Error::custom(format!("number out of range: {value}")))
}

#[cfg(test)]
mod tests {
  use serde::Deserialize;
  use serde_json::json;

  #[derive(Debug, Deserialize)]
  struct Sample {
    #[serde(default, deserialize_with = "super::round_whole")]
    count: Option<u32>,
  }

  fn count(value: serde_json::Value) -> Result<Option<u32>, serde_json::Error> {
    serde_json::from_value::<Sample>(value).map(|s| s.count)
  }

  #[test]
  fn test_accepts_integers_and_fractions() {
    assert_eq!(count(json!({ "count": 3 })).unwrap(), Some(3));
    assert_eq!(count(json!({ "count": 2.5 })).unwrap(), Some(3));
    assert_eq!(count(json!({ "count": 2.4 })).unwrap(), Some(2));
    assert_eq!(count(json!({ "count": null })).unwrap(), None);
    assert_eq!(count(json!({})).unwrap(), None);
  }

  #[test]
  fn test_rejects_negative_and_out_of_range() {
    assert!(count(json!({ "count": -1 })).is_err());
    assert!(count(json!({ "count": 5e12 })).is_err());
    assert!(count(json!({ "count": "3" })).is_err());
  }
}
