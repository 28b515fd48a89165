//! Serde helpers for reading structurally incomplete documents.
//!
//! Imported and recovered projects may carry fields of the wrong shape.
//! These helpers degrade such fields to empty/absent values instead of
//! failing the whole document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserializes a list, yielding an empty list for non-arrays and skipping
/// elements that do not parse.
pub fn lenient_vec<'de, T, D>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    T: DeserializeOwned,
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// Deserializes an optional value, yielding None when it does not parse.
pub fn lenient_option<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: DeserializeOwned,
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Deserializes an optional string, treating blanks and non-strings as absent.
pub fn non_blank_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string))
}

/// Deserializes a number, falling back to zero for anything else.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_f64().filter(|n| n.is_finite()).unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "lenient_vec")]
        items: Vec<u32>,
        #[serde(default, deserialize_with = "non_blank_string")]
        name: Option<String>,
        #[serde(default, deserialize_with = "lenient_f64")]
        x: f64,
    }

    #[test]
    fn test_lenient_fields() {
        let sample: Sample =
            serde_json::from_str(r#"{"items":[1,"two",3],"name":"  ","x":"left"}"#).unwrap();
        assert_eq!(sample.items, vec![1, 3]);
        assert_eq!(sample.name, None);
        assert_eq!(sample.x, 0.0);

        let sample: Sample = serde_json::from_str(r#"{"items":{"a":1},"name":"ok"}"#).unwrap();
        assert!(sample.items.is_empty());
        assert_eq!(sample.name.as_deref(), Some("ok"));
    }
}
