//! Tolerant field deserializers for loosely shaped client payloads.
//!
//! Each helper accepts any JSON value and maps values of the wrong type to
//! `None` instead of failing the whole document. Use together with
//! `#[serde(default, deserialize_with = "...")]`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Finite number, or a string holding one.
pub fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(as_number(&value))
}

/// String values only.
pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

/// Boolean values only.
pub fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(Some(b)),
        _ => Ok(None),
    }
}

/// Array of strings; non-string elements are dropped.
pub fn text_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(Some(
            items
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        )),
        _ => Ok(None),
    }
}

/// Array of `T`; elements that do not deserialize are dropped.
pub fn list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(Some(
            items
                .into_iter()
                .filter_map(|v| serde_json::from_value(v).ok())
                .collect(),
        )),
        _ => Ok(None),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "super::number")]
        n: Option<f64>,
        #[serde(default, deserialize_with = "super::text")]
        s: Option<String>,
        #[serde(default, deserialize_with = "super::text_list")]
        l: Option<Vec<String>>,
    }

    #[test]
    fn test_wrong_types_become_none() {
        let p: Probe = serde_json::from_str(r#"{"n": "abc", "s": 12, "l": "x"}"#).unwrap();
        assert!(p.n.is_none());
        assert!(p.s.is_none());
        assert!(p.l.is_none());
    }

    #[test]
    fn test_numeric_strings_and_missing_fields() {
        let p: Probe = serde_json::from_str(r#"{"n": " 2.5 ", "l": ["a", 1, "b"]}"#).unwrap();
        assert_eq!(p.n, Some(2.5));
        assert!(p.s.is_none());
        assert_eq!(p.l, Some(vec!["a".to_string(), "b".to_string()]));
    }
}
