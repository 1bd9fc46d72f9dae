//! Lenient deserializers for provider payloads. The JSON dialects disagree
//! on whether ids and stats are strings or numbers, and booleans sometimes
//! arrive as `"1"`/`0`. Every helper accepts all the spellings we have seen
//! and yields `None` for anything else.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// An id that may be a JSON string or number. Null and empty become `None`.
pub fn opt_id<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(de)?;
    Ok(value.and_then(|v| match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }))
}

/// An integer that may be a number or a numeric string.
pub fn opt_int<'de, D: Deserializer<'de>>(de: D) -> Result<Option<i32>, D::Error> {
    let value = Option::<Value>::deserialize(de)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

/// A float that may be a number or a numeric string.
pub fn opt_float<'de, D: Deserializer<'de>>(de: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(de)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

/// A boolean that may be `true`, `1`, or `"1"` (and their negatives).
pub fn opt_bool<'de, D: Deserializer<'de>>(de: D) -> Result<Option<bool>, D::Error> {
    let value = Option::<Value>::deserialize(de)?;
    Ok(value.and_then(|v| match v {
        Value::Bool(b) => Some(b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim() {
            "1" | "true" | "True" => Some(true),
            "0" | "false" | "False" => Some(false),
            _ => None,
        },
        _ => None,
    }))
}

/// A string that may be missing, null, or a bare number.
pub fn opt_string<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(de)?;
    Ok(value.and_then(|v| match v {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "opt_id")]
        id: Option<String>,
        #[serde(default, deserialize_with = "opt_int")]
        count: Option<i32>,
        #[serde(default, deserialize_with = "opt_bool")]
        flag: Option<bool>,
    }

    #[test]
    fn ids_from_strings_and_numbers() {
        let p: Probe = serde_json::from_str(r#"{"id": 24}"#).unwrap();
        assert_eq!(p.id.as_deref(), Some("24"));
        let p: Probe = serde_json::from_str(r#"{"id": "24"}"#).unwrap();
        assert_eq!(p.id.as_deref(), Some("24"));
        let p: Probe = serde_json::from_str(r#"{"id": ""}"#).unwrap();
        assert_eq!(p.id, None);
        let p: Probe = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(p.id, None);
    }

    #[test]
    fn ints_from_strings() {
        let p: Probe = serde_json::from_str(r#"{"count": "22"}"#).unwrap();
        assert_eq!(p.count, Some(22));
        let p: Probe = serde_json::from_str(r#"{"count": 22}"#).unwrap();
        assert_eq!(p.count, Some(22));
        let p: Probe = serde_json::from_str(r#"{"count": "n/a"}"#).unwrap();
        assert_eq!(p.count, None);
    }

    #[test]
    fn bools_from_everything() {
        for (raw, expected) in [
            (r#"{"flag": true}"#, Some(true)),
            (r#"{"flag": "1"}"#, Some(true)),
            (r#"{"flag": 0}"#, Some(false)),
            (r#"{"flag": "maybe"}"#, None),
        ] {
            let p: Probe = serde_json::from_str(raw).unwrap();
            assert_eq!(p.flag, expected, "{raw}");
        }
    }
}
