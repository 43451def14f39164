//! Lenient decoding helpers for server payloads.
//!
//! # Responsibility
//! - Accept the loosely typed values the course server emits (numeric
//!   strings, `0/1` flags, empty strings for unset dates).
//! - Keep typed fields on the Rust side regardless of wire shape.
//!
//! # Invariants
//! - `""` and `null` decode to "unset" for optional fields.
//! - Integers encoded as strings are accepted only when fully numeric.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

/// Decodes an optional epoch-seconds date.
pub(crate) fn epoch_opt<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(text) if text.trim().is_empty() => Ok(None),
        other => integer_from_value(&other).map(Some).map_err(de::Error::custom),
    }
}

/// Decodes an integer that may arrive as a JSON number or numeric string.
pub(crate) fn int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    integer_from_value(&value).map_err(de::Error::custom)
}

/// Decodes a problem id; ids are positive integers but often sent as strings.
pub(crate) fn problem_id<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let raw = integer_from_value(&value).map_err(de::Error::custom)?;
    u32::try_from(raw).map_err(|_| de::Error::custom(format!("problem_id out of range: {raw}")))
}

/// Decodes a boolean flag from `true/false`, `0/1`, or their string forms.
pub(crate) fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(false),
        Value::Bool(value) => Ok(value),
        Value::Number(number) => Ok(number.as_f64().is_some_and(|n| n != 0.0)),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "" | "0" | "false" | "n" | "no" => Ok(false),
            "1" | "true" | "y" | "yes" => Ok(true),
            other => Err(de::Error::custom(format!("invalid flag value `{other}`"))),
        },
        other => Err(de::Error::custom(format!("invalid flag value `{other}`"))),
    }
}

/// Treats an explicit `null` as the type's default value.
pub(crate) fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn integer_from_value(value: &Value) -> Result<i64, String> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|n| n.is_finite()).map(|n| n as i64))
            .ok_or_else(|| format!("integer out of range: {number}")),
        Value::String(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("expected integer, got `{text}`")),
        other => Err(format!("expected integer, got {other}")),
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Fields {
        #[serde(default, deserialize_with = "super::epoch_opt")]
        date: Option<i64>,
        #[serde(default, deserialize_with = "super::flag")]
        enabled: bool,
        #[serde(default, deserialize_with = "super::int")]
        count: i64,
    }

    #[test]
    fn empty_string_date_is_unset() {
        let fields: Fields = serde_json::from_value(json!({ "date": "" })).unwrap();
        assert_eq!(fields.date, None);
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let fields: Fields =
            serde_json::from_value(json!({ "date": "1700000000", "count": "-1" })).unwrap();
        assert_eq!(fields.date, Some(1_700_000_000));
        assert_eq!(fields.count, -1);
    }

    #[test]
    fn flag_accepts_numeric_and_text_forms() {
        for (raw, expected) in [
            (json!(1), true),
            (json!(0), false),
            (json!("1"), true),
            (json!("false"), false),
            (json!(true), true),
        ] {
            let fields: Fields = serde_json::from_value(json!({ "enabled": raw })).unwrap();
            assert_eq!(fields.enabled, expected, "raw value {raw}");
        }
    }

    #[test]
    fn garbage_integer_is_rejected() {
        let err = serde_json::from_value::<Fields>(json!({ "count": "lots" })).unwrap_err();
        assert!(err.to_string().contains("expected integer"));
    }
}
