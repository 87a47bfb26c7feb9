// src/services/json.rs

//! Lenient field access for loosely-typed portal JSON.
//!
//! Portals mix camelCase and snake_case keys and send numbers as strings;
//! these helpers try each candidate key in order.

use serde_json::Value;

/// First present, non-null value among `keys`.
pub fn field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let object = value.as_object()?;
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|v| !v.is_null())
}

/// Field rendered as a string; numbers are stringified.
pub fn field_string(value: &Value, keys: &[&str]) -> Option<String> {
    match field(value, keys)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Field read as a number; numeric strings are parsed.
pub fn field_f64(value: &Value, keys: &[&str]) -> Option<f64> {
    match field(value, keys)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tries_keys_in_order() {
        let v = json!({ "startHour": 8, "start_hour": null });
        assert_eq!(field_f64(&v, &["start_hour", "startHour"]), Some(8.0));
    }

    #[test]
    fn stringifies_numbers() {
        let v = json!({ "courtSeq": 31 });
        assert_eq!(field_string(&v, &["courtSeq"]).as_deref(), Some("31"));
    }

    #[test]
    fn parses_numeric_strings() {
        let v = json!({ "hourUnit": " 1.5 " });
        assert_eq!(field_f64(&v, &["hourUnit"]), Some(1.5));
        assert_eq!(field_f64(&json!({ "hourUnit": "x" }), &["hourUnit"]), None);
    }

    #[test]
    fn non_objects_have_no_fields() {
        assert!(field(&json!([1, 2]), &["a"]).is_none());
    }
}
