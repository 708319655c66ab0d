//! Raw device attributes
//!
//! A device arrives as a loosely typed attribute map. These helpers coerce
//! individual values the same way everywhere in the pipeline.

use serde_json::{Map, Value};

/// One device entry as reported by a host, before normalization
pub type RawDevice = Map<String, Value>;

/// Render a scalar attribute as text; `null` and containers yield `None`
pub fn attr_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Interpret a flag attribute.
///
/// `true`, any non-zero number and the strings `1`, `true`, `yes` are set;
/// everything else is not.
pub fn attr_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => {
            let s = s.trim();
            s == "1" || s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("yes")
        }
        _ => false,
    }
}

/// Interpret a numeric attribute, accepting numbers and numeric strings.
///
/// Power readings are whole milliamps, so fractional values are truncated
/// toward zero.
pub fn attr_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// Text value of a key, empty when absent or not a scalar
pub fn text<'a>(device: &'a RawDevice, key: &str) -> std::borrow::Cow<'a, str> {
    match device.get(key) {
        Some(Value::String(s)) => std::borrow::Cow::Borrowed(s.as_str()),
        Some(other) => std::borrow::Cow::Owned(attr_string(other).unwrap_or_default()),
        None => std::borrow::Cow::Borrowed(""),
    }
}

/// Whether a flag key is present and set
pub fn flag(device: &RawDevice, key: &str) -> bool {
    device.get(key).map(attr_bool).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attr_bool() {
        assert!(attr_bool(&json!(true)));
        assert!(attr_bool(&json!(1)));
        assert!(attr_bool(&json!("1")));
        assert!(attr_bool(&json!("Yes")));
        assert!(attr_bool(&json!("TRUE")));

        assert!(!attr_bool(&json!(false)));
        assert!(!attr_bool(&json!(0)));
        assert!(!attr_bool(&json!("0")));
        assert!(!attr_bool(&json!("no")));
        assert!(!attr_bool(&json!("")));
        assert!(!attr_bool(&Value::Null));
    }

    #[test]
    fn test_attr_i64() {
        assert_eq!(attr_i64(&json!(500)), Some(500));
        assert_eq!(attr_i64(&json!(" 250 ")), Some(250));
        assert_eq!(attr_i64(&json!(12.7)), Some(12));
        assert_eq!(attr_i64(&json!("n/a")), None);
        assert_eq!(attr_i64(&Value::Null), None);
    }

    #[test]
    fn test_text_and_flag() {
        let device = json!({ "name": "Hub", "bus_power": 500, "internal": "yes" })
            .as_object()
            .cloned()
            .unwrap();

        assert_eq!(text(&device, "name"), "Hub");
        assert_eq!(text(&device, "bus_power"), "500");
        assert_eq!(text(&device, "missing"), "");
        assert!(flag(&device, "internal"));
        assert!(!flag(&device, "media"));
    }
}
