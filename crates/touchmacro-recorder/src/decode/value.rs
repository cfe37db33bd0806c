//! Lenient field access on loosely-typed JSON records

use serde_json::{Map, Value};

/// Numeric view of a value; numeric strings count.
pub(crate) fn as_f64(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|f| f.is_finite())
}

/// First of `keys` present on `record` with a numeric value.
pub(crate) fn probe_f64(record: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| record.get(*k).and_then(as_f64))
}

/// Top-level `name` of a recording, if it has a usable one.
pub(crate) fn name(root: &Map<String, Value>) -> Option<String> {
    root.get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Top-level `resolution`, either `"WxH"` text or `{width, height}`.
pub(crate) fn resolution(root: &Map<String, Value>) -> Option<String> {
    match root.get("resolution")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(o) => {
            let w = probe_f64(o, &["width", "w"])?;
            let h = probe_f64(o, &["height", "h"])?;
            Some(format!("{}x{}", w as i64, h as i64))
        }
        _ => None,
    }
}
