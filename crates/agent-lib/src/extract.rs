//! Total numeric field access over loosely-structured JSON documents
//!
//! Kubelet summaries are untrusted: any object may be missing, any counter
//! may be absent or of the wrong type. Lookups here never fail; absence and
//! type mismatches both read as `0.0`.

use serde_json::Value;

/// Walk `path` through nested objects and coerce the leaf to `f64`.
///
/// Returns `0.0` if any intermediate is not an object, a key is missing,
/// or the leaf cannot be read as a finite number.
pub fn extract_f64(doc: &Value, path: &[&str]) -> f64 {
    let mut current = doc;
    for key in path {
        match current.as_object().and_then(|object| object.get(*key)) {
            Some(next) => current = next,
            None => return 0.0,
        }
    }
    coerce_f64(current)
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

/// Numeric coercion of a single leaf value
fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Read a string-ish label, rendering non-string scalars as JSON text.
///
/// Missing keys and `null` yield `None`.
pub fn extract_label(doc: &Value, key: &str) -> Option<String> {
    match doc.as_object()?.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Iterate an array field, treating a missing or non-array field as empty
pub fn extract_array<'a>(doc: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    doc.as_object()
        .and_then(|object| object.get(key))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_present_number() {
        let doc = json!({"cpu": {"usageNanoCores": 2_000_000_000u64}});
        assert_eq!(extract_f64(&doc, &["cpu", "usageNanoCores"]), 2e9);
    }

    #[test]
    fn test_extract_missing_intermediate() {
        let doc = json!({"memory": {"usageBytes": 10}});
        assert_eq!(extract_f64(&doc, &["cpu", "usageNanoCores"]), 0.0);
    }

    #[test]
    fn test_extract_non_object_intermediate() {
        let doc = json!({"cpu": [1, 2, 3]});
        assert_eq!(extract_f64(&doc, &["cpu", "usageNanoCores"]), 0.0);

        let doc = json!({"cpu": 42});
        assert_eq!(extract_f64(&doc, &["cpu", "usageNanoCores"]), 0.0);
    }

    #[test]
    fn test_extract_non_numeric_leaf() {
        let doc = json!({"cpu": {"usageNanoCores": "lots"}});
        assert_eq!(extract_f64(&doc, &["cpu", "usageNanoCores"]), 0.0);

        let doc = json!({"cpu": {"usageNanoCores": null}});
        assert_eq!(extract_f64(&doc, &["cpu", "usageNanoCores"]), 0.0);

        let doc = json!({"cpu": {"usageNanoCores": {"value": 1}}});
        assert_eq!(extract_f64(&doc, &["cpu", "usageNanoCores"]), 0.0);
    }

    #[test]
    fn test_extract_numeric_string_leaf() {
        let doc = json!({"logs": {"usedBytes": " 4096 "}});
        assert_eq!(extract_f64(&doc, &["logs", "usedBytes"]), 4096.0);
    }

    #[test]
    fn test_extract_non_finite_string_reads_as_zero() {
        for raw in ["NaN", "nan", "inf", "-inf", "infinity", "1e999"] {
            let doc = json!({"memory": {"rssBytes": raw}});
            assert_eq!(extract_f64(&doc, &["memory", "rssBytes"]), 0.0, "for {:?}", raw);
        }
    }

    #[test]
    fn test_extract_from_non_object_root() {
        assert_eq!(extract_f64(&json!(null), &["cpu"]), 0.0);
        assert_eq!(extract_f64(&json!("text"), &["cpu"]), 0.0);
    }

    #[test]
    fn test_extract_label() {
        let doc = json!({"name": "web", "id": 7, "gone": null});
        assert_eq!(extract_label(&doc, "name").as_deref(), Some("web"));
        assert_eq!(extract_label(&doc, "id").as_deref(), Some("7"));
        assert_eq!(extract_label(&doc, "gone"), None);
        assert_eq!(extract_label(&doc, "missing"), None);
    }

    #[test]
    fn test_extract_array_defaults_to_empty() {
        let doc = json!({"pods": "nope"});
        assert_eq!(extract_array(&doc, "pods").count(), 0);
        assert_eq!(extract_array(&doc, "missing").count(), 0);

        let doc = json!({"pods": [{}, {}]});
        assert_eq!(extract_array(&doc, "pods").count(), 2);
    }
}
