//! Flattening of nested streaming payloads into flat record keys.
//!
//! Pure recursion over generic JSON values, independent of how the payload
//! was transported or decoded: objects recurse with `_`-joined keys,
//! sequences index by position, scalars pass through.

use std::collections::BTreeMap;

use serde_json::Value;

/// Flatten a decoded payload into `_`-joined flat keys.
///
/// A scalar at the top level flattens to a single entry under the empty key;
/// in practice payloads are objects.
pub fn flatten(value: &Value) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    flatten_into("", value, &mut out);
    out
}

fn flatten_into(prefix: &str, value: &Value, out: &mut BTreeMap<String, Value>) {
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                flatten_into(&join(prefix, key), val, out);
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_into(&join(prefix, &index.to_string()), item, out);
            }
        }
        scalar => {
            out.insert(prefix.to_string(), scalar.clone());
        }
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}_{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_object_unchanged() {
        let out = flatten(&json!({"a": 1, "b": 2.5}));
        assert_eq!(out["a"], json!(1));
        assert_eq!(out["b"], json!(2.5));
    }

    #[test]
    fn test_nested_objects_join_with_underscore() {
        let out = flatten(&json!({"ue": {"dl": {"brate": 12.0}}}));
        assert_eq!(out.len(), 1);
        assert_eq!(out["ue_dl_brate"], json!(12.0));
    }

    #[test]
    fn test_sequences_index_by_position() {
        let out = flatten(&json!({"cells": [{"pci": 1}, {"pci": 2}]}));
        assert_eq!(out["cells_0_pci"], json!(1));
        assert_eq!(out["cells_1_pci"], json!(2));
    }

    #[test]
    fn test_scalar_sequence() {
        let out = flatten(&json!({"rsrp": [-80, -82]}));
        assert_eq!(out["rsrp_0"], json!(-80));
        assert_eq!(out["rsrp_1"], json!(-82));
    }

    #[test]
    fn test_mixed_scalars_preserved() {
        let out = flatten(&json!({"state": "connected", "ok": true, "n": null}));
        assert_eq!(out["state"], json!("connected"));
        assert_eq!(out["ok"], json!(true));
        assert_eq!(out["n"], Value::Null);
    }

    #[test]
    fn test_deterministic_key_order() {
        let out = flatten(&json!({"b": 1, "a": {"z": 2, "y": 3}}));
        let keys: Vec<&String> = out.keys().collect();
        assert_eq!(keys, ["a_y", "a_z", "b"]);
    }
}
