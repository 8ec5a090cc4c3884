//! Record-schema relaxation.
//!
//! A generator that closes every object (`additionalProperties: false`)
//! also closes string-keyed maps that it renders as `{"type": "object"}`
//! with no properties. Such a schema accepts only `{}`. [`relax_record_schemas`]
//! finds these record-like nodes and sets `additionalProperties: true`.
//!
//! The walk covers `definitions`, `$defs`, `properties`, `items` (single or
//! tuple) and `anyOf`/`allOf`/`oneOf`. It stops at a record-like node.

use serde_json::{Map, Value};

/// A schema node, discriminated by what relaxation does with it.
enum NodeShape<'a> {
    /// Boolean schemas and non-schema values; left untouched.
    Opaque,
    /// `type: object` without declared properties.
    Record(&'a mut Map<String, Value>),
    /// Any other object schema; children are visited.
    Composite(&'a mut Map<String, Value>),
}

fn classify(schema: &mut Value) -> NodeShape<'_> {
    match schema {
        Value::Object(node) => {
            if record_like(node) {
                NodeShape::Record(node)
            } else {
                NodeShape::Composite(node)
            }
        }
        _ => NodeShape::Opaque,
    }
}

fn record_like(node: &Map<String, Value>) -> bool {
    if node.get("type").and_then(Value::as_str) != Some("object") {
        return false;
    }
    match node.get("properties") {
        None | Some(Value::Null) => true,
        Some(Value::Object(properties)) => properties.is_empty(),
        Some(_) => false,
    }
}

/// Whether `schema` is an object schema with no declared properties.
pub fn is_record_like(schema: &Value) -> bool {
    schema.as_object().is_some_and(record_like)
}

/// Sets `additionalProperties: true` on every reachable record-like node.
///
/// Idempotent. Nodes that are not record-like are left unchanged apart from
/// their descendants.
pub fn relax_record_schemas(schema: &mut Value) {
    match classify(schema) {
        NodeShape::Opaque => {}
        NodeShape::Record(node) => {
            node.insert("additionalProperties".into(), Value::Bool(true));
        }
        NodeShape::Composite(node) => {
            for key in ["definitions", "$defs", "properties"] {
                if let Some(Value::Object(children)) = node.get_mut(key) {
                    children.values_mut().for_each(relax_record_schemas);
                }
            }
            match node.get_mut("items") {
                Some(Value::Array(tuple)) => tuple.iter_mut().for_each(relax_record_schemas),
                Some(items) => relax_record_schemas(items),
                None => {}
            }
            for key in ["anyOf", "allOf", "oneOf"] {
                if let Some(Value::Array(branches)) = node.get_mut(key) {
                    branches.iter_mut().for_each(relax_record_schemas);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_gets_additional_properties() {
        let mut schema = json!({"type": "object", "additionalProperties": false});
        relax_record_schemas(&mut schema);
        assert_eq!(schema, json!({"type": "object", "additionalProperties": true}));
    }

    #[test]
    fn test_classify_splits_records_and_composites() {
        let mut record = json!({"type": "object"});
        assert!(matches!(classify(&mut record), NodeShape::Record(_)));
        let mut composite = json!({"type": "object", "properties": {"a": {}}});
        assert!(matches!(classify(&mut composite), NodeShape::Composite(_)));
        let mut boolean = json!(true);
        assert!(matches!(classify(&mut boolean), NodeShape::Opaque));
    }

    #[test]
    fn test_empty_properties_is_record_like() {
        assert!(is_record_like(&json!({"type": "object", "properties": {}})));
        assert!(!is_record_like(&json!({"type": "object", "properties": {"a": {}}})));
        assert!(!is_record_like(&json!({"type": "string"})));
        assert!(!is_record_like(&json!(true)));
    }

    #[test]
    fn test_declared_object_keeps_closed() {
        let mut schema = json!({
            "type": "object",
            "properties": {"record": {"type": "object"}, "n": {"type": "number"}},
            "additionalProperties": false
        });
        relax_record_schemas(&mut schema);
        assert_eq!(schema["additionalProperties"], json!(false));
        assert_eq!(schema["properties"]["record"]["additionalProperties"], json!(true));
        assert!(schema["properties"]["n"].get("additionalProperties").is_none());
    }

    #[test]
    fn test_walks_definitions_items_and_combinators() {
        let mut schema = json!({
            "definitions": {
                "List": {"type": "array", "items": {"type": "object"}},
                "Pair": {"type": "array", "items": [{"type": "object"}, {"type": "string"}]},
                "Either": {"anyOf": [{"type": "object"}, {"type": "number"}]},
                "Both": {"allOf": [{"type": "object", "properties": {}}]},
                "One": {"oneOf": [{"type": "object"}]}
            }
        });
        relax_record_schemas(&mut schema);
        let defs = &schema["definitions"];
        assert_eq!(defs["List"]["items"]["additionalProperties"], json!(true));
        assert_eq!(defs["Pair"]["items"][0]["additionalProperties"], json!(true));
        assert!(defs["Pair"]["items"][1].get("additionalProperties").is_none());
        assert_eq!(defs["Either"]["anyOf"][0]["additionalProperties"], json!(true));
        assert_eq!(defs["Both"]["allOf"][0]["additionalProperties"], json!(true));
        assert_eq!(defs["One"]["oneOf"][0]["additionalProperties"], json!(true));
    }

    #[test]
    fn test_boolean_property_does_not_stop_walk() {
        let mut schema = json!({
            "type": "object",
            "properties": {"any": true, "later": {"type": "object"}}
        });
        relax_record_schemas(&mut schema);
        assert_eq!(schema["properties"]["any"], json!(true));
        assert_eq!(schema["properties"]["later"]["additionalProperties"], json!(true));
    }

    #[test]
    fn test_recursion_stops_at_record() {
        let mut schema = json!({
            "type": "object",
            "definitions": {"Inner": {"type": "object"}}
        });
        relax_record_schemas(&mut schema);
        assert_eq!(schema["additionalProperties"], json!(true));
        assert!(schema["definitions"]["Inner"].get("additionalProperties").is_none());
    }

    #[test]
    fn test_non_schema_values_unchanged() {
        for mut value in [json!(null), json!(false), json!("x"), json!([1])] {
            let before = value.clone();
            relax_record_schemas(&mut value);
            assert_eq!(value, before);
        }
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Strategy for schema-shaped values: objects built from schema keywords.
    fn schema_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            any::<bool>().prop_map(Value::Bool),
            prop_oneof![Just("object"), Just("string"), Just("array"), Just("number")]
                .prop_map(|t| serde_json::json!({ "type": t })),
        ];
        leaf.prop_recursive(4, 48, 4, |inner| {
            let keyword = prop_oneof![
                Just("properties"),
                Just("definitions"),
                Just("items"),
                Just("anyOf"),
                Just("oneOf"),
                Just("allOf"),
            ];
            (
                prop::option::of(prop_oneof![Just("object"), Just("array")]),
                keyword,
                prop::collection::btree_map("[a-z]{1,4}", inner.clone(), 0..4),
                prop::collection::vec(inner, 0..4),
            )
                .prop_map(|(ty, keyword, map, list)| {
                    let mut node = Map::new();
                    if let Some(ty) = ty {
                        node.insert("type".into(), Value::String(ty.into()));
                    }
                    let children = match keyword {
                        "properties" | "definitions" => Value::Object(map.into_iter().collect()),
                        _ => Value::Array(list),
                    };
                    node.insert(keyword.into(), children);
                    Value::Object(node)
                })
        })
    }

    fn all_reachable_records_open(schema: &Value) -> bool {
        let Value::Object(node) = schema else {
            return true;
        };
        if record_like(node) {
            return node.get("additionalProperties") == Some(&Value::Bool(true));
        }
        let maps = ["definitions", "$defs", "properties"]
            .iter()
            .filter_map(|k| node.get(*k).and_then(Value::as_object))
            .flat_map(|m| m.values());
        let lists = ["anyOf", "allOf", "oneOf"]
            .iter()
            .filter_map(|k| node.get(*k).and_then(Value::as_array))
            .flatten();
        let items: Vec<&Value> = match node.get("items") {
            Some(Value::Array(tuple)) => tuple.iter().collect(),
            Some(single) => vec![single],
            None => Vec::new(),
        };
        maps.chain(lists)
            .chain(items)
            .all(all_reachable_records_open)
    }

    proptest! {
        /// Relaxing twice gives the same result as relaxing once.
        #[test]
        fn relax_is_idempotent(schema in schema_value()) {
            let mut once = schema.clone();
            relax_record_schemas(&mut once);
            let mut twice = once.clone();
            relax_record_schemas(&mut twice);
            prop_assert_eq!(once, twice);
        }

        /// Every reachable record-like node ends up permissive.
        #[test]
        fn relax_opens_every_record(schema in schema_value()) {
            let mut relaxed = schema;
            relax_record_schemas(&mut relaxed);
            prop_assert!(all_reachable_records_open(&relaxed));
        }
    }
}
