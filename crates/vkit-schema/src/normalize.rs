//! Instance normalization ahead of validation.
//!
//! Walks a schema and an instance together and rewrites the instance in
//! place: defaults for absent properties, scalar type coercion, removal of
//! additional properties. Each node is handled in a fixed order: `$ref`,
//! `allOf`, `anyOf`/`oneOf`, coercion, defaults, removal, then children.
//!
//! `anyOf`/`oneOf` branches normalize a copy of the instance each, in
//! order. The first copy its branch accepts replaces the instance; when no
//! branch accepts, the instance is left as it was.

use std::collections::HashMap;
use std::sync::Arc;

use jsonschema::Validator;
use parking_lot::Mutex;
use regex::Regex;
use serde_json::{Map, Number, Value};
use vkit_core::SchemaId;

use crate::compiler::{Coercion, Engine, RemoveAdditional};

/// Bound on `$ref` hops followed along one path.
const MAX_REF_HOPS: usize = 64;

pub(crate) struct Normalizer {
    engine: Engine,
    /// Union branches and `additionalProperties` subschemas compiled on
    /// first use, keyed by node address. Addresses are stable: the schemas are immutable and
    /// owned by the validator or the store snapshot.
    branches: Mutex<HashMap<usize, Option<Arc<Validator>>>>,
}

impl Normalizer {
    pub(crate) fn new(engine: Engine) -> Self {
        Self {
            engine,
            branches: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn all_errors(&self) -> bool {
        self.engine.options().all_errors
    }

    pub(crate) fn apply(&self, root: &Value, instance: &mut Value) {
        self.visit(root, root, instance, 0);
    }

    fn visit<'s>(&'s self, schema: &'s Value, root: &'s Value, instance: &mut Value, hops: usize) {
        let Value::Object(node) = schema else {
            return;
        };

        if let Some(Value::String(reference)) = node.get("$ref") {
            if hops < MAX_REF_HOPS {
                if let Some((target, target_root)) = self.resolve(reference, root) {
                    self.visit(target, target_root, instance, hops + 1);
                }
            } else {
                tracing::warn!(reference = %reference, "ref chain too deep, normalization stopped");
            }
        }

        if let Some(Value::Array(branches)) = node.get("allOf") {
            for branch in branches {
                self.visit(branch, root, instance, hops);
            }
        }

        for key in ["anyOf", "oneOf"] {
            if let Some(Value::Array(branches)) = node.get(key) {
                self.normalize_union(branches, root, instance, hops);
            }
        }

        self.coerce(node, instance);

        if self.engine.options().use_defaults {
            apply_defaults(node, instance);
        }

        self.remove_additional(node, root, instance);

        match instance {
            Value::Object(fields) => {
                let properties = node.get("properties").and_then(Value::as_object);
                let patterns = compile_patterns(node);
                let additional = node.get("additionalProperties");
                for (key, value) in fields.iter_mut() {
                    let declared = properties.and_then(|p| p.get(key));
                    if let Some(sub) = declared {
                        self.visit(sub, root, value, hops);
                    }
                    let mut matched = false;
                    for (pattern, sub) in &patterns {
                        if pattern.is_match(key) {
                            matched = true;
                            self.visit(sub, root, value, hops);
                        }
                    }
                    if declared.is_none() && !matched {
                        if let Some(sub) = additional {
                            self.visit(sub, root, value, hops);
                        }
                    }
                }
            }
            Value::Array(items) => {
                let tuple = node
                    .get("prefixItems")
                    .and_then(Value::as_array)
                    .or_else(|| node.get("items").and_then(Value::as_array));
                let rest = match tuple {
                    Some(_) if node.contains_key("prefixItems") => node.get("items"),
                    Some(_) => node.get("additionalItems"),
                    None => node.get("items"),
                };
                let positional = tuple.map_or(0, Vec::len);
                for (index, item) in items.iter_mut().enumerate() {
                    match tuple.and_then(|t| t.get(index)) {
                        Some(sub) => self.visit(sub, root, item, hops),
                        None if index >= positional => {
                            if let Some(sub) = rest {
                                self.visit(sub, root, item, hops);
                            }
                        }
                        None => {}
                    }
                }
            }
            _ => {}
        }
    }

    /// Finds the schema a `$ref` points at, with the document it lives in.
    fn resolve<'s>(&'s self, reference: &str, root: &'s Value) -> Option<(&'s Value, &'s Value)> {
        let store = self.engine.store();
        if let Some(doc) = store.get(reference) {
            return Some((doc, doc));
        }
        let id = SchemaId::new(reference).ok()?;
        let pointer = id.fragment()?;
        match id.base() {
            "" => root.pointer(pointer).map(|target| (target, root)),
            base => {
                let doc = store.get(base)?;
                doc.pointer(pointer).map(|target| (target, doc))
            }
        }
    }

    fn coerce(&self, node: &Map<String, Value>, instance: &mut Value) {
        let mode = self.engine.options().coerce_types;
        if mode == Coercion::Off {
            return;
        }
        let types: Vec<&str> = match node.get("type") {
            Some(Value::String(t)) => vec![t.as_str()],
            Some(Value::Array(ts)) => ts.iter().filter_map(Value::as_str).collect(),
            _ => return,
        };
        if types.iter().any(|t| has_type(t, instance)) {
            return;
        }

        if mode == Coercion::Array {
            if types.contains(&"array") {
                *instance = Value::Array(vec![instance.take()]);
                return;
            }
            if let Value::Array(items) = instance {
                if items.len() == 1 {
                    let single = items.remove(0);
                    *instance = single;
                    if types.iter().any(|t| has_type(t, instance)) {
                        return;
                    }
                }
            }
        }

        for t in &types {
            if let Some(converted) = coerce_scalar(t, instance) {
                *instance = converted;
                return;
            }
        }
    }

    fn remove_additional(&self, node: &Map<String, Value>, root: &Value, instance: &mut Value) {
        let Value::Object(fields) = instance else {
            return;
        };
        let mode = self.engine.options().remove_additional;
        let additional = node.get("additionalProperties");
        let applies = match mode {
            RemoveAdditional::Off => false,
            RemoveAdditional::All => node.contains_key("properties"),
            RemoveAdditional::WhenForbidden => additional == Some(&Value::Bool(false)),
            RemoveAdditional::Failing => {
                matches!(additional, Some(Value::Bool(false)) | Some(Value::Object(_)))
            }
        };
        if !applies {
            return;
        }

        let properties = node.get("properties").and_then(Value::as_object);
        let patterns = compile_patterns(node);
        let undeclared: Vec<String> = fields
            .keys()
            .filter(|key| {
                !properties.is_some_and(|p| p.contains_key(key.as_str()))
                    && !patterns.iter().any(|(pattern, _)| pattern.is_match(key))
            })
            .cloned()
            .collect();

        for key in undeclared {
            let remove = match (mode, additional) {
                (RemoveAdditional::Failing, Some(sub @ Value::Object(_))) => fields
                    .get_mut(&key)
                    .is_some_and(|value| !self.branch_accepts(sub, root, value)),
                _ => true,
            };
            if remove {
                tracing::trace!(property = %key, "removed additional property");
                fields.remove(&key);
            }
        }
    }

    /// Commits the first branch whose normalized copy of `instance` it accepts.
    fn normalize_union(&self, branches: &[Value], root: &Value, instance: &mut Value, hops: usize) {
        for branch in branches {
            let Some(validator) = self.branch_validator(branch, root) else {
                continue;
            };
            let mut candidate = instance.clone();
            self.visit(branch, root, &mut candidate, hops);
            if validator.is_valid(&candidate) {
                *instance = candidate;
                return;
            }
        }
    }

    /// Whether `value`, normalized against `sub`, satisfies it.
    fn branch_accepts(&self, sub: &Value, root: &Value, value: &mut Value) -> bool {
        self.visit(sub, root, value, 0);
        // A branch that cannot compile is left for the main validator to report.
        self.branch_validator(sub, root)
            .map_or(true, |v| v.is_valid(value))
    }

    /// The engine validator for a subschema, compiled once per node.
    fn branch_validator(&self, sub: &Value, root: &Value) -> Option<Arc<Validator>> {
        let key = sub as *const Value as usize;
        let mut branches = self.branches.lock();
        branches
            .entry(key)
            .or_insert_with(|| self.compile_branch(sub, root))
            .clone()
    }

    fn compile_branch(&self, sub: &Value, root: &Value) -> Option<Arc<Validator>> {
        let mut doc = sub.clone();
        if let (Value::Object(target), Value::Object(source)) = (&mut doc, root) {
            for key in ["definitions", "$defs"] {
                if let Some(defs) = source.get(key) {
                    target.entry(key).or_insert_with(|| defs.clone());
                }
            }
        }
        match self.engine.build(&doc) {
            Ok(v) => Some(Arc::new(v)),
            Err(e) => {
                tracing::debug!(error = %e, "subschema did not compile");
                None
            }
        }
    }
}

fn compile_patterns(node: &Map<String, Value>) -> Vec<(Regex, &Value)> {
    node.get("patternProperties")
        .and_then(Value::as_object)
        .map(|patterns| {
            patterns
                .iter()
                .filter_map(|(p, sub)| Regex::new(p).ok().map(|re| (re, sub)))
                .collect()
        })
        .unwrap_or_default()
}

fn apply_defaults(node: &Map<String, Value>, instance: &mut Value) {
    match instance {
        Value::Object(fields) => {
            let Some(Value::Object(properties)) = node.get("properties") else {
                return;
            };
            for (name, sub) in properties {
                if let Some(default) = sub.get("default") {
                    if !fields.contains_key(name) {
                        fields.insert(name.clone(), default.clone());
                    }
                }
            }
        }
        Value::Array(items) => {
            let tuple = node
                .get("prefixItems")
                .or_else(|| node.get("items"))
                .and_then(Value::as_array);
            let Some(tuple) = tuple else {
                return;
            };
            for sub in tuple.iter().skip(items.len()) {
                match sub.get("default") {
                    Some(default) => items.push(default.clone()),
                    None => break,
                }
            }
        }
        _ => {}
    }
}

fn has_type(name: &str, value: &Value) -> bool {
    match name {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => is_integer(value),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => false,
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
        }
        _ => false,
    }
}

/// Scalar conversion toward `target`, or `None` when no rule applies.
fn coerce_scalar(target: &str, value: &Value) -> Option<Value> {
    match (target, value) {
        ("string", Value::Number(n)) => Some(Value::String(number_text(n))),
        ("string", Value::Bool(b)) => Some(Value::String(b.to_string())),
        ("string", Value::Null) => Some(Value::String(String::new())),

        ("number", Value::String(s)) => parse_number(s).map(Value::Number),
        ("integer", Value::String(s)) => parse_number(s)
            .filter(|n| is_integer(&Value::Number(n.clone())))
            .map(Value::Number),
        ("number" | "integer", Value::Bool(b)) => Some(Value::from(u8::from(*b))),
        ("number" | "integer", Value::Null) => Some(Value::from(0)),

        ("boolean", Value::String(s)) if s == "true" => Some(Value::Bool(true)),
        ("boolean", Value::String(s)) if s == "false" => Some(Value::Bool(false)),
        ("boolean", Value::Number(n)) if n.as_f64() == Some(1.0) => Some(Value::Bool(true)),
        ("boolean", Value::Number(n)) if n.as_f64() == Some(0.0) => Some(Value::Bool(false)),
        ("boolean", Value::Null) => Some(Value::Bool(false)),

        ("null", Value::String(s)) if s.is_empty() => Some(Value::Null),
        ("null", Value::Number(n)) if n.as_f64() == Some(0.0) => Some(Value::Null),
        ("null", Value::Bool(false)) => Some(Value::Null),
        _ => None,
    }
}

fn parse_number(text: &str) -> Option<Number> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(i) = text.parse::<i64>() {
        return Some(Number::from(i));
    }
    text.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(|f| {
            if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
                Some(Number::from(f as i64))
            } else {
                Number::from_f64(f)
            }
        })
}

fn number_text(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if !n.is_i64() && !n.is_u64() && f.fract() == 0.0 && f.abs() < 1e21 => {
            format!("{f:.0}")
        }
        _ => n.to_string(),
    }
}
