//! Query DSL rewriting for neural search.
//!
//! Two independent transforms run before a query reaches the backend: the
//! deployed model id is injected into every `neural` clause that needs one,
//! and generated embedding fields are excluded from returned sources. Both
//! take the query by value and hand back a new structure; caller-owned input
//! is never mutated in place.

use serde_json::{Map, Value, json};
use std::collections::BTreeSet;

/// Key of the embedding-search clause the rewrite targets.
const NEURAL_CLAUSE_KEY: &str = "neural";

/// Key signaling a caller-resolved vector; clauses carrying it are left
/// alone.
const PRERESOLVED_KEY: &str = "source";

/// Rewrite `dsl` for execution.
///
/// Without a resolvable model id the injection pass is skipped entirely and
/// the query runs as written; the backend rejects `neural` clauses that
/// needed one.
pub fn augment(dsl: Value, model_id: Option<&str>, vector_fields: &BTreeSet<String>) -> Value {
    let dsl = match model_id {
        Some(model_id) => inject_model_id(dsl, model_id),
        None => dsl,
    };
    exclude_fields(dsl, vector_fields)
}

/// Insert `model_id` into every `neural` clause that does not already carry
/// a pre-resolved `source` vector, at any nesting depth.
pub fn inject_model_id(mut dsl: Value, model_id: &str) -> Value {
    if let Value::Object(map) = &mut dsl {
        walk(map, model_id);
    }
    dsl
}

fn walk(map: &mut Map<String, Value>, model_id: &str) {
    for (key, value) in map.iter_mut() {
        match value {
            Value::Object(inner) => {
                if !inner.contains_key(PRERESOLVED_KEY) {
                    walk(inner, model_id);
                }
                if key == NEURAL_CLAUSE_KEY {
                    for clause in inner.values_mut() {
                        if let Value::Object(clause) = clause
                            && !clause.contains_key(PRERESOLVED_KEY)
                        {
                            clause.insert(
                                "model_id".to_string(),
                                Value::String(model_id.to_string()),
                            );
                        }
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    if let Value::Object(inner) = item {
                        walk(inner, model_id);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Merge `fields` into the query's `_source.excludes` list, creating the
/// clause when absent. Existing exclusions are preserved; duplicates are
/// dropped.
pub fn exclude_fields(mut dsl: Value, fields: &BTreeSet<String>) -> Value {
    if let Value::Object(map) = &mut dsl {
        let mut excludes: Vec<String> = match map.get("_source") {
            Some(Value::Object(source)) => source
                .get("excludes")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        };

        for field in fields {
            if !excludes.iter().any(|existing| existing == field) {
                excludes.push(field.clone());
            }
        }

        let excludes = Value::Array(excludes.into_iter().map(Value::String).collect());
        match map.get_mut("_source") {
            Some(Value::Object(source)) => {
                source.insert("excludes".to_string(), excludes);
            }
            _ => {
                map.insert("_source".to_string(), json!({"excludes": excludes}));
            }
        }
    }
    dsl
}
