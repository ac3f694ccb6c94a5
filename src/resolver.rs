//! Field path resolution.
//!
//! A path is either a plain dotted chain (`a.b.c`, direct descent, one
//! candidate at most) or carries the deep-scan marker `$`:
//!
//! - `$` alone is the key-name sentinel, handled by the evaluator — it
//!   never resolves to values here.
//! - `$.*` collects every value reachable anywhere under the event.
//! - `$.sub.path` attempts `sub.path` at every container in the event and
//!   collects all hits.
//! - `base$.sub.path` descends to `base` first, then deep-scans under it;
//!   a trailing `.*` expands each hit one more level.
//!
//! Direct descent is O(path length); deep scans visit the whole value
//! graph. Resolution never fails — an unknown path is an empty candidate
//! set. The event is an owned tree, so every container is visited at most
//! once without an explicit seen-set.

use crate::value::Value;

/// Direct dotted descent. Objects resolve segments by key, arrays by
/// numeric index; a missing or non-traversable segment kills the lookup.
pub fn get_field_value<'a>(event: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = event;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

/// Resolve a path expression to its candidate values.
pub fn resolve<'a>(event: &'a Value, path: &str) -> Vec<&'a Value> {
    if path.is_empty() || path == "$" {
        return Vec::new();
    }
    if path == "$.*" {
        return collect_any_values(event);
    }
    if let Some(sub) = path.strip_prefix("$.") {
        if sub.is_empty() {
            return Vec::new();
        }
        return collect_deep_values(event, sub);
    }

    let Some(marker) = path.find("$.") else {
        return get_field_value(event, path).into_iter().collect();
    };

    // deep marker embedded after a non-empty prefix: resolve the base by
    // direct descent, then scan under it
    let base = &path[..marker];
    let sub = &path[marker + 2..];
    let root = if base.is_empty() {
        Some(event)
    } else {
        get_field_value(event, base)
    };
    let Some(root) = root else {
        return Vec::new();
    };

    if sub.is_empty() || sub == "*" {
        return collect_any_values(root);
    }
    if let Some(trimmed) = sub.strip_suffix(".*") {
        return collect_deep_values(root, trimmed)
            .into_iter()
            .flat_map(collect_any_values)
            .collect();
    }
    collect_deep_values(root, sub)
}

/// Every key name present anywhere in the event, for `$`-keyed existence
/// queries. Array indices are not key names.
pub fn collect_key_names(event: &Value) -> Vec<&str> {
    let mut names = Vec::new();
    walk_key_names(event, &mut names);
    names
}

fn walk_key_names<'a>(node: &'a Value, names: &mut Vec<&'a str>) {
    match node {
        Value::Array(items) => {
            for item in items {
                walk_key_names(item, names);
            }
        }
        Value::Object(map) => {
            for (key, child) in map {
                names.push(key);
                walk_key_names(child, names);
            }
        }
        _ => {}
    }
}

/// Attempt `path` by direct descent at every container node, collecting
/// all non-null hits.
fn collect_deep_values<'a>(root: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut results = Vec::new();
    walk_deep(root, path, &mut results);
    results
}

fn walk_deep<'a>(node: &'a Value, path: &str, results: &mut Vec<&'a Value>) {
    if !node.is_container() {
        return;
    }
    if let Some(value) = get_field_value(node, path) {
        if !matches!(value, Value::Null) {
            results.push(value);
        }
    }
    match node {
        Value::Array(items) => {
            for item in items {
                walk_deep(item, path, results);
            }
        }
        Value::Object(map) => {
            for child in map.values() {
                walk_deep(child, path, results);
            }
        }
        _ => {}
    }
}

/// Every object member value reachable under `root`. Array elements are
/// traversed but only object members become candidates themselves — a
/// sequence is matched elementwise by the evaluator, not exploded here.
fn collect_any_values(root: &Value) -> Vec<&Value> {
    let mut results = Vec::new();
    walk_any(root, &mut results);
    results
}

fn walk_any<'a>(node: &'a Value, results: &mut Vec<&'a Value>) {
    match node {
        Value::Array(items) => {
            for item in items {
                walk_any(item, results);
            }
        }
        Value::Object(map) => {
            for child in map.values() {
                results.push(child);
                walk_any(child, results);
            }
        }
        _ => {}
    }
}
