use std::collections::HashMap;

use crate::{
    ast::{CompareOp, FieldOp, Node, TextTerm},
    glob::Glob,
    resolver::{collect_key_names, resolve},
    value::{Value, parse_number},
};

/// A per-key override. It receives the event, the raw value text and the
/// operator, and fully replaces the default rules for that key — callers
/// with custom semantics hook in here instead of forking the evaluator.
pub type FieldHandler = Box<dyn Fn(&Value, &str, FieldOp) -> bool + Send + Sync>;

/// Walks a query AST against one event at a time.
///
/// Evaluation is pure and infallible: an unresolvable path, a non-numeric
/// comparison operand or a missing field degrades to "no match" for that
/// candidate, never to an error.
#[derive(Default)]
pub struct Evaluator {
    /// Keyed by lowercased field key
    handlers: HashMap<String, FieldHandler>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an override for a field key (matched case-insensitively).
    pub fn on_field(&mut self, key: &str, handler: FieldHandler) {
        self.handlers.insert(key.to_lowercase(), handler);
    }

    /// Does `event` satisfy `node`? Short-circuits AND/OR.
    pub fn evaluate(&self, node: &Node, event: &Value) -> bool {
        match node {
            Node::Empty => true,
            Node::And(terms) => terms.iter().all(|term| self.evaluate(term, event)),
            Node::Or(terms) => terms.iter().any(|term| self.evaluate(term, event)),
            Node::Not(term) => !self.evaluate(term, event),
            Node::Text(term) => match_bare_term(event, &term.value),
            Node::Filter { key, op, value } => self.eval_filter(event, key, *op, value),
        }
    }

    fn eval_filter(&self, event: &Value, key: &str, op: FieldOp, value: &TextTerm) -> bool {
        let key = key.to_lowercase();
        if let Some(handler) = self.handlers.get(&key) {
            return handler(event, &value.value, op);
        }
        match op {
            FieldOp::Match => match_field_term(event, &key, &value.value),
            FieldOp::Contains => contains_field(event, &key, &value.value),
            FieldOp::Compare(cmp) => compare_field(event, &key, &value.value, cmp),
        }
    }
}

/// Evaluate with no field overrides.
pub fn evaluate(node: &Node, event: &Value) -> bool {
    Evaluator::new().evaluate(node, event)
}

/// A phrase value can itself carry literal (escaped) quotes; a term wrapped
/// in them matches its inner text.
fn strip_quotes(term: &str) -> &str {
    if term.len() >= 2 && term.starts_with('"') && term.ends_with('"') {
        &term[1..term.len() - 1]
    } else {
        term
    }
}

/// Bare-term matching: the event name gets a relaxed prefix glob, every
/// other shallow field (the nested `data` record excluded) must stringify
/// to the term exactly, case-insensitively. Sequences match elementwise.
fn match_bare_term(event: &Value, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }

    let name_text = event.get("name").map(Value::to_text).unwrap_or_default();
    if Glob::new(&format!("{term}*")).matches(&name_text) {
        return true;
    }

    let Value::Object(fields) = event else {
        return false;
    };
    let term_lower = term.to_lowercase();
    for (key, value) in fields {
        if key == "data" {
            continue;
        }
        match value {
            Value::Array(items) => {
                if items
                    .iter()
                    .any(|item| item.to_text().to_lowercase() == term_lower)
                {
                    return true;
                }
            }
            other => {
                let text = other.to_text();
                if !text.is_empty() && text.to_lowercase() == term_lower {
                    return true;
                }
            }
        }
    }
    false
}

/// The `:` operator. A `*` in the term makes it a glob; the `name` key gets
/// an implicit trailing wildcard even without one; everything else is
/// case-insensitive exact. Numbers compare by their exact decimal text and
/// booleans by `true`/`false`, so globs never match them.
fn match_field_term(event: &Value, field: &str, term: &str) -> bool {
    if field == "$" {
        return match_key_name_term(event, term);
    }
    let cleaned = strip_quotes(term);

    let glob = if term.contains('*') {
        Some(Glob::new(cleaned))
    } else if field == "name" {
        Some(Glob::new(&format!("{cleaned}*")))
    } else {
        None
    };
    let cleaned_lower = cleaned.to_lowercase();

    let apply_match = |candidate: &Value| -> bool {
        if matches!(candidate, Value::Null) {
            return false;
        }
        let text = candidate.to_text();
        match &glob {
            Some(glob) => glob.matches(&text),
            None => text.to_lowercase() == cleaned_lower,
        }
    };

    for candidate in resolve(event, field) {
        let matched = match candidate {
            Value::Array(items) => items.iter().any(|item| apply_match(item)),
            Value::Boolean(b) => {
                (*b && cleaned_lower == "true") || (!*b && cleaned_lower == "false")
            }
            Value::Integer(_) | Value::Float(_) => candidate.to_text() == cleaned,
            other => apply_match(other),
        };
        if matched {
            return true;
        }
    }
    false
}

/// The `~` operator: case-insensitive substring containment.
fn contains_field(event: &Value, field: &str, term: &str) -> bool {
    if field == "$" {
        return match_key_name_contains(event, term);
    }
    let needle = term.to_lowercase();

    let contains = |value: &Value| -> bool {
        if matches!(value, Value::Null) {
            return false;
        }
        value.to_text().to_lowercase().contains(&needle)
    };

    for candidate in resolve(event, field) {
        let matched = match candidate {
            Value::Array(items) => items.iter().any(|item| contains(item)),
            other => contains(other),
        };
        if matched {
            return true;
        }
    }
    false
}

/// The comparison operators. Both sides coerce to numbers; a side that does
/// not coerce, or is not finite, fails that candidate with no error.
fn compare_field(event: &Value, field: &str, term: &str, op: CompareOp) -> bool {
    if field == "$" {
        return false;
    }
    let Some(target) = parse_number(term) else {
        return false;
    };
    if !target.is_finite() {
        return false;
    }

    let compare_one = |value: &Value| -> bool {
        let Some(number) = value.to_number() else {
            return false;
        };
        if !number.is_finite() {
            return false;
        }
        match op {
            CompareOp::Gt => number > target,
            CompareOp::Ge => number >= target,
            CompareOp::Lt => number < target,
            CompareOp::Le => number <= target,
        }
    };

    for candidate in resolve(event, field) {
        let matched = match candidate {
            Value::Array(items) => items.iter().any(|item| compare_one(item)),
            other => compare_one(other),
        };
        if matched {
            return true;
        }
    }
    false
}

/// `$:term` — existence of a matching key name anywhere in the event.
fn match_key_name_term(event: &Value, term: &str) -> bool {
    let cleaned = strip_quotes(term);
    if cleaned.contains('*') {
        let glob = Glob::new(cleaned);
        collect_key_names(event).iter().any(|key| glob.matches(key))
    } else {
        let cleaned_lower = cleaned.to_lowercase();
        collect_key_names(event)
            .iter()
            .any(|key| key.to_lowercase() == cleaned_lower)
    }
}

/// `$~term` — substring containment over key names.
fn match_key_name_contains(event: &Value, term: &str) -> bool {
    let needle = term.to_lowercase();
    collect_key_names(event)
        .iter()
        .any(|key| key.to_lowercase().contains(&needle))
}
