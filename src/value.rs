use std::collections::HashMap;

use crate::output::to_json;

/// A structured event value used throughout the sift query language.
///
/// Events are arbitrarily nested records: a mapping of string keys to
/// scalars, nested records, or ordered sequences. Representing them as a
/// closed union lets field resolution and deep scans be written as
/// exhaustive pattern matches instead of runtime type probing.
///
/// # Examples
///
/// ```
/// use sift_lang::Value;
/// use std::collections::HashMap;
///
/// let mut event = HashMap::new();
/// event.insert("name".to_string(), Value::String("engine.start".to_string()));
/// event.insert("latency".to_string(), Value::Integer(120));
/// let event = Value::Object(event);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// JSON null
    Null,

    /// JSON boolean (true/false)
    Boolean(bool),

    /// Integer number (preserved separately from floats)
    Integer(i64),

    /// Floating-point number
    Float(f64),

    /// UTF-8 string
    String(String),

    /// Ordered sequence of values
    Array(Vec<Value>),

    /// Record with string keys
    Object(HashMap<String, Value>),
}

impl Value {
    /// True for the traversable kinds (arrays and objects).
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Object(_))
    }

    /// Look up one path segment: objects by key, arrays by numeric index.
    pub fn get(&self, segment: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// The text form the matching rules compare against. Null is empty,
    /// scalars stringify the way a query author sees them, containers use
    /// their compact JSON form.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Boolean(b) => b.to_string(),
            Value::Integer(n) => n.to_string(),
            Value::Float(n) => n.to_string(),
            Value::String(s) => s.clone(),
            Value::Array(_) | Value::Object(_) => to_json(self),
        }
    }

    /// Numeric coercion for the comparison operators. `None` means the
    /// value does not coerce and that candidate fails the comparison.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Value::Null => Some(0.0),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            Value::String(s) => parse_number(s),
            Value::Array(_) | Value::Object(_) => None,
        }
    }
}

/// Numeric coercion for query literals and string field values: blank text
/// coerces to zero, anything else must be standard float syntax.
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    trimmed.parse::<f64>().ok()
}

#[test]
fn test_numeric_coercion() {
    assert_eq!(Value::Null.to_number(), Some(0.0));
    assert_eq!(Value::Boolean(true).to_number(), Some(1.0));
    assert_eq!(Value::String(" 12.5 ".to_string()).to_number(), Some(12.5));
    assert_eq!(Value::String("".to_string()).to_number(), Some(0.0));
    assert_eq!(Value::String("12ms".to_string()).to_number(), None);
    assert_eq!(Value::Array(vec![]).to_number(), None);
}
