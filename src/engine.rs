use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::{
    ast::Node,
    evaluator::{Evaluator, evaluate},
    parser::{ParseError, parse_query},
    value::Value,
};

/// A compiled query: one immutable AST behind a pure match function.
///
/// Predicates are `Send + Sync` — evaluation has no shared mutable state,
/// so one predicate can test events from any number of threads at once.
#[derive(Debug)]
pub struct Predicate {
    ast: Node,
}

impl Predicate {
    pub fn matches(&self, event: &Value) -> bool {
        evaluate(&self.ast, event)
    }

    /// Evaluate with per-key overrides.
    pub fn matches_with(&self, event: &Value, evaluator: &Evaluator) -> bool {
        evaluator.evaluate(&self.ast, event)
    }

    pub fn ast(&self) -> &Node {
        &self.ast
    }
}

/// Compiles queries into predicates and runs them over event collections.
///
/// Compilation is memoized per engine instance, keyed by the literal query
/// string — recompiling the same text returns the identical predicate. The
/// cache is never evicted; the key space is bounded by the distinct strings
/// a user types in one session. Two queries differing only in quoting or
/// keyword case are distinct entries.
#[derive(Default)]
pub struct QueryEngine {
    cache: HashMap<String, Rc<Predicate>>,
}

impl QueryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile a query, reusing the cached predicate for a literal repeat.
    /// A failed compile poisons nothing: earlier entries stay valid.
    pub fn compile(&mut self, query: &str) -> Result<Rc<Predicate>, ParseError> {
        if let Some(predicate) = self.cache.get(query) {
            return Ok(Rc::clone(predicate));
        }
        let ast = parse_query(query)?;
        debug!("compiled query {:?}", query);
        let predicate = Rc::new(Predicate { ast });
        self.cache
            .insert(query.to_string(), Rc::clone(&predicate));
        Ok(predicate)
    }

    /// Does one event satisfy the query?
    pub fn matches(&mut self, event: &Value, query: &str) -> Result<bool, ParseError> {
        if query.trim().is_empty() {
            return Ok(true);
        }
        Ok(self.compile(query)?.matches(event))
    }

    /// The events matching `query`. A blank query matches everything
    /// without touching the parser.
    pub fn filter<'a>(
        &mut self,
        events: &'a [Value],
        query: &str,
    ) -> Result<Vec<&'a Value>, ParseError> {
        if query.trim().is_empty() {
            return Ok(events.iter().collect());
        }
        let predicate = self.compile(query)?;
        let matches: Vec<&Value> = events
            .iter()
            .filter(|event| predicate.matches(event))
            .collect();
        debug!("query {:?} matched {}/{} events", query, matches.len(), events.len());
        Ok(matches)
    }

    /// Indices of the matching events — the form the search worker ships
    /// back over its channel.
    pub fn filter_indices(
        &mut self,
        events: &[Value],
        query: &str,
    ) -> Result<Vec<usize>, ParseError> {
        if query.trim().is_empty() {
            return Ok((0..events.len()).collect());
        }
        let predicate = self.compile(query)?;
        Ok(events
            .iter()
            .enumerate()
            .filter(|(_, event)| predicate.matches(event))
            .map(|(index, _)| index)
            .collect())
    }

    /// The events matching any of `queries` (a set of saved filters is a
    /// union). Blank queries are skipped; no queries means everything.
    pub fn filter_any<'a>(
        &mut self,
        events: &'a [Value],
        queries: &[String],
    ) -> Result<Vec<&'a Value>, ParseError> {
        let mut predicates = Vec::new();
        for query in queries {
            if query.trim().is_empty() {
                continue;
            }
            predicates.push(self.compile(query)?);
        }
        if predicates.is_empty() {
            return Ok(events.iter().collect());
        }
        Ok(events
            .iter()
            .filter(|event| predicates.iter().any(|p| p.matches(event)))
            .collect())
    }
}
