// tests/engine_tests.rs

use sift_lang::evaluator::Evaluator;
use sift_lang::value::Value;
use sift_lang::worker::SearchWorker;
use sift_lang::{Predicate, QueryEngine};
use std::collections::HashMap;
use std::rc::Rc;

fn obj(pairs: Vec<(&str, Value)>) -> Value {
    let mut map = HashMap::new();
    for (k, v) in pairs {
        map.insert(k.to_string(), v);
    }
    Value::Object(map)
}

fn s(v: &str) -> Value {
    Value::String(v.to_string())
}

fn i(v: i64) -> Value {
    Value::Integer(v)
}

/// One event shaped like the log records the engine was built for.
fn sample_event() -> Value {
    obj(vec![
        ("name", s("engine.start")),
        ("level", s("green")),
        ("action", s("start")),
        ("description", s("db write failed")),
        ("latency", i(120)),
        ("ok", Value::Boolean(true)),
        ("tags", Value::Array(vec![s("boot"), s("init")])),
        (
            "data",
            obj(vec![("inner", obj(vec![("code", i(500)), ("token", s("secret"))]))]),
        ),
    ])
}

fn matches(event: &Value, query: &str) -> bool {
    QueryEngine::new()
        .matches(event, query)
        .unwrap_or_else(|e| panic!("query {:?} failed: {}", query, e))
}

// ============================================================================
// Empty query and boolean structure
// ============================================================================

#[test]
fn test_empty_query_matches_everything() {
    let event = sample_event();
    assert!(matches(&event, ""));
    assert!(matches(&event, "   "));
    assert!(matches(&event, "\t\n"));
}

#[test]
fn test_not_is_true_negation() {
    let event = sample_event();
    for query in ["level:green", "nope", "latency>100", "tags:boot", "$.code:500"] {
        let negated = format!("-({})", query);
        assert_eq!(
            matches(&event, query),
            !matches(&event, &negated),
            "negation mismatch for {:?}",
            query
        );
    }
}

#[test]
fn test_or_is_union_and_is_intersection() {
    let event = sample_event();
    assert!(matches(&event, "level:green OR level:red"));
    assert!(!matches(&event, "level:green level:red"));
    assert!(matches(&event, "level:green action:start"));
    assert!(!matches(&event, "level:red OR level:blue"));
}

#[test]
fn test_field_scoping_distributes() {
    let event = sample_event();
    assert_eq!(
        matches(&event, "level:(green OR red)"),
        matches(&event, "level:green") || matches(&event, "level:red")
    );
    assert!(matches(&event, "level:(green OR red)"));
    assert!(!matches(&event, "level:(red OR blue)"));
}

// ============================================================================
// Bare terms
// ============================================================================

#[test]
fn test_bare_term_prefix_matches_the_name() {
    let event = sample_event();
    assert!(matches(&event, "engine"));
    assert!(matches(&event, "engine.start"));
    assert!(!matches(&event, "ngine"));
}

#[test]
fn test_bare_term_exact_matches_other_shallow_fields() {
    let event = sample_event();
    // exact case-insensitive equality, no prefixing
    assert!(matches(&event, "green"));
    assert!(matches(&event, "GREEN"));
    assert!(!matches(&event, "gre"));
}

#[test]
fn test_bare_term_matches_sequence_elements() {
    let event = sample_event();
    assert!(matches(&event, "boot"));
    assert!(matches(&event, "init"));
    assert!(!matches(&event, "boo"));
}

#[test]
fn test_bare_term_skips_the_data_record() {
    let event = sample_event();
    assert!(!matches(&event, "secret"));
    // but a field query can still reach it
    assert!(matches(&event, "$.token:secret"));
}

// ============================================================================
// Field matching
// ============================================================================

#[test]
fn test_glob_is_anchored_both_ends() {
    let event = obj(vec![("kind", s("level"))]);
    assert!(matches(&event, "kind:lev*"));
    assert!(matches(&event, "kind:*vel"));
    assert!(!matches(&event, "kind:ev*"));

    let event = obj(vec![("kind", s("elevated"))]);
    assert!(!matches(&event, "kind:lev*"));
}

#[test]
fn test_name_key_gets_an_implicit_prefix_glob() {
    let event = sample_event();
    assert!(matches(&event, "name:engine"));
    assert!(matches(&event, "name:engine.st"));
    // other keys stay exact
    assert!(!matches(&event, "level:gre"));
}

#[test]
fn test_field_keys_are_case_insensitive() {
    let event = sample_event();
    assert!(matches(&event, "LEVEL:green"));
    assert!(matches(&event, "Level:GREEN"));
}

#[test]
fn test_numbers_match_by_exact_text() {
    let event = sample_event();
    assert!(matches(&event, "latency:120"));
    assert!(!matches(&event, "latency:12"));
    // globs never match numbers
    assert!(!matches(&event, "latency:1*"));
}

#[test]
fn test_booleans_match_true_false() {
    let event = sample_event();
    assert!(matches(&event, "ok:true"));
    assert!(matches(&event, "ok:TRUE"));
    assert!(!matches(&event, "ok:false"));
    assert!(!matches(&event, "ok:1"));
}

#[test]
fn test_sequences_match_elementwise() {
    let event = sample_event();
    assert!(matches(&event, "tags:boot"));
    assert!(matches(&event, "tags:bo*"));
    assert!(!matches(&event, "tags:bo"));
}

#[test]
fn test_phrase_values_match_with_spaces() {
    let event = sample_event();
    assert!(matches(&event, "description:\"db write failed\""));
    assert!(matches(&event, "\"db write failed\""));
    assert!(!matches(&event, "description:\"db write\""));
}

#[test]
fn test_contains_operator() {
    let event = sample_event();
    assert!(matches(&event, "level~ree"));
    assert!(matches(&event, "name~START"));
    assert!(!matches(&event, "level~red"));
}

// ============================================================================
// Comparisons
// ============================================================================

#[test]
fn test_numeric_comparisons() {
    let event = sample_event();
    assert!(matches(&event, "latency>100"));
    assert!(matches(&event, "latency>=120"));
    assert!(!matches(&event, "latency>120"));
    assert!(!matches(&event, "latency<100"));
    assert!(matches(&event, "latency<=120"));
}

#[test]
fn test_non_numeric_operands_never_match() {
    let event = sample_event();
    // string field: no match, no error
    assert!(!matches(&event, "level>5"));
    assert!(!matches(&event, "level<5"));
    // non-numeric comparison value
    assert!(!matches(&event, "latency>fast"));
}

#[test]
fn test_numeric_strings_coerce() {
    let event = obj(vec![("latency", s("120"))]);
    assert!(matches(&event, "latency>100"));
    assert!(!matches(&event, "latency>200"));
}

// ============================================================================
// Deep scans and key names
// ============================================================================

#[test]
fn test_deep_scan_reaches_nested_fields() {
    let event = sample_event();
    assert!(matches(&event, "$.code:500"));
    assert!(!matches(&event, "code:500"));
    assert!(matches(&event, "$.code>400"));
    assert!(matches(&event, "data$.code:500"));
}

#[test]
fn test_key_name_queries() {
    let event = sample_event();
    assert!(matches(&event, "$:latency"));
    assert!(matches(&event, "$:code")); // nested keys count
    assert!(!matches(&event, "$:nope"));
    assert!(matches(&event, "$:lat*"));
    assert!(matches(&event, "$~lat"));
    // comparison operators are meaningless on the sentinel
    assert!(!matches(&event, "$>5"));
}

// ============================================================================
// Engine facade
// ============================================================================

#[test]
fn test_recompiling_a_literal_query_is_a_cache_hit() {
    let mut engine = QueryEngine::new();
    let first = engine.compile("level:green OR level:red").unwrap();
    let second = engine.compile("level:green OR level:red").unwrap();
    assert!(Rc::ptr_eq(&first, &second));

    // the cache key is the literal string; spelling matters
    let third = engine.compile("level:green OR LEVEL:red").unwrap();
    assert!(!Rc::ptr_eq(&first, &third));
}

#[test]
fn test_compile_errors_leave_the_cache_usable() {
    let mut engine = QueryEngine::new();
    let good = engine.compile("level:green").unwrap();

    let err = engine.compile("field:").unwrap_err();
    assert!(err.position() <= "field:".len());
    let err = engine.compile("(a").unwrap_err();
    assert!(err.position() <= "(a".len());

    let again = engine.compile("level:green").unwrap();
    assert!(Rc::ptr_eq(&good, &again));
    assert!(good.matches(&sample_event()));
}

#[test]
fn test_filter_and_indices() {
    let events = vec![
        sample_event(),
        obj(vec![("name", s("db.flush")), ("level", s("red"))]),
        obj(vec![("name", s("engine.stop")), ("level", s("green"))]),
    ];
    let mut engine = QueryEngine::new();

    let matched = engine.filter(&events, "level:green").unwrap();
    assert_eq!(matched.len(), 2);

    let indices = engine.filter_indices(&events, "level:red").unwrap();
    assert_eq!(indices, vec![1]);

    // blank queries match everything without parsing
    assert_eq!(engine.filter(&events, "  ").unwrap().len(), 3);
    assert_eq!(engine.filter_indices(&events, "").unwrap(), vec![0, 1, 2]);
}

#[test]
fn test_filter_any_is_a_union() {
    let events = vec![
        sample_event(),
        obj(vec![("name", s("db.flush")), ("level", s("red"))]),
        obj(vec![("name", s("engine.stop")), ("level", s("yellow"))]),
    ];
    let mut engine = QueryEngine::new();

    let queries = vec!["level:red".to_string(), "level:yellow".to_string()];
    assert_eq!(engine.filter_any(&events, &queries).unwrap().len(), 2);

    // no active queries means everything
    assert_eq!(engine.filter_any(&events, &[]).unwrap().len(), 3);
    let blank = vec!["  ".to_string()];
    assert_eq!(engine.filter_any(&events, &blank).unwrap().len(), 3);
}

#[test]
fn test_field_handlers_override_default_rules() {
    let mut engine = QueryEngine::new();
    let predicate = engine.compile("level:anything").unwrap();

    let mut evaluator = Evaluator::new();
    evaluator.on_field(
        "level",
        Box::new(|_event, value, _op| value == "anything"),
    );

    let event = sample_event();
    assert!(!predicate.matches(&event));
    assert!(predicate.matches_with(&event, &evaluator));
}

#[test]
fn test_predicates_are_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Predicate>();
}

// ============================================================================
// Search worker
// ============================================================================

#[test]
fn test_worker_returns_matching_indices() {
    let events = vec![
        sample_event(),
        obj(vec![("name", s("db.flush")), ("level", s("red"))]),
        obj(vec![("name", s("engine.stop")), ("level", s("green"))]),
    ];
    let mut worker = SearchWorker::spawn(events).unwrap();

    assert_eq!(worker.search("level:green").unwrap(), vec![0, 2]);
    assert_eq!(worker.search("level:red").unwrap(), vec![1]);
    // a blank query reports every index
    assert_eq!(worker.search("").unwrap(), vec![0, 1, 2]);
    // a malformed query fails that search only and reports nothing
    assert_eq!(worker.search("field:").unwrap(), Vec::<usize>::new());
    assert_eq!(worker.search("engine").unwrap(), vec![0, 2]);

    worker.shutdown();
}

#[test]
fn test_worker_owns_its_own_copy() {
    let events = vec![sample_event()];
    let worker_events = events.clone();
    let mut worker = SearchWorker::spawn(worker_events).unwrap();

    drop(events);
    assert_eq!(worker.search("level:green").unwrap(), vec![0]);
    worker.shutdown();
}
