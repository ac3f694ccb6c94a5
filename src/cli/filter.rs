//! Run sift queries against a JSON array of events

use log::info;

use super::{CliError, json_to_event};
use crate::{QueryEngine, Value};

/// Options for the filter command
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    /// Queries to apply; an event matches if it satisfies any of them
    pub queries: Vec<String>,
    /// JSON input text (an array of event records)
    pub input: Option<String>,
    /// Report matching indices instead of the events themselves
    pub indices: bool,
}

/// Result of a filter operation
#[derive(Debug)]
pub enum FilterOutput {
    Events(Vec<Value>),
    Indices(Vec<usize>),
}

/// Parse the input text into an event collection
pub fn load_events(json: &str) -> Result<Vec<Value>, CliError> {
    let parsed: serde_json::Value = serde_json::from_str(json).map_err(CliError::Json)?;
    let serde_json::Value::Array(items) = parsed else {
        return Err(CliError::NotAnArray);
    };
    Ok(items.into_iter().map(json_to_event).collect())
}

/// Execute a sift filter operation
pub fn execute_filter(options: &FilterOptions) -> Result<FilterOutput, CliError> {
    let json = options.input.as_ref().ok_or(CliError::NoInput)?;
    let events = load_events(json)?;

    let mut engine = QueryEngine::new();

    if options.indices {
        // index reporting takes a single query
        let query = options.queries.first().map(String::as_str).unwrap_or("");
        let indices = engine
            .filter_indices(&events, query)
            .map_err(CliError::Parse)?;
        info!("{}/{} events matched", indices.len(), events.len());
        return Ok(FilterOutput::Indices(indices));
    }

    let matched = engine
        .filter_any(&events, &options.queries)
        .map_err(CliError::Parse)?;
    info!("{}/{} events matched", matched.len(), events.len());
    Ok(FilterOutput::Events(matched.into_iter().cloned().collect()))
}
