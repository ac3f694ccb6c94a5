//! Parallel search offload.
//!
//! A [`SearchWorker`] is one dedicated thread holding a private copy of the
//! event collection, so a slow scan over a large collection never blocks
//! the caller's thread. Communication is strictly message-based: a request
//! carries a monotonically increasing id, a response carries the same id,
//! and responses whose id is not the most recent outstanding request are
//! discarded — superseded searches cancel implicitly, last query wins.
//!
//! The worker builds its own [`QueryEngine`] from this library; there is
//! exactly one live worker per collection, initialized once and never
//! mutated afterwards.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::{engine::QueryEngine, value::Value};

/// Messages into the worker.
#[derive(Debug)]
pub enum WorkerRequest {
    Init { events: Vec<Value> },
    Query { id: u64, query: String },
}

/// Messages out of the worker.
#[derive(Debug)]
pub enum WorkerResponse {
    Ready,
    Result { id: u64, indices: Vec<usize> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerError {
    /// The worker thread is gone
    Disconnected,
    /// No response within the deadline
    TimedOut,
}

impl std::fmt::Display for WorkerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerError::Disconnected => write!(f, "search worker disconnected"),
            WorkerError::TimedOut => write!(f, "search worker timed out"),
        }
    }
}

impl std::error::Error for WorkerError {}

/// How long [`SearchWorker::search`] waits before giving up on a response.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct SearchWorker {
    requests: Sender<WorkerRequest>,
    responses: Receiver<WorkerResponse>,
    next_id: u64,
    handle: JoinHandle<()>,
}

impl SearchWorker {
    /// Spawn a worker and hand it the collection. Blocks until the worker
    /// reports ready.
    pub fn spawn(events: Vec<Value>) -> Result<Self, WorkerError> {
        let (req_tx, req_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();
        let handle = thread::spawn(move || worker_main(req_rx, resp_tx));

        req_tx
            .send(WorkerRequest::Init { events })
            .map_err(|_| WorkerError::Disconnected)?;
        match resp_rx.recv_timeout(DEFAULT_TIMEOUT) {
            Ok(WorkerResponse::Ready) => {}
            Ok(WorkerResponse::Result { .. }) => return Err(WorkerError::Disconnected),
            Err(RecvTimeoutError::Timeout) => return Err(WorkerError::TimedOut),
            Err(RecvTimeoutError::Disconnected) => return Err(WorkerError::Disconnected),
        }

        Ok(SearchWorker {
            requests: req_tx,
            responses: resp_rx,
            next_id: 0,
            handle,
        })
    }

    /// Run a query on the worker and wait for its matching indices.
    pub fn search(&mut self, query: &str) -> Result<Vec<usize>, WorkerError> {
        self.search_timeout(query, DEFAULT_TIMEOUT)
    }

    /// As [`search`](Self::search), with an explicit deadline. Responses to
    /// superseded requests are discarded while waiting.
    pub fn search_timeout(
        &mut self,
        query: &str,
        timeout: Duration,
    ) -> Result<Vec<usize>, WorkerError> {
        self.next_id += 1;
        let id = self.next_id;
        self.requests
            .send(WorkerRequest::Query {
                id,
                query: query.to_string(),
            })
            .map_err(|_| WorkerError::Disconnected)?;

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.responses.recv_timeout(remaining) {
                Ok(WorkerResponse::Result { id: got, indices }) if got == id => {
                    return Ok(indices);
                }
                Ok(WorkerResponse::Result { id: got, .. }) => {
                    debug!("discarding stale search result {}", got);
                }
                Ok(WorkerResponse::Ready) => {}
                Err(RecvTimeoutError::Timeout) => return Err(WorkerError::TimedOut),
                Err(RecvTimeoutError::Disconnected) => return Err(WorkerError::Disconnected),
            }
        }
    }

    /// Stop the worker and wait for it to exit. Dropping the worker also
    /// stops it, without the join.
    pub fn shutdown(self) {
        let SearchWorker {
            requests,
            responses,
            handle,
            ..
        } = self;
        drop(requests);
        drop(responses);
        let _ = handle.join();
    }
}

fn worker_main(requests: Receiver<WorkerRequest>, responses: Sender<WorkerResponse>) {
    let mut engine = QueryEngine::new();
    let mut events: Vec<Value> = Vec::new();

    while let Ok(request) = requests.recv() {
        match request {
            WorkerRequest::Init {
                events: collection,
            } => {
                events = collection;
                debug!("search worker ready with {} events", events.len());
                if responses.send(WorkerResponse::Ready).is_err() {
                    return;
                }
            }
            WorkerRequest::Query { id, query } => {
                let indices = match engine.filter_indices(&events, &query) {
                    Ok(indices) => indices,
                    Err(err) => {
                        // a malformed query fails that search only
                        warn!("query {:?} failed to compile: {}", query, err);
                        Vec::new()
                    }
                };
                if responses
                    .send(WorkerResponse::Result { id, indices })
                    .is_err()
                {
                    return;
                }
            }
        }
    }
}
