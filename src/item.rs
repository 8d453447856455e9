use crate::error::ProxyError;
use std::time::Instant;
use tokio::sync::oneshot;

pub const MAX_BATCH: usize = 5;

/// Normalized customer class. Anything other than `A`/`B` on the wire
/// folds to `A` rather than crashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Customer {
    A,
    B,
}

impl Customer {
    /// Parses a raw `X-Customer-Id` header value. Case-insensitive;
    /// anything that isn't exactly "B" (uppercased) becomes `A`.
    pub fn from_header(raw: Option<&str>) -> Self {
        match raw.map(|s| s.to_ascii_uppercase()) {
            Some(ref s) if s == "B" => Customer::B,
            _ => Customer::A,
        }
    }
}

pub type Completion = oneshot::Sender<Result<Vec<String>, ProxyError>>;

/// One accepted client request awaiting a downstream label for each
/// of its sequences.
pub struct Item {
    pub id: u64,
    pub customer: Customer,
    pub sequences: Vec<String>,
    pub max_len: usize,
    pub arrived_at: Instant,
    pub completion: Option<Completion>,
}

impl Item {
    pub fn new(id: u64, customer: Customer, sequences: Vec<String>) -> Self {
        let max_len = sequences.iter().map(|s| s.len()).max().unwrap_or(0);
        Self {
            id,
            customer,
            max_len,
            sequences,
            arrived_at: Instant::now(),
            completion: None,
        }
    }

    pub fn seq_count(&self) -> usize {
        self.sequences.len()
    }

    /// Milliseconds elapsed since `arrived_at`. Takes the instant rather
    /// than `&self` so the dispatch path can capture it before the item
    /// moves into a queue and report it after completion resolves.
    pub fn latency_ms(arrived_at: Instant) -> i64 {
        arrived_at.elapsed().as_millis() as i64
    }

    /// Resolves the item's completion handle exactly once. A second
    /// call is a silent no-op (double-resolution suppression).
    pub fn resolve(&mut self, result: Result<Vec<String>, ProxyError>) {
        if let Some(tx) = self.completion.take() {
            let _ = tx.send(result);
        }
    }
}
