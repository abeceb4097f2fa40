//! State store boundary.
//!
//! The aggregator owns every persisted key exclusively; no other
//! component mutates them. Persistence is a serialize/deserialize
//! boundary at the edges of the core: implementations write the whole
//! snapshot in one atomic batch, so a concurrent reader never sees a
//! partial update.

use thiserror::Error;

use crate::aggregator::AggregatorState;

/// Failures crossing the persistence boundary. Never swallowed inside
/// the core; they propagate to the caller untouched.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store read failure: {0}")]
    Read(String),
    #[error("store write failure: {0}")]
    Write(String),
    /// The store held some but not all state keys. Defaults are applied
    /// only to a provably empty store, never to a partial one.
    #[error("store state incomplete: missing {0}")]
    Incomplete(String),
}

/// Durable storage for the aggregator snapshot.
pub trait StateStore {
    /// Read back the last committed snapshot. `Ok(None)` means the
    /// store is provably empty (first run); a partially populated store
    /// is an error, not a default.
    fn load(&self) -> Result<Option<AggregatorState>, StoreError>;

    /// Durably replace the snapshot. All fields land together or not at
    /// all.
    fn commit(&mut self, state: &AggregatorState) -> Result<(), StoreError>;
}

/// In-memory store for tests and replay verification.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Option<AggregatorState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last committed snapshot, if any.
    pub fn snapshot(&self) -> Option<&AggregatorState> {
        self.state.as_ref()
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<Option<AggregatorState>, StoreError> {
        Ok(self.state.clone())
    }

    fn commit(&mut self, state: &AggregatorState) -> Result<(), StoreError> {
        self.state = Some(state.clone());
        Ok(())
    }
}
