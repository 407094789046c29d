//! Last-result-wins bookkeeping for overlapping queries.
//!
//! Every filter change starts a new generation. A result may be applied
//! only while its ticket is still the newest one; anything older is
//! discarded on arrival.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared generation counter.
#[derive(Debug, Clone, Default)]
pub struct QueryGeneration {
    current: Arc<AtomicU64>,
}

/// Identifies one issued query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueryTicket(u64);

impl QueryTicket {
    /// The raw generation number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl QueryGeneration {
    /// Creates a counter at generation zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new generation, superseding every earlier ticket.
    pub fn begin(&self) -> QueryTicket {
        QueryTicket(self.current.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Whether `ticket` is still the newest generation.
    #[must_use]
    pub fn is_current(&self, ticket: QueryTicket) -> bool {
        self.current.load(Ordering::Acquire) == ticket.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_ticket_supersedes_older() {
        let generation = QueryGeneration::new();
        let first = generation.begin();
        assert!(generation.is_current(first));

        let second = generation.begin();
        assert!(!generation.is_current(first));
        assert!(generation.is_current(second));
        assert!(second > first);
    }

    #[test]
    fn clones_share_the_counter() {
        let generation = QueryGeneration::new();
        let other = generation.clone();
        let ticket = generation.begin();
        other.begin();
        assert!(!generation.is_current(ticket));
    }
}
