// ABOUTME: Score aggregation: one rating per finished ticket, batched per public session
// ABOUTME: Batches are idempotent per ticket and flushed exactly once when complete
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! Per-session score batches. The aggregator only accumulates; the
//! coordinator decides when a batch is complete (score count equals the
//! session's finished-ticket count) and flushes it atomically with the
//! session cleanup.

use crate::models::Score;
use std::collections::HashMap;
use uuid::Uuid;

/// Scores accumulated for the sessions of one company
#[derive(Debug, Default)]
pub struct ScoreAggregator {
    batches: HashMap<Uuid, HashMap<Uuid, u8>>,
}

impl ScoreAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a score. Resubmission for the same ticket overwrites.
    pub fn record(&mut self, session_id: Uuid, ticket_id: Uuid, value: u8) {
        self.batches
            .entry(session_id)
            .or_default()
            .insert(ticket_id, value);
    }

    /// Number of scores accumulated for a session
    pub fn batch_len(&self, session_id: Uuid) -> usize {
        self.batches.get(&session_id).map_or(0, HashMap::len)
    }

    /// Remove and return the session's batch as scores, unordered.
    /// Empty batches yield an empty vec.
    pub fn take_batch(&mut self, session_id: Uuid) -> Vec<Score> {
        self.batches
            .remove(&session_id)
            .map(|batch| {
                batch
                    .into_iter()
                    .map(|(ticket_id, value)| Score { ticket_id, value })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_is_idempotent_per_ticket() {
        let mut agg = ScoreAggregator::new();
        let session = Uuid::new_v4();
        let ticket = Uuid::new_v4();

        agg.record(session, ticket, 3);
        agg.record(session, ticket, 5);
        assert_eq!(agg.batch_len(session), 1);

        let batch = agg.take_batch(session);
        assert_eq!(batch, vec![Score { ticket_id: ticket, value: 5 }]);
    }

    #[test]
    fn test_take_batch_removes() {
        let mut agg = ScoreAggregator::new();
        let session = Uuid::new_v4();
        agg.record(session, Uuid::new_v4(), 1);
        assert_eq!(agg.take_batch(session).len(), 1);
        assert_eq!(agg.batch_len(session), 0);
        assert!(agg.take_batch(session).is_empty());
    }

    #[test]
    fn test_batches_are_per_session() {
        let mut agg = ScoreAggregator::new();
        let s1 = Uuid::new_v4();
        let s2 = Uuid::new_v4();
        agg.record(s1, Uuid::new_v4(), 2);
        agg.record(s2, Uuid::new_v4(), 4);
        assert_eq!(agg.batch_len(s1), 1);
        assert_eq!(agg.batch_len(s2), 1);

        agg.take_batch(s1);
        assert_eq!(agg.batch_len(s1), 0);
        assert_eq!(agg.batch_len(s2), 1);
    }
}
