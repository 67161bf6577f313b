//! Read-only rollups.

use dataroom_core::{PlatformStats, SequenceKind, Timestamp};

use crate::state::RegistryState;

impl RegistryState {
    /// Totals derived from the id counters.
    pub fn stats(&self, now: Timestamp) -> PlatformStats {
        PlatformStats {
            total_datasets: self.sequences.issued(SequenceKind::Dataset),
            total_requests: self.sequences.issued(SequenceKind::Request),
            current_time: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Transaction;
    use dataroom_core::Keypair;
    use dataroom_oracle::LocalOracle;

    #[test]
    fn test_stats_follow_counters() {
        let oracle = LocalOracle::new();
        let p = Keypair::from_seed(&[1; 32]).principal();
        let mut state = RegistryState::genesis(p);

        assert_eq!(
            state.stats(Timestamp(10)),
            PlatformStats {
                total_datasets: 0,
                total_requests: 0,
                current_time: Timestamp(10)
            }
        );

        let mut tx = Transaction::new(&state, &oracle, Timestamp(10));
        tx.contribute(p, 1, 1, "QmA", false).unwrap();
        tx.contribute(p, 2, 2, "QmB", false).unwrap();
        tx.submit_request(p, "topic", 3, Timestamp(20)).unwrap();
        let changes = tx.into_changes();
        state.apply(&changes);

        let stats = state.stats(Timestamp(11));
        assert_eq!(stats.total_datasets, 2);
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.current_time, Timestamp(11));
    }
}
