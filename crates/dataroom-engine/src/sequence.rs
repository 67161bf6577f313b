//! Sequential id allocation.
//!
//! Both counters start at 1 and only ever advance by one, and only when a
//! transaction that allocated from them commits.

use dataroom_core::SequenceKind;

/// The two named id counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceAllocator {
    next_dataset: u64,
    next_request: u64,
}

impl SequenceAllocator {
    /// Both counters at 1.
    pub fn new() -> Self {
        Self {
            next_dataset: 1,
            next_request: 1,
        }
    }

    /// Restore persisted counters.
    pub fn restore(next_dataset: u64, next_request: u64) -> Self {
        Self {
            next_dataset: next_dataset.max(1),
            next_request: next_request.max(1),
        }
    }

    /// The id the next allocation of `kind` will return.
    pub fn peek(&self, kind: SequenceKind) -> u64 {
        match kind {
            SequenceKind::Dataset => self.next_dataset,
            SequenceKind::Request => self.next_request,
        }
    }

    /// Return the current value and advance it by one.
    pub fn next(&mut self, kind: SequenceKind) -> u64 {
        let slot = match kind {
            SequenceKind::Dataset => &mut self.next_dataset,
            SequenceKind::Request => &mut self.next_request,
        };
        let id = *slot;
        *slot += 1;
        id
    }

    /// Number of ids handed out so far.
    pub fn issued(&self, kind: SequenceKind) -> u64 {
        self.peek(kind) - 1
    }

    /// Whether `id` has been allocated, i.e. lies in `[1, next)`.
    pub fn contains(&self, kind: SequenceKind, id: u64) -> bool {
        id >= 1 && id < self.peek(kind)
    }
}

impl Default for SequenceAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_counters_are_independent() {
        let mut seq = SequenceAllocator::new();

        assert_eq!(seq.next(SequenceKind::Dataset), 1);
        assert_eq!(seq.next(SequenceKind::Dataset), 2);
        assert_eq!(seq.next(SequenceKind::Request), 1);

        assert_eq!(seq.issued(SequenceKind::Dataset), 2);
        assert_eq!(seq.issued(SequenceKind::Request), 1);
    }

    #[test]
    fn test_contains_range() {
        let mut seq = SequenceAllocator::new();
        assert!(!seq.contains(SequenceKind::Dataset, 1));

        seq.next(SequenceKind::Dataset);
        assert!(!seq.contains(SequenceKind::Dataset, 0));
        assert!(seq.contains(SequenceKind::Dataset, 1));
        assert!(!seq.contains(SequenceKind::Dataset, 2));
    }

    #[test]
    fn test_restore_never_below_one() {
        let seq = SequenceAllocator::restore(0, 5);
        assert_eq!(seq.peek(SequenceKind::Dataset), 1);
        assert_eq!(seq.peek(SequenceKind::Request), 5);
    }

    proptest! {
        #[test]
        fn prop_allocation_is_gapless(kinds in prop::collection::vec(any::<bool>(), 0..64)) {
            let mut seq = SequenceAllocator::new();
            let mut datasets = Vec::new();
            let mut requests = Vec::new();

            for is_dataset in kinds {
                if is_dataset {
                    datasets.push(seq.next(SequenceKind::Dataset));
                } else {
                    requests.push(seq.next(SequenceKind::Request));
                }
            }

            prop_assert_eq!(&datasets, &(1..=datasets.len() as u64).collect::<Vec<_>>());
            prop_assert_eq!(&requests, &(1..=requests.len() as u64).collect::<Vec<_>>());
            prop_assert_eq!(seq.peek(SequenceKind::Dataset), datasets.len() as u64 + 1);
            prop_assert_eq!(seq.issued(SequenceKind::Request), requests.len() as u64);
        }
    }
}
