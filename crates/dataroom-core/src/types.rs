//! Strong type definitions for registry identifiers and time.
//!
//! All identifiers are newtypes to prevent mixing the dataset and request
//! id spaces at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a dataset. Allocated sequentially from 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DatasetId(pub u64);

/// Identifier of a data request. Allocated sequentially from 1, independent
/// of dataset ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dataset#{}", self.0)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request#{}", self.0)
    }
}

/// Unix time in seconds, as reported by the execution environment.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Seconds since the Unix epoch.
    pub const fn as_secs(&self) -> u64 {
        self.0
    }

    /// This timestamp shifted forward by `secs`, saturating.
    pub const fn plus(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The named id counters kept by the sequence allocator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SequenceKind {
    Dataset,
    Request,
}

impl SequenceKind {
    /// Stable name used as a storage key.
    pub const fn name(&self) -> &'static str {
        match self {
            SequenceKind::Dataset => "dataset",
            SequenceKind::Request => "request",
        }
    }

    /// Parse a storage key.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "dataset" => Some(SequenceKind::Dataset),
            "request" => Some(SequenceKind::Request),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_kind_names() {
        for kind in [SequenceKind::Dataset, SequenceKind::Request] {
            assert_eq!(SequenceKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(SequenceKind::from_name("reward"), None);
    }

    #[test]
    fn test_timestamp_plus_saturates() {
        assert_eq!(Timestamp(10).plus(5), Timestamp(15));
        assert_eq!(Timestamp(u64::MAX).plus(1), Timestamp(u64::MAX));
    }
}
