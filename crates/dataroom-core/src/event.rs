//! Notifications emitted by committed operations.

use serde::{Deserialize, Serialize};

use crate::crypto::Principal;
use crate::types::{DatasetId, RequestId, Timestamp};

/// A registry notification.
///
/// Emitted only when the transaction that produced it commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryEvent {
    DatasetContributed {
        dataset_id: DatasetId,
        contributor: Principal,
        metadata_hash: String,
    },
    DataRequested {
        request_id: RequestId,
        requester: Principal,
        topic: String,
    },
    DatasetAccessed {
        dataset_id: DatasetId,
        accessor: Principal,
    },
    /// Carries the plaintext score on purpose: rescoring is audited publicly.
    QualityScoreUpdated {
        dataset_id: DatasetId,
        new_score: u8,
    },
    RewardDistributed {
        contributor: Principal,
        dataset_id: DatasetId,
    },
}

impl RegistryEvent {
    /// Event name, as used in logs.
    pub const fn name(&self) -> &'static str {
        match self {
            RegistryEvent::DatasetContributed { .. } => "DatasetContributed",
            RegistryEvent::DataRequested { .. } => "DataRequested",
            RegistryEvent::DatasetAccessed { .. } => "DatasetAccessed",
            RegistryEvent::QualityScoreUpdated { .. } => "QualityScoreUpdated",
            RegistryEvent::RewardDistributed { .. } => "RewardDistributed",
        }
    }
}

/// An event as persisted in the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Store-assigned position in the log, strictly increasing from 1.
    pub seq: u64,
    /// Commit time of the emitting transaction.
    pub at: Timestamp,
    pub event: RegistryEvent,
}

impl EventRecord {
    /// Serialize the event body to CBOR bytes.
    pub fn event_bytes(
        event: &RegistryEvent,
    ) -> Result<Vec<u8>, ciborium::ser::Error<std::io::Error>> {
        let mut buf = Vec::new();
        ciborium::into_writer(event, &mut buf)?;
        Ok(buf)
    }

    /// Deserialize an event body from CBOR bytes.
    pub fn event_from_bytes(
        bytes: &[u8],
    ) -> Result<RegistryEvent, ciborium::de::Error<std::io::Error>> {
        ciborium::from_reader(bytes)
    }
}
