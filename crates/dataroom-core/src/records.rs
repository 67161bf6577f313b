//! Registry records and the public projections returned by reads.
//!
//! Records hold ciphertext handles; views never do, except
//! [`SealedHandles`], which is only handed to principals with decryption
//! rights.

use serde::{Deserialize, Serialize};

use crate::crypto::Principal;
use crate::handle::CipherHandle;
use crate::types::{DatasetId, RequestId, Timestamp};

/// A contributed dataset reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    /// Sequential id, starting at 1.
    pub id: DatasetId,

    /// Who registered it. Immutable.
    pub contributor: Principal,

    /// Encrypted dataset value.
    pub value_handle: CipherHandle,

    /// Encrypted quality score. Replaced on rescoring.
    pub quality_handle: CipherHandle,

    /// Content-addressed reference to off-registry content. Non-empty, immutable.
    pub metadata_hash: String,

    /// Whether any principal may read the public fields.
    pub is_public: bool,

    /// Creation time. Immutable.
    pub created_at: Timestamp,

    /// Number of successful grants.
    pub access_count: u64,

    /// Starts true; once false, stays false.
    pub is_active: bool,
}

impl Dataset {
    /// The non-confidential projection of this dataset.
    pub fn view(&self) -> DatasetView {
        DatasetView {
            id: self.id,
            contributor: self.contributor,
            metadata_hash: self.metadata_hash.clone(),
            is_public: self.is_public,
            created_at: self.created_at,
            access_count: self.access_count,
            is_active: self.is_active,
        }
    }
}

/// Public fields of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetView {
    pub id: DatasetId,
    pub contributor: Principal,
    pub metadata_hash: String,
    pub is_public: bool,
    pub created_at: Timestamp,
    pub access_count: u64,
    pub is_active: bool,
}

/// What a permitted reader gets back from `access_dataset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetAccess {
    pub metadata_hash: String,
    pub created_at: Timestamp,
    pub access_count: u64,
}

impl From<DatasetView> for DatasetAccess {
    fn from(view: DatasetView) -> Self {
        Self {
            metadata_hash: view.metadata_hash,
            created_at: view.created_at,
            access_count: view.access_count,
        }
    }
}

/// Ciphertext handles of a dataset, for principals that may decrypt them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedHandles {
    pub value: CipherHandle,
    pub quality: CipherHandle,
}

/// A solicitation for data access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRequest {
    /// Sequential id, starting at 1.
    pub id: RequestId,

    /// Who asked. Immutable.
    pub requester: Principal,

    /// What is being asked for. Non-empty, immutable.
    pub topic: String,

    /// Encrypted offered budget.
    pub budget_handle: CipherHandle,

    /// Strictly after the creation time. Immutable.
    pub deadline: Timestamp,

    /// Reserved for a fulfilment workflow; never set by this registry.
    pub is_fulfilled: bool,

    /// Reserved for a fulfilment workflow; never appended to by this registry.
    pub approved_datasets: Vec<DatasetId>,
}

impl DataRequest {
    /// The non-confidential projection of this request.
    pub fn view(&self) -> RequestView {
        RequestView {
            id: self.id,
            requester: self.requester,
            topic: self.topic.clone(),
            deadline: self.deadline,
            is_fulfilled: self.is_fulfilled,
        }
    }
}

/// Public fields of a data request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestView {
    pub id: RequestId,
    pub requester: Principal,
    pub topic: String,
    pub deadline: Timestamp,
    pub is_fulfilled: bool,
}

/// One reward disbursed to a contributor for a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub dataset_id: DatasetId,
    pub reward_handle: CipherHandle,
    /// Reserved for a claim workflow; never set by this registry.
    pub reward_claimed: bool,
}

impl Contribution {
    pub fn view(&self) -> ContributionView {
        ContributionView {
            dataset_id: self.dataset_id,
            reward_claimed: self.reward_claimed,
        }
    }
}

/// Public fields of a reward record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionView {
    pub dataset_id: DatasetId,
    pub reward_claimed: bool,
}

/// Registry-wide counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformStats {
    pub total_datasets: u64,
    pub total_requests: u64,
    pub current_time: Timestamp,
}
