//! Signed commands.
//!
//! A [`SignedCommand`] lets a principal prove it issued an operation. The
//! signed message is the domain tag followed by the CBOR encoding of
//! `(signer, nonce, command)`.

use serde::{Deserialize, Serialize};

use crate::crypto::{Keypair, Principal, Signature};
use crate::error::RegistryError;
use crate::types::{DatasetId, RequestId, Timestamp};

/// Domain separation tag for command signatures.
pub const COMMAND_DOMAIN: &[u8] = b"dataroom-command-v0";

/// A mutating registry operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    ContributeData {
        value: u64,
        quality_score: u8,
        metadata_hash: String,
        is_public: bool,
    },
    RequestDataAccess {
        topic: String,
        budget: u64,
        deadline: Timestamp,
    },
    GrantDataAccess {
        dataset_id: DatasetId,
        accessor: Principal,
    },
    UpdateQualityScore {
        dataset_id: DatasetId,
        new_score: u8,
    },
    DistributeReward {
        contributor: Principal,
        dataset_id: DatasetId,
        amount: u64,
    },
    DeactivateDataset {
        dataset_id: DatasetId,
    },
}

impl Command {
    /// Operation name, as used in logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Command::ContributeData { .. } => "contribute_data",
            Command::RequestDataAccess { .. } => "request_data_access",
            Command::GrantDataAccess { .. } => "grant_data_access",
            Command::UpdateQualityScore { .. } => "update_quality_score",
            Command::DistributeReward { .. } => "distribute_reward",
            Command::DeactivateDataset { .. } => "deactivate_dataset",
        }
    }
}

/// What a committed command produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Dataset(DatasetId),
    Request(RequestId),
    Done,
}

/// A command together with its author's signature.
#[derive(Debug, Clone)]
pub struct SignedCommand {
    pub signer: Principal,
    /// Must exceed the signer's last accepted nonce.
    pub nonce: u64,
    pub command: Command,
    pub signature: Signature,
}

impl SignedCommand {
    /// Sign `command` with `keypair`.
    pub fn sign(keypair: &Keypair, nonce: u64, command: Command) -> Self {
        let signer = keypair.principal();
        let signature = keypair.sign(&signing_message(&signer, nonce, &command));
        Self {
            signer,
            nonce,
            command,
            signature,
        }
    }

    /// Check the signature against the claimed signer.
    pub fn verify(&self) -> Result<(), RegistryError> {
        let message = signing_message(&self.signer, self.nonce, &self.command);
        self.signer.verify(&message, &self.signature)
    }
}

/// Construct the signed message.
pub fn signing_message(signer: &Principal, nonce: u64, command: &Command) -> Vec<u8> {
    let mut buf = COMMAND_DOMAIN.to_vec();
    let _ = ciborium::into_writer(&(signer, nonce, command), &mut buf);
    buf
}
