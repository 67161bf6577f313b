//! # Dataroom Core
//!
//! Pure primitives for the Dataroom registry: principals, opaque ciphertext
//! handles, dataset/request/reward records, events, and change sets.
//!
//! This crate contains no I/O, no storage, no networking. The confidential
//! computation collaborator is only described here, by the
//! [`EncryptionOracle`] trait; implementations live elsewhere.
//!
//! ## Key Types
//!
//! - [`Principal`] - An identity (Ed25519 public key)
//! - [`CipherHandle`] - Opaque reference to a value wrapped by the oracle
//! - [`Dataset`], [`DataRequest`], [`Contribution`] - Registry records
//! - [`RegistryEvent`] - Notifications emitted by committed operations
//! - [`ChangeSet`] - The write set of one atomic transaction
//! - [`SignedCommand`] - An operation authenticated by its caller
//!
//! ## Errors
//!
//! Every failure maps onto one [`ErrorKind`]: validation, authorization,
//! not-found, state, or an oracle failure.

pub mod changes;
pub mod command;
pub mod crypto;
pub mod error;
pub mod event;
pub mod handle;
pub mod oracle;
pub mod records;
pub mod types;
pub mod validation;

pub use changes::{ChangeSet, Mutation, Snapshot};
pub use command::{Command, Outcome, SignedCommand, COMMAND_DOMAIN};
pub use crypto::{Keypair, Principal, Signature};
pub use error::{ErrorKind, RegistryError, Result, ValidationError};
pub use event::{EventRecord, RegistryEvent};
pub use handle::{BitWidth, CipherHandle, HandleId};
pub use oracle::{EncryptionOracle, OracleError};
pub use records::{
    Contribution, ContributionView, DataRequest, Dataset, DatasetAccess, DatasetView,
    PlatformStats, RequestView, SealedHandles,
};
pub use types::{DatasetId, RequestId, SequenceKind, Timestamp};
pub use validation::{
    validate_deadline, validate_metadata_hash, validate_quality_score, validate_topic,
    MAX_QUALITY_SCORE,
};
