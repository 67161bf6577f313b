//! Signed command dispatch.
//!
//! A [`SignedCommand`] is checked in order: signature, then nonce, then the
//! guards of the operation it carries. The nonce bump is staged in the same
//! change set as the operation.

use dataroom_core::{
    Command, EncryptionOracle, Mutation, Outcome, Principal, Result, SignedCommand,
    ValidationError,
};

use crate::txn::Transaction;

impl<O: EncryptionOracle + ?Sized> Transaction<'_, O> {
    /// Verify and run a signed command on behalf of its signer.
    pub fn execute(&mut self, signed: &SignedCommand) -> Result<Outcome> {
        signed.verify()?;

        let last = self.last_nonce(&signed.signer);
        if signed.nonce <= last {
            return Err(ValidationError::StaleNonce {
                got: signed.nonce,
                last,
            }
            .into());
        }

        let outcome = self.dispatch(signed.signer, &signed.command)?;
        self.push(Mutation::SetNonce {
            principal: signed.signer,
            nonce: signed.nonce,
        });

        Ok(outcome)
    }

    /// Run `command` with `caller` as the acting principal.
    pub fn dispatch(&mut self, caller: Principal, command: &Command) -> Result<Outcome> {
        match command {
            Command::ContributeData {
                value,
                quality_score,
                metadata_hash,
                is_public,
            } => self
                .contribute(caller, *value, *quality_score, metadata_hash, *is_public)
                .map(Outcome::Dataset),
            Command::RequestDataAccess {
                topic,
                budget,
                deadline,
            } => self
                .submit_request(caller, topic, *budget, *deadline)
                .map(Outcome::Request),
            Command::GrantDataAccess {
                dataset_id,
                accessor,
            } => self
                .grant(caller, *dataset_id, *accessor)
                .map(|()| Outcome::Done),
            Command::UpdateQualityScore {
                dataset_id,
                new_score,
            } => self
                .update_quality_score(caller, *dataset_id, *new_score)
                .map(|()| Outcome::Done),
            Command::DistributeReward {
                contributor,
                dataset_id,
                amount,
            } => self
                .distribute_reward(caller, *contributor, *dataset_id, *amount)
                .map(|()| Outcome::Done),
            Command::DeactivateDataset { dataset_id } => self
                .deactivate(caller, *dataset_id)
                .map(|()| Outcome::Done),
        }
    }
}
