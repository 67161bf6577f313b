//! Reward bookkeeping.

use dataroom_core::{
    Contribution, ContributionView, DatasetId, EncryptionOracle, Mutation, Principal,
    RegistryError, RegistryEvent, Result, ValidationError,
};

use crate::state::RegistryState;
use crate::txn::Transaction;
use crate::widths;

impl<O: EncryptionOracle + ?Sized> Transaction<'_, O> {
    /// Record a reward for the contributor of a dataset.
    ///
    /// Authority only. The dataset may be inactive, but its contributor must
    /// be exactly `contributor`.
    pub fn distribute_reward(
        &mut self,
        caller: Principal,
        contributor: Principal,
        dataset_id: DatasetId,
        amount: u64,
    ) -> Result<()> {
        self.require_authority(&caller)?;
        let dataset = self.existing_dataset(dataset_id)?;
        if dataset.contributor != contributor {
            return Err(RegistryError::Validation(
                ValidationError::InvalidContributor(dataset_id),
            ));
        }

        let reward_handle = self.seal(amount, widths::REWARD_AMOUNT, &[contributor])?;

        self.push(Mutation::AppendContribution {
            contributor,
            contribution: Contribution {
                dataset_id,
                reward_handle,
                reward_claimed: false,
            },
        });
        self.emit(RegistryEvent::RewardDistributed {
            contributor,
            dataset_id,
        });

        Ok(())
    }
}

impl RegistryState {
    /// Reward records of `contributor`, in the order they were distributed.
    pub fn contributions(&self, contributor: &Principal) -> &[Contribution] {
        self.rewards
            .get(contributor)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of rewards distributed to `contributor`.
    pub fn contributor_reward_count(&self, contributor: &Principal) -> u64 {
        self.contributions(contributor).len() as u64
    }

    /// Public fields of `contributor`'s rewards.
    pub fn contributor_rewards(&self, contributor: &Principal) -> Vec<ContributionView> {
        self.contributions(contributor)
            .iter()
            .map(Contribution::view)
            .collect()
    }
}
