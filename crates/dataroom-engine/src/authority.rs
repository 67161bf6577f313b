//! The platform authority.
//!
//! One principal, fixed when the registry is first initialized. Every
//! owner-only check is `caller == authority`.

use dataroom_core::{Dataset, EncryptionOracle, Mutation, Principal, RegistryError, Result};

use crate::state::RegistryState;
use crate::txn::Transaction;

impl RegistryState {
    /// The platform authority, if initialized.
    pub fn authority(&self) -> Option<Principal> {
        self.authority
    }

    /// Whether `principal` is the platform authority.
    pub fn is_authority(&self, principal: &Principal) -> bool {
        self.authority.as_ref() == Some(principal)
    }

    /// Fail unless `caller` is the platform authority.
    pub fn require_authority(&self, caller: &Principal) -> Result<()> {
        require_authority(self.authority, caller)
    }

    /// Fail unless `caller` contributed `dataset` or is the platform authority.
    pub fn require_contributor_or_authority(
        &self,
        dataset: &Dataset,
        caller: &Principal,
    ) -> Result<()> {
        require_contributor_or_authority(self.authority, dataset, caller)
    }
}

pub(crate) fn require_authority(authority: Option<Principal>, caller: &Principal) -> Result<()> {
    if authority.as_ref() == Some(caller) {
        Ok(())
    } else {
        Err(RegistryError::Unauthorized(format!(
            "{} is not the platform authority",
            caller
        )))
    }
}

pub(crate) fn require_contributor_or_authority(
    authority: Option<Principal>,
    dataset: &Dataset,
    caller: &Principal,
) -> Result<()> {
    if dataset.contributor == *caller || authority.as_ref() == Some(caller) {
        Ok(())
    } else {
        Err(RegistryError::Unauthorized(format!(
            "{} is neither the contributor of {} nor the platform authority",
            caller, dataset.id
        )))
    }
}

impl<O: EncryptionOracle + ?Sized> Transaction<'_, O> {
    /// Fix the platform authority.
    ///
    /// Fails once an authority exists; it is never replaced.
    pub fn initialize_authority(&mut self, authority: Principal) -> Result<()> {
        if let Some(existing) = self.authority() {
            return Err(RegistryError::Unauthorized(format!(
                "platform authority already set to {}",
                existing
            )));
        }
        self.push(Mutation::SetAuthority(authority));
        Ok(())
    }
}
