//! Access grants and read authorization.

use dataroom_core::{
    DatasetAccess, DatasetId, DatasetView, EncryptionOracle, Mutation, Principal, RegistryError,
    RegistryEvent, Result, SealedHandles,
};

use crate::state::RegistryState;
use crate::txn::{self, Transaction};

impl<O: EncryptionOracle + ?Sized> Transaction<'_, O> {
    /// Grant `grantee` access to a dataset.
    ///
    /// Contributor or authority only. Every call counts toward
    /// `access_count`, including repeat grants to the same principal.
    pub fn grant(
        &mut self,
        caller: Principal,
        dataset_id: DatasetId,
        grantee: Principal,
    ) -> Result<()> {
        let dataset = self.valid_dataset(dataset_id)?;
        self.require_contributor_or_authority(&dataset, &caller)?;

        self.share(&[&dataset.value_handle, &dataset.quality_handle], &grantee)?;

        let mut updated = dataset;
        updated.access_count += 1;
        self.push(Mutation::PutGrant {
            dataset_id,
            grantee,
        });
        self.push(Mutation::PutDataset(updated));
        self.emit(RegistryEvent::DatasetAccessed {
            dataset_id,
            accessor: grantee,
        });

        Ok(())
    }
}

impl RegistryState {
    /// Whether `principal` holds a grant on the dataset.
    pub fn has_access(&self, dataset_id: DatasetId, principal: &Principal) -> bool {
        self.grants.contains(&(dataset_id, *principal))
    }

    /// Distinct grantees of a dataset, in first-grant order.
    pub fn grantees(&self, dataset_id: DatasetId) -> &[Principal] {
        self.grantees
            .get(&dataset_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Public fields of a dataset, if `caller` may read them.
    ///
    /// Readable when the dataset is public, `caller` holds a grant, or
    /// `caller` is the contributor. The dataset must exist and be active.
    pub fn check_read(&self, dataset_id: DatasetId, caller: &Principal) -> Result<DatasetView> {
        let dataset = txn::valid_dataset(self, dataset_id)?;

        if dataset.is_public
            || dataset.contributor == *caller
            || self.has_access(dataset_id, caller)
        {
            Ok(dataset.view())
        } else {
            Err(RegistryError::access_denied())
        }
    }

    /// What `access_dataset` returns to a permitted reader.
    pub fn access_dataset(&self, dataset_id: DatasetId, caller: &Principal) -> Result<DatasetAccess> {
        self.check_read(dataset_id, caller).map(DatasetAccess::from)
    }

    /// Ciphertext handles of a dataset.
    ///
    /// Only the contributor, a grantee or the authority get them; a public
    /// dataset does not hand out its handles.
    pub fn sealed_handles(&self, dataset_id: DatasetId, caller: &Principal) -> Result<SealedHandles> {
        let dataset = txn::valid_dataset(self, dataset_id)?;

        if dataset.contributor == *caller
            || self.has_access(dataset_id, caller)
            || self.is_authority(caller)
        {
            Ok(SealedHandles {
                value: dataset.value_handle.clone(),
                quality: dataset.quality_handle.clone(),
            })
        } else {
            Err(RegistryError::access_denied())
        }
    }
}
