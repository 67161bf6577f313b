//! Dataset registry: contribution, rescoring and deactivation.

use dataroom_core::{
    validate_metadata_hash, validate_quality_score, Dataset, DatasetId, DatasetView,
    EncryptionOracle, Mutation, Principal, RegistryEvent, Result, SequenceKind,
};

use crate::state::RegistryState;
use crate::txn::{self, Transaction};
use crate::widths;

impl<O: EncryptionOracle + ?Sized> Transaction<'_, O> {
    /// Register a dataset and return its id.
    ///
    /// Both plaintexts are wrapped; the registry and the contributor may use
    /// the resulting handles.
    pub fn contribute(
        &mut self,
        contributor: Principal,
        value: u64,
        quality_score: u8,
        metadata_hash: &str,
        is_public: bool,
    ) -> Result<DatasetId> {
        validate_quality_score(quality_score)?;
        validate_metadata_hash(metadata_hash)?;

        let id = DatasetId(self.allocate(SequenceKind::Dataset));
        let value_handle = self.seal(value, widths::DATASET_VALUE, &[contributor])?;
        let quality_handle = self.seal(
            u64::from(quality_score),
            widths::QUALITY_SCORE,
            &[contributor],
        )?;

        self.push(Mutation::PutDataset(Dataset {
            id,
            contributor,
            value_handle,
            quality_handle,
            metadata_hash: metadata_hash.to_string(),
            is_public,
            created_at: self.now,
            access_count: 0,
            is_active: true,
        }));
        self.emit(RegistryEvent::DatasetContributed {
            dataset_id: id,
            contributor,
            metadata_hash: metadata_hash.to_string(),
        });

        Ok(id)
    }

    /// Replace a dataset's quality handle with a freshly wrapped score.
    ///
    /// Authority only. With grant propagation on, the contributor and every
    /// grantee may decrypt the new handle; otherwise only the registry may.
    pub fn update_quality_score(
        &mut self,
        caller: Principal,
        dataset_id: DatasetId,
        new_score: u8,
    ) -> Result<()> {
        self.require_authority(&caller)?;
        let dataset = self.valid_dataset(dataset_id)?;
        validate_quality_score(new_score)?;

        let readers = if self.propagate_grants_on_rescore {
            let mut readers = vec![dataset.contributor];
            readers.extend(
                self.grantees(dataset_id)
                    .into_iter()
                    .filter(|p| *p != dataset.contributor),
            );
            readers
        } else {
            Vec::new()
        };

        let quality_handle =
            self.seal(u64::from(new_score), widths::QUALITY_SCORE, &readers)?;

        let mut updated = dataset;
        updated.quality_handle = quality_handle;
        self.push(Mutation::PutDataset(updated));
        self.emit(RegistryEvent::QualityScoreUpdated {
            dataset_id,
            new_score,
        });

        Ok(())
    }

    /// Deactivate a dataset. One-way; no event.
    ///
    /// Contributor or authority only. Deactivating twice fails.
    pub fn deactivate(&mut self, caller: Principal, dataset_id: DatasetId) -> Result<()> {
        let dataset = self.valid_dataset(dataset_id)?;
        self.require_contributor_or_authority(&dataset, &caller)?;

        let mut updated = dataset;
        updated.is_active = false;
        self.push(Mutation::PutDataset(updated));

        Ok(())
    }
}

impl RegistryState {
    /// Public fields of an active dataset.
    pub fn dataset_info(&self, id: DatasetId) -> Result<DatasetView> {
        txn::valid_dataset(self, id).map(Dataset::view)
    }

    /// Ids contributed by `contributor`, in creation order.
    pub fn contributor_datasets(&self, contributor: &Principal) -> &[DatasetId] {
        self.by_contributor
            .get(contributor)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of datasets contributed by `contributor`, active or not.
    pub fn contributor_dataset_count(&self, contributor: &Principal) -> u64 {
        self.contributor_datasets(contributor).len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataroom_core::{ErrorKind, Keypair, RegistryError, Timestamp, ValidationError};
    use dataroom_oracle::LocalOracle;

    const NOW: Timestamp = Timestamp(1_700_000_000);

    struct Fixture {
        authority: Principal,
        contributor: Principal,
        other: Principal,
        oracle: LocalOracle,
        state: RegistryState,
    }

    impl Fixture {
        fn new() -> Self {
            let authority = Keypair::from_seed(&[1; 32]).principal();
            Self {
                authority,
                contributor: Keypair::from_seed(&[2; 32]).principal(),
                other: Keypair::from_seed(&[3; 32]).principal(),
                oracle: LocalOracle::new(),
                state: RegistryState::genesis(authority),
            }
        }

        fn run<T>(
            &mut self,
            f: impl FnOnce(&mut Transaction<'_, LocalOracle>) -> Result<T>,
        ) -> Result<T> {
            let mut tx = Transaction::new(&self.state, &self.oracle, NOW);
            let out = f(&mut tx)?;
            let changes = tx.into_changes();
            self.state.apply(&changes);
            Ok(out)
        }

        fn contribute(&mut self) -> DatasetId {
            let contributor = self.contributor;
            self.run(|tx| tx.contribute(contributor, 12345, 85, "QmHash", true))
                .unwrap()
        }
    }

    #[test]
    fn test_contribute_assigns_sequential_ids() {
        let mut fx = Fixture::new();

        assert_eq!(fx.contribute(), DatasetId(1));
        assert_eq!(fx.contribute(), DatasetId(2));
        assert_eq!(fx.contribute(), DatasetId(3));

        assert_eq!(fx.state.sequences().peek(SequenceKind::Dataset), 4);
        assert_eq!(
            fx.state.contributor_datasets(&fx.contributor),
            &[DatasetId(1), DatasetId(2), DatasetId(3)]
        );
        assert_eq!(fx.state.contributor_dataset_count(&fx.contributor), 3);
        assert_eq!(fx.state.contributor_dataset_count(&fx.other), 0);
    }

    #[test]
    fn test_contribute_record_and_event() {
        let mut fx = Fixture::new();
        let contributor = fx.contributor;
        let mut tx = Transaction::new(&fx.state, &fx.oracle, NOW);
        let id = tx.contribute(contributor, 12345, 85, "QmHash", true).unwrap();
        let changes = tx.into_changes();

        assert_eq!(
            changes.events,
            vec![RegistryEvent::DatasetContributed {
                dataset_id: id,
                contributor,
                metadata_hash: "QmHash".into(),
            }]
        );

        fx.state.apply(&changes);
        let view = fx.state.dataset_info(id).unwrap();
        assert_eq!(view.contributor, contributor);
        assert_eq!(view.created_at, NOW);
        assert_eq!(view.access_count, 0);
        assert!(view.is_active);
        assert!(view.is_public);

        let dataset = fx.state.dataset(id).unwrap();
        assert_eq!(fx.oracle.reveal(&dataset.value_handle, &contributor).unwrap(), 12345);
        assert_eq!(fx.oracle.reveal(&dataset.quality_handle, &contributor).unwrap(), 85);
        assert!(fx.oracle.is_self_allowed(&dataset.value_handle.id));
        assert!(fx.oracle.is_self_allowed(&dataset.quality_handle.id));
    }

    #[test]
    fn test_contribute_validation() {
        let mut fx = Fixture::new();
        let c = fx.contributor;

        let err = fx.run(|tx| tx.contribute(c, 1, 101, "QmHash", false)).unwrap_err();
        assert_eq!(
            err,
            RegistryError::Validation(ValidationError::QualityScoreOutOfRange(101))
        );

        let err = fx.run(|tx| tx.contribute(c, 1, 50, "", false)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        // Rejections do not consume ids.
        assert_eq!(fx.state.sequences().peek(SequenceKind::Dataset), 1);

        assert!(fx.run(|tx| tx.contribute(c, 1, 0, "QmA", false)).is_ok());
        assert!(fx.run(|tx| tx.contribute(c, 1, 100, "QmB", false)).is_ok());
    }

    #[test]
    fn test_update_quality_score_authority_only() {
        let mut fx = Fixture::new();
        let id = fx.contribute();
        let contributor = fx.contributor;

        let err = fx
            .run(|tx| tx.update_quality_score(contributor, id, 95))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        let authority = fx.authority;
        let err = fx
            .run(|tx| tx.update_quality_score(authority, id, 101))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = fx
            .run(|tx| tx.update_quality_score(authority, DatasetId(9), 95))
            .unwrap_err();
        assert_eq!(err, RegistryError::DatasetNotFound(DatasetId(9)));
    }

    #[test]
    fn test_update_quality_score_replaces_handle_and_propagates() {
        let mut fx = Fixture::new();
        let id = fx.contribute();
        let (authority, contributor, other) = (fx.authority, fx.contributor, fx.other);
        fx.run(|tx| tx.grant(contributor, id, other)).unwrap();
        let old = fx.state.dataset(id).unwrap().quality_handle.clone();

        let mut tx = Transaction::new(&fx.state, &fx.oracle, NOW);
        tx.update_quality_score(authority, id, 95).unwrap();
        let changes = tx.into_changes();
        assert_eq!(
            changes.events,
            vec![RegistryEvent::QualityScoreUpdated {
                dataset_id: id,
                new_score: 95
            }]
        );
        fx.state.apply(&changes);

        let new = &fx.state.dataset(id).unwrap().quality_handle;
        assert_ne!(new.id, old.id);
        assert!(fx.oracle.is_self_allowed(&new.id));
        assert_eq!(fx.oracle.reveal(new, &contributor).unwrap(), 95);
        assert_eq!(fx.oracle.reveal(new, &other).unwrap(), 95);
    }

    #[test]
    fn test_update_quality_score_without_propagation() {
        let mut fx = Fixture::new();
        let id = fx.contribute();
        let (authority, contributor) = (fx.authority, fx.contributor);

        let mut tx = Transaction::new(&fx.state, &fx.oracle, NOW).with_grant_propagation(false);
        tx.update_quality_score(authority, id, 40).unwrap();
        let changes = tx.into_changes();
        fx.state.apply(&changes);

        let new = &fx.state.dataset(id).unwrap().quality_handle;
        assert!(fx.oracle.is_self_allowed(&new.id));
        assert!(!fx.oracle.is_allowed(&new.id, &contributor));
    }

    #[test]
    fn test_deactivate_is_terminal() {
        let mut fx = Fixture::new();
        let id = fx.contribute();
        let (contributor, other) = (fx.contributor, fx.other);

        let err = fx.run(|tx| tx.deactivate(other, id)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        let mut tx = Transaction::new(&fx.state, &fx.oracle, NOW);
        tx.deactivate(contributor, id).unwrap();
        let changes = tx.into_changes();
        assert!(changes.events.is_empty());
        fx.state.apply(&changes);

        assert!(!fx.state.dataset(id).unwrap().is_active);
        assert_eq!(
            fx.state.dataset_info(id).unwrap_err(),
            RegistryError::DatasetInactive(id)
        );

        let err = fx.run(|tx| tx.deactivate(contributor, id)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);

        // Inactive datasets still count toward the contributor's index.
        assert_eq!(fx.state.contributor_dataset_count(&contributor), 1);
    }

    #[test]
    fn test_authority_may_deactivate() {
        let mut fx = Fixture::new();
        let id = fx.contribute();
        let authority = fx.authority;

        fx.run(|tx| tx.deactivate(authority, id)).unwrap();
        assert!(!fx.state.dataset(id).unwrap().is_active);
    }

    #[test]
    fn test_deactivate_then_grant_in_one_transaction() {
        let mut fx = Fixture::new();
        let id = fx.contribute();
        let (contributor, other) = (fx.contributor, fx.other);

        let err = fx
            .run(|tx| {
                tx.deactivate(contributor, id)?;
                tx.grant(contributor, id, other)
            })
            .unwrap_err();
        assert_eq!(err, RegistryError::DatasetInactive(id));

        let mut tx = Transaction::new(&fx.state, &fx.oracle, NOW);
        tx.deactivate(contributor, id).unwrap();
        assert!(!tx.dataset(id).unwrap().is_active);
        assert_eq!(
            tx.deactivate(contributor, id).unwrap_err(),
            RegistryError::DatasetInactive(id)
        );
        assert!(tx.grant(contributor, id, other).is_err());
        let changes = tx.into_changes();
        fx.state.apply(&changes);

        let dataset = fx.state.dataset(id).unwrap();
        assert!(!dataset.is_active);
        assert_eq!(dataset.access_count, 0);
        assert!(!fx.state.has_access(id, &other));
    }

    #[test]
    fn test_rescore_after_grant_in_one_transaction() {
        let mut fx = Fixture::new();
        let id = fx.contribute();
        let (authority, contributor, other) = (fx.authority, fx.contributor, fx.other);

        fx.run(|tx| {
            tx.grant(contributor, id, other)?;
            tx.update_quality_score(authority, id, 60)
        })
        .unwrap();

        let dataset = fx.state.dataset(id).unwrap();
        assert_eq!(dataset.access_count, 1);
        assert_eq!(fx.oracle.reveal(&dataset.quality_handle, &other).unwrap(), 60);
        assert_eq!(fx.state.grantees(id), &[other]);
    }

    #[test]
    fn test_contribute_then_deactivate_in_one_transaction() {
        let mut fx = Fixture::new();
        let contributor = fx.contributor;

        let id = fx
            .run(|tx| {
                let id = tx.contribute(contributor, 1, 50, "QmHash", false)?;
                tx.deactivate(contributor, id)?;
                Ok(id)
            })
            .unwrap();

        assert!(!fx.state.dataset(id).unwrap().is_active);
        assert_eq!(fx.state.contributor_datasets(&contributor), &[id]);
    }
}
