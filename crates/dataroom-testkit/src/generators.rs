//! Proptest generators for property-based testing.

use proptest::prelude::*;

use dataroom_core::{DatasetId, Keypair, Principal};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random principal.
pub fn principal() -> impl Strategy<Value = Principal> {
    keypair().prop_map(|kp| kp.principal())
}

/// An accepted quality score.
pub fn quality_score() -> impl Strategy<Value = u8> {
    0u8..=100
}

/// A rejected quality score.
pub fn invalid_quality_score() -> impl Strategy<Value = u8> {
    101u8..=u8::MAX
}

/// A non-empty content hash.
pub fn metadata_hash() -> impl Strategy<Value = String> {
    "Qm[1-9A-HJ-NP-Za-km-z]{8,44}".prop_map(String::from)
}

/// A non-empty request topic.
pub fn topic() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9 -]{0,31}".prop_map(String::from)
}

/// Inputs to one contribution.
#[derive(Debug, Clone)]
pub struct ContributionParams {
    pub value: u64,
    pub quality_score: u8,
    pub metadata_hash: String,
    pub is_public: bool,
}

impl Arbitrary for ContributionParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (any::<u64>(), quality_score(), metadata_hash(), any::<bool>())
            .prop_map(|(value, quality_score, metadata_hash, is_public)| {
                ContributionParams {
                    value,
                    quality_score,
                    metadata_hash,
                    is_public,
                }
            })
            .boxed()
    }
}

/// One registry call in a generated workload.
///
/// Actors are indexes into a small party list; index 0 is the authority.
/// Dataset ids may point past what has been allocated.
#[derive(Debug, Clone)]
pub enum Op {
    Contribute {
        actor: usize,
        params: ContributionParams,
    },
    Grant {
        actor: usize,
        dataset: DatasetId,
        grantee: usize,
    },
    Rescore {
        actor: usize,
        dataset: DatasetId,
        score: u8,
    },
    Reward {
        actor: usize,
        contributor: usize,
        dataset: DatasetId,
        amount: u64,
    },
    Deactivate {
        actor: usize,
        dataset: DatasetId,
    },
    Request {
        actor: usize,
        topic: String,
        budget: u64,
        /// Seconds after the current time; 0 is rejected.
        deadline_in: u64,
    },
}

/// A dataset id in `1..=max`.
pub fn dataset_id(max: u64) -> impl Strategy<Value = DatasetId> {
    (1..=max).prop_map(DatasetId)
}

/// A single operation among `parties` actors.
pub fn op(parties: usize) -> impl Strategy<Value = Op> {
    let actor = 0..parties;
    prop_oneof![
        3 => (actor.clone(), any::<ContributionParams>())
            .prop_map(|(actor, params)| Op::Contribute { actor, params }),
        3 => (actor.clone(), dataset_id(8), 0..parties)
            .prop_map(|(actor, dataset, grantee)| Op::Grant { actor, dataset, grantee }),
        1 => (actor.clone(), dataset_id(8), any::<u8>())
            .prop_map(|(actor, dataset, score)| Op::Rescore { actor, dataset, score }),
        1 => (actor.clone(), 0..parties, dataset_id(8), any::<u64>())
            .prop_map(|(actor, contributor, dataset, amount)| Op::Reward {
                actor,
                contributor,
                dataset,
                amount,
            }),
        1 => (actor.clone(), dataset_id(8))
            .prop_map(|(actor, dataset)| Op::Deactivate { actor, dataset }),
        1 => (actor, topic(), any::<u64>(), 0u64..1000)
            .prop_map(|(actor, topic, budget, deadline_in)| Op::Request {
                actor,
                topic,
                budget,
                deadline_in,
            }),
    ]
}

/// A workload of up to `max_len` operations.
pub fn ops(parties: usize, max_len: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(op(parties), 0..=max_len)
}
