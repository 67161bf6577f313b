//! Running generated operations against a registry.

use dataroom::{Clock, Registry};
use dataroom_core::{EncryptionOracle, Principal};
use dataroom_store::Store;

use crate::generators::Op;

/// Run one operation. `parties[0]` should be the authority.
pub async fn run_op<S, O, C>(
    registry: &Registry<S, O, C>,
    clock: &C,
    parties: &[Principal],
    op: &Op,
) -> dataroom::Result<()>
where
    S: Store,
    O: EncryptionOracle,
    C: Clock,
{
    let party = |i: usize| parties[i % parties.len()];

    match op {
        Op::Contribute { actor, params } => registry
            .contribute_data(
                party(*actor),
                params.value,
                params.quality_score,
                &params.metadata_hash,
                params.is_public,
            )
            .await
            .map(drop),
        Op::Grant {
            actor,
            dataset,
            grantee,
        } => {
            registry
                .grant_data_access(party(*actor), *dataset, party(*grantee))
                .await
        }
        Op::Rescore {
            actor,
            dataset,
            score,
        } => {
            registry
                .update_quality_score(party(*actor), *dataset, *score)
                .await
        }
        Op::Reward {
            actor,
            contributor,
            dataset,
            amount,
        } => {
            registry
                .distribute_reward(party(*actor), party(*contributor), *dataset, *amount)
                .await
        }
        Op::Deactivate { actor, dataset } => {
            registry.deactivate_dataset(party(*actor), *dataset).await
        }
        Op::Request {
            actor,
            topic,
            budget,
            deadline_in,
        } => registry
            .request_data_access(
                party(*actor),
                topic,
                *budget,
                clock.now().plus(*deadline_in),
            )
            .await
            .map(drop),
    }
}

/// Run every operation, collecting each result's success.
pub async fn run_ops<S, O, C>(
    registry: &Registry<S, O, C>,
    clock: &C,
    parties: &[Principal],
    ops: &[Op],
) -> Vec<bool>
where
    S: Store,
    O: EncryptionOracle,
    C: Clock,
{
    let mut results = Vec::with_capacity(ops.len());
    for op in ops {
        results.push(run_op(registry, clock, parties, op).await.is_ok());
    }
    results
}
