//! Operations staged together in one transaction behave like the same
//! operations committed one at a time.

use proptest::prelude::*;

use dataroom_core::{DatasetId, Keypair, Principal, RequestId, Result, Timestamp};
use dataroom_engine::{RegistryState, Transaction};
use dataroom_oracle::LocalOracle;

const NOW: Timestamp = Timestamp(1_700_000_000);
const PARTIES: usize = 4;

fn party(i: usize) -> Principal {
    Keypair::from_seed(&[i as u8 + 1; 32]).principal()
}

#[derive(Debug, Clone)]
enum Op {
    Contribute { actor: usize, value: u64, score: u8, is_public: bool },
    Grant { actor: usize, dataset: u64, grantee: usize },
    Rescore { actor: usize, dataset: u64, score: u8 },
    Reward { actor: usize, contributor: usize, dataset: u64, amount: u64 },
    Deactivate { actor: usize, dataset: u64 },
    Request { actor: usize, budget: u64, deadline_in: u64 },
}

fn op() -> impl Strategy<Value = Op> {
    let actor = 0..PARTIES;
    let dataset = 1u64..6;
    prop_oneof![
        3 => (actor.clone(), any::<u64>(), 0u8..=110, any::<bool>())
            .prop_map(|(actor, value, score, is_public)| Op::Contribute { actor, value, score, is_public }),
        4 => (actor.clone(), dataset.clone(), 0..PARTIES)
            .prop_map(|(actor, dataset, grantee)| Op::Grant { actor, dataset, grantee }),
        1 => (actor.clone(), dataset.clone(), 0u8..=110)
            .prop_map(|(actor, dataset, score)| Op::Rescore { actor, dataset, score }),
        1 => (actor.clone(), 0..PARTIES, dataset.clone(), any::<u64>())
            .prop_map(|(actor, contributor, dataset, amount)| Op::Reward { actor, contributor, dataset, amount }),
        2 => (actor.clone(), dataset)
            .prop_map(|(actor, dataset)| Op::Deactivate { actor, dataset }),
        1 => (actor, any::<u64>(), 0u64..3)
            .prop_map(|(actor, budget, deadline_in)| Op::Request { actor, budget, deadline_in }),
    ]
}

fn run(tx: &mut Transaction<'_, LocalOracle>, op: &Op) -> Result<()> {
    match *op {
        Op::Contribute { actor, value, score, is_public } => tx
            .contribute(party(actor), value, score, "QmHash", is_public)
            .map(drop),
        Op::Grant { actor, dataset, grantee } => {
            tx.grant(party(actor), DatasetId(dataset), party(grantee))
        }
        Op::Rescore { actor, dataset, score } => {
            tx.update_quality_score(party(actor), DatasetId(dataset), score)
        }
        Op::Reward { actor, contributor, dataset, amount } => {
            tx.distribute_reward(party(actor), party(contributor), DatasetId(dataset), amount)
        }
        Op::Deactivate { actor, dataset } => tx.deactivate(party(actor), DatasetId(dataset)),
        Op::Request { actor, budget, deadline_in } => tx
            .submit_request(party(actor), "genomics", budget, NOW.plus(deadline_in))
            .map(drop),
    }
}

/// Everything a reader can observe, with handles replaced by who may open them.
fn observe(state: &RegistryState, oracle: &LocalOracle) -> Vec<String> {
    let mut seen = vec![format!("{:?}", state.stats(NOW))];
    for id in 1..=state.stats(NOW).total_datasets {
        let id = DatasetId(id);
        let Some(dataset) = state.dataset(id) else {
            seen.push(format!("{} missing", id));
            continue;
        };
        seen.push(format!("{:?}", dataset.view()));
        seen.push(format!("{:?}", state.grantees(id)));
        for i in 0..PARTIES {
            seen.push(format!(
                "{:?} {:?}",
                oracle.reveal(&dataset.value_handle, &party(i)).ok(),
                oracle.reveal(&dataset.quality_handle, &party(i)).ok(),
            ));
        }
    }
    for id in 1..=state.stats(NOW).total_requests {
        seen.push(format!("{:?}", state.request_info(RequestId(id))));
    }
    for i in 0..PARTIES {
        seen.push(format!("{:?}", state.contributor_rewards(&party(i))));
        seen.push(format!("{:?}", state.contributor_datasets(&party(i))));
    }
    seen
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_one_transaction_matches_one_per_op(ops in prop::collection::vec(op(), 0..24)) {
        let sequential_oracle = LocalOracle::new();
        let mut sequential = RegistryState::genesis(party(0));
        let mut sequential_results = Vec::new();
        for op in &ops {
            let mut tx = Transaction::new(&sequential, &sequential_oracle, NOW);
            let result = run(&mut tx, op);
            if result.is_ok() {
                let changes = tx.into_changes();
                sequential.apply(&changes);
            }
            sequential_results.push(result);
        }

        let batched_oracle = LocalOracle::new();
        let mut batched = RegistryState::genesis(party(0));
        let mut tx = Transaction::new(&batched, &batched_oracle, NOW);
        let batched_results: Vec<_> = ops.iter().map(|op| run(&mut tx, op)).collect();
        let changes = tx.into_changes();
        batched.apply(&changes);

        prop_assert_eq!(batched_results, sequential_results);
        prop_assert_eq!(
            observe(&batched, &batched_oracle),
            observe(&sequential, &sequential_oracle)
        );
    }
}

#[test]
fn test_mixed_operations_in_one_transaction() {
    let oracle = LocalOracle::new();
    let mut state = RegistryState::genesis(party(0));
    let (authority, contributor, reader) = (party(0), party(1), party(2));

    let mut tx = Transaction::new(&state, &oracle, NOW);
    let first = tx.contribute(contributor, 10, 40, "QmA", false).unwrap();
    let second = tx.contribute(contributor, 20, 80, "QmB", true).unwrap();
    tx.grant(contributor, first, reader).unwrap();
    tx.grant(authority, first, reader).unwrap();
    tx.update_quality_score(authority, first, 55).unwrap();
    tx.distribute_reward(authority, contributor, first, 7).unwrap();
    tx.deactivate(contributor, second).unwrap();
    tx.distribute_reward(authority, contributor, second, 3).unwrap();
    assert!(tx.grant(contributor, second, reader).is_err());
    tx.submit_request(reader, "genomics", 100, NOW.plus(60)).unwrap();
    let changes = tx.into_changes();
    assert_eq!(changes.events.len(), 8);
    state.apply(&changes);

    let first = state.dataset(first).unwrap();
    assert_eq!(first.access_count, 2);
    assert_eq!(oracle.reveal(&first.quality_handle, &reader).unwrap(), 55);
    assert!(!state.dataset(second).unwrap().is_active);
    assert!(!state.has_access(second, &reader));
    assert_eq!(state.contributor_reward_count(&contributor), 2);

    let stats = state.stats(NOW);
    assert_eq!(stats.total_datasets, 2);
    assert_eq!(stats.total_requests, 1);
}
