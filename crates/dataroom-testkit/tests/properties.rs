//! Registry properties checked over generated inputs.

use proptest::prelude::*;
use tokio::runtime::Runtime;

use dataroom::{DatasetId, ErrorKind, Principal, Timestamp};
use dataroom_testkit::generators::{invalid_quality_score, ops, topic, ContributionParams};
use dataroom_testkit::{principal, run_op, run_ops, TestFixture, GENESIS};

fn runtime() -> Runtime {
    Runtime::new().unwrap()
}

fn parties() -> Vec<Principal> {
    (0..4).map(principal).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_contribution_ids_are_sequential(
        batch in prop::collection::vec(any::<ContributionParams>(), 1..12)
    ) {
        runtime().block_on(async {
            let fixture = TestFixture::new();
            let registry = fixture.registry().await.unwrap();
            let contributor = principal(1);

            let mut ids = Vec::new();
            for params in &batch {
                ids.push(
                    registry
                        .contribute_data(
                            contributor,
                            params.value,
                            params.quality_score,
                            &params.metadata_hash,
                            params.is_public,
                        )
                        .await
                        .unwrap(),
                );
            }

            let n = batch.len() as u64;
            assert_eq!(ids, (1..=n).map(DatasetId).collect::<Vec<_>>());
            assert_eq!(registry.platform_stats().await.total_datasets, n);
            assert_eq!(registry.contributor_datasets(&contributor).await, ids);
            assert_eq!(fixture.snapshot().await.next_dataset_id, n + 1);
        });
    }

    #[test]
    fn prop_access_count_counts_every_grant(grantees in prop::collection::vec(2u8..5, 1..10)) {
        runtime().block_on(async {
            let fixture = TestFixture::new();
            let registry = fixture.registry().await.unwrap();
            let contributor = principal(1);

            let id = registry
                .contribute_data(contributor, 1, 50, "QmHash", false)
                .await
                .unwrap();
            for (i, seed) in grantees.iter().enumerate() {
                // Alternate between the contributor and the authority.
                let caller = if i % 2 == 0 { contributor } else { fixture.authority() };
                registry
                    .grant_data_access(caller, id, principal(*seed))
                    .await
                    .unwrap();
            }

            let info = registry.dataset_info(id).await.unwrap();
            assert_eq!(info.access_count, grantees.len() as u64);

            let mut distinct = grantees.clone();
            distinct.sort();
            distinct.dedup();
            assert_eq!(registry.grantees(id).await.len(), distinct.len());
        });
    }

    #[test]
    fn prop_read_rule(
        is_public in any::<bool>(),
        granted in any::<bool>(),
        caller_is_contributor in any::<bool>(),
        deactivated in any::<bool>(),
    ) {
        runtime().block_on(async {
            let fixture = TestFixture::new();
            let registry = fixture.registry().await.unwrap();
            let contributor = principal(1);
            let reader = principal(2);

            let id = registry
                .contribute_data(contributor, 9, 10, "QmHash", is_public)
                .await
                .unwrap();
            if granted {
                registry.grant_data_access(contributor, id, reader).await.unwrap();
            }
            if deactivated {
                registry.deactivate_dataset(contributor, id).await.unwrap();
            }

            let caller = if caller_is_contributor { contributor } else { reader };
            let result = registry.access_dataset(id, &caller).await;

            let permitted = is_public || granted || caller_is_contributor;
            match (deactivated, permitted) {
                (true, _) => {
                    assert_eq!(result.unwrap_err().kind(), ErrorKind::State)
                }
                (false, true) => assert!(result.is_ok()),
                (false, false) => {
                    assert_eq!(result.unwrap_err().kind(), ErrorKind::Authorization)
                }
            }
        });
    }

    #[test]
    fn prop_out_of_range_scores_rejected(score in invalid_quality_score()) {
        runtime().block_on(async {
            let fixture = TestFixture::new();
            let registry = fixture.registry().await.unwrap();

            let err = registry
                .contribute_data(principal(1), 1, score, "QmHash", true)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);

            let id = registry
                .contribute_data(principal(1), 1, 100, "QmHash", true)
                .await
                .unwrap();
            let err = registry
                .update_quality_score(fixture.authority(), id, score)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        });
    }

    #[test]
    fn prop_deadline_must_be_in_future(topic in topic(), deadline in 0u64..2_000_000_000) {
        runtime().block_on(async {
            let fixture = TestFixture::new();
            let registry = fixture.registry().await.unwrap();

            let result = registry
                .request_data_access(principal(3), &topic, 10, Timestamp(deadline))
                .await;
            if Timestamp(deadline) > GENESIS {
                assert!(result.is_ok());
            } else {
                assert_eq!(result.unwrap_err().kind(), ErrorKind::Validation);
            }
        });
    }

    #[test]
    fn prop_reward_needs_recorded_contributor(deactivated in any::<bool>()) {
        runtime().block_on(async {
            let fixture = TestFixture::new();
            let registry = fixture.registry().await.unwrap();
            let contributor = principal(1);
            let other = principal(2);

            let id = registry
                .contribute_data(contributor, 1, 50, "QmHash", true)
                .await
                .unwrap();
            if deactivated {
                registry.deactivate_dataset(contributor, id).await.unwrap();
            }

            let err = registry
                .distribute_reward(fixture.authority(), other, id, 10)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);

            registry
                .distribute_reward(fixture.authority(), contributor, id, 10)
                .await
                .unwrap();
            assert_eq!(registry.contributor_reward_count(&contributor).await, 1);
            assert_eq!(registry.contributor_reward_count(&other).await, 0);
        });
    }

    #[test]
    fn prop_failed_operations_leave_no_trace(
        setup in ops(4, 16),
        last in ops(4, 1),
        oracle_budget in 0u64..6,
        fail_store in any::<bool>(),
    ) {
        runtime().block_on(async {
            let fixture = TestFixture::new();
            let registry = fixture.registry().await.unwrap();
            let parties = parties();

            run_ops(&registry, &fixture.clock, &parties, &setup).await;

            let before = fixture.snapshot().await;
            let events_before = registry.event_log(0).await.unwrap();
            let stats_before = registry.platform_stats().await;
            let mut rx = registry.subscribe();

            if fail_store {
                fixture.store.set_failing(true);
            } else {
                fixture.oracle.fail_after(oracle_budget);
            }

            let mut failed = false;
            for op in &last {
                failed |= run_op(&registry, &fixture.clock, &parties, op).await.is_err();
            }

            fixture.store.set_failing(false);
            fixture.oracle.heal();

            if failed {
                assert_eq!(fixture.snapshot().await, before);
                assert_eq!(registry.event_log(0).await.unwrap(), events_before);
                assert_eq!(registry.platform_stats().await, stats_before);
                assert!(rx.try_recv().is_err());
            }
        });
    }

    #[test]
    fn prop_reopen_restores_state(workload in ops(4, 24)) {
        runtime().block_on(async {
            let fixture = TestFixture::new();
            let parties = parties();

            let registry = fixture.registry().await.unwrap();
            run_ops(&registry, &fixture.clock, &parties, &workload).await;

            let stats = registry.platform_stats().await;
            let mut datasets = Vec::new();
            for id in 1..=stats.total_datasets {
                let id = DatasetId(id);
                datasets.push((
                    registry.dataset_info(id).await.unwrap(),
                    registry.grantees(id).await,
                ));
            }
            drop(registry);

            let reopened = fixture.registry().await.unwrap();
            assert_eq!(reopened.platform_stats().await, stats);
            for (info, grantees) in datasets {
                assert_eq!(reopened.dataset_info(info.id).await.unwrap(), info);
                assert_eq!(reopened.grantees(info.id).await, grantees);
            }
            for party in &parties {
                assert_eq!(
                    reopened.contributor_rewards(party).await,
                    registry_rewards(&fixture, party).await
                );
            }
        });
    }
}

/// Reward views straight from the persisted snapshot.
async fn registry_rewards(
    fixture: &TestFixture,
    contributor: &Principal,
) -> Vec<dataroom::core::ContributionView> {
    fixture
        .snapshot()
        .await
        .contributions
        .iter()
        .filter(|(p, _)| p == contributor)
        .map(|(_, c)| c.view())
        .collect()
}

#[tokio::test]
async fn test_quality_score_boundaries() {
    let fixture = TestFixture::new();
    let registry = fixture.registry().await.unwrap();

    assert!(registry
        .contribute_data(principal(1), 1, 0, "QmHash", true)
        .await
        .is_ok());
    assert!(registry
        .contribute_data(principal(1), 1, 100, "QmHash", true)
        .await
        .is_ok());
    assert_eq!(
        registry
            .contribute_data(principal(1), 1, 101, "QmHash", true)
            .await
            .unwrap_err()
            .kind(),
        ErrorKind::Validation
    );
    assert_eq!(
        registry
            .contribute_data(principal(1), 1, 50, "", true)
            .await
            .unwrap_err()
            .kind(),
        ErrorKind::Validation
    );
}

#[tokio::test]
async fn test_deadline_boundary_follows_clock() {
    let fixture = TestFixture::new();
    let registry = fixture.registry().await.unwrap();
    fixture.clock.advance(100);
    let now = GENESIS.plus(100);

    assert!(registry
        .request_data_access(principal(1), "genomics", 1, now)
        .await
        .is_err());
    assert!(registry
        .request_data_access(principal(1), "genomics", 1, now.plus(1))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_oracle_failure_mid_grant_is_atomic() {
    let fixture = TestFixture::new();
    let registry = fixture.registry().await.unwrap();
    let contributor = principal(1);
    let grantee = principal(2);

    let id = registry
        .contribute_data(contributor, 1, 50, "QmHash", false)
        .await
        .unwrap();

    // The grant shares two handles; let the first through.
    fixture.oracle.fail_after(1);
    let err = registry
        .grant_data_access(contributor, id, grantee)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Oracle);
    fixture.oracle.heal();

    assert_eq!(registry.dataset_info(id).await.unwrap().access_count, 0);
    assert!(!registry.has_access(id, &grantee).await);
    assert_eq!(registry.event_log(0).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_store_failure_allocates_nothing() {
    let fixture = TestFixture::new();
    let registry = fixture.registry().await.unwrap();

    fixture.store.set_failing(true);
    let err = registry
        .contribute_data(principal(1), 1, 50, "QmHash", true)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    fixture.store.set_failing(false);

    let id = registry
        .contribute_data(principal(1), 1, 50, "QmHash", true)
        .await
        .unwrap();
    assert_eq!(id, DatasetId(1));
}
