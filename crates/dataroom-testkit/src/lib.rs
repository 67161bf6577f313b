//! # Dataroom Testkit
//!
//! Testing utilities for the Dataroom registry.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: deterministic principals, a ready-made registry, and an
//!   oracle and store that fail on demand
//! - **Generators**: Proptest strategies for registry inputs and workloads
//! - **Workloads**: Running generated operations against a registry
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use dataroom_testkit::generators::invalid_quality_score;
//!
//! proptest! {
//!     #[test]
//!     fn rejects_scores_above_100(score in invalid_quality_score()) {
//!         prop_assert!(dataroom_core::validate_quality_score(score).is_err());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use dataroom_testkit::fixtures::{principal, TestFixture};
//!
//! # tokio_test_block(async {
//! let fixture = TestFixture::new();
//! let registry = fixture.registry().await.unwrap();
//!
//! // Fail the second oracle call of the next operation.
//! fixture.oracle.fail_after(1);
//! assert!(registry.contribute_data(principal(1), 1, 50, "QmHash", true).await.is_err());
//! # });
//! # fn tokio_test_block(f: impl std::future::Future<Output = ()>) {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

pub mod fixtures;
pub mod generators;
pub mod workload;

pub use fixtures::{
    keypair, multi_party_keypairs, principal, FixtureRegistry, FlakyOracle, FlakyStore,
    TestFixture, GENESIS,
};
pub use generators::{ContributionParams, Op};
pub use workload::{run_op, run_ops};
