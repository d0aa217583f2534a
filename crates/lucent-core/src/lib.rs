//! # Lucent Core
//!
//! Validation of beacon chain light client updates, and the trusted snapshot
//! they advance.
//!
//! This crate contains **no networking code**. Updates arrive from somewhere
//! else (see `lucent-sync`) and are either proven and applied, or rejected
//! with a reason.
//!
//! ## Trust Model
//!
//! - **Bootstrap** (`consensus::checkpoint`, `SnapshotStore::bootstrap_from`):
//!   a block root agreed on by independent sources, plus a Merkle proof of the
//!   sync committee in that block's state.
//!
//! - **Updates** (`consensus::validator`): a header is trusted once more than
//!   two thirds of the known sync committee sign it. Committees for the next
//!   period are trusted only through Merkle proofs against a finalized state.
//!
//! ## Usage
//!
//! ```ignore
//! use lucent_core::{ChainConfig, SnapshotStore, UpdateValidator};
//!
//! let validator = UpdateValidator::new(Arc::new(ChainConfig::mainnet()))?;
//! let store = SnapshotStore::bootstrap_from(validator, &bootstrap, &trusted_root)?;
//! store.apply(&update)?;
//! ```

pub mod config;
pub mod consensus;
pub mod merkle;
pub mod ssz;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export commonly used types for convenience
pub use config::{ChainConfig, ConfigError, Fork, ForkSchedule, ProofLocation, Quorum};
pub use consensus::{
    checkpoint::{parse_checkpoint_root, verify_checkpoint_consensus, CheckpointError, VerifiedCheckpoint},
    domain::{BeaconDomainComputer, DomainComputer},
    period::PeriodCalculator,
    signature::{BlstSignatureEngine, SignatureEngine, SignatureError},
    store::{HeadEvent, SnapshotStore},
    validator::{CommitteeChange, RejectReason, UpdateValidator, ValidatedEffect},
};
pub use merkle::{MerkleProofVerifier, Sha256MerkleVerifier};
pub use ssz::HashTreeRoot;
pub use types::beacon::*;
