use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, trace};

use crate::config::{ChainConfig, ConfigError, ProofLocation};
use crate::consensus::domain::{BeaconDomainComputer, DomainComputer};
use crate::consensus::period::PeriodCalculator;
use crate::consensus::signature::{BlstSignatureEngine, SignatureEngine};
use crate::merkle::{MerkleProofVerifier, Sha256MerkleVerifier};
use crate::ssz::HashTreeRoot;
use crate::types::beacon::*;

/// Why an update or bootstrap was refused.
///
/// Every variant describes untrusted input; none of them is fatal to the client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("Update slot {update_slot} is not newer than snapshot slot {snapshot_slot}")]
    StaleUpdate {
        update_slot: Slot,
        snapshot_slot: Slot,
    },

    #[error("Update period {update_period} is neither snapshot period {snapshot_period} nor the next one")]
    InvalidPeriod {
        update_period: u64,
        snapshot_period: u64,
    },

    #[error("Invalid Merkle branch for finalized header")]
    InvalidFinalityProof,

    #[error("Invalid Merkle branch for next sync committee")]
    InvalidCommitteeProof,

    #[error("Insufficient sync committee participation: {participants}/{committee_size} (need at least {required})")]
    InsufficientParticipants {
        participants: usize,
        required: usize,
        committee_size: usize,
    },

    #[error("Invalid BLS signature: {reason}")]
    InvalidSignature { reason: String },

    #[error("Invalid bootstrap: {reason}")]
    InvalidBootstrap { reason: String },

    #[error("Malformed {field}: expected {expected}, got {actual}")]
    MalformedInput {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// What happens to the snapshot's committees when an update is applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommitteeChange {
    /// Same period, nothing new to record.
    None,
    /// Same period; the proven committee becomes the staged next committee.
    Stage(Arc<SyncCommittee>),
    /// The update crossed into the next period: the staged committee (or the
    /// current one, if none was staged) becomes current and this one is staged
    /// for the period after.
    Rotate(Arc<SyncCommittee>),
}

/// The outcome of a successful validation. Carries everything needed to build
/// the next snapshot, nothing is mutated by the validator itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedEffect {
    /// The new snapshot header (the attested header).
    pub header: BeaconBlockHeader,
    pub committee_change: CommitteeChange,
    pub class: UpdateClass,
    pub participants: usize,
}

impl ValidatedEffect {
    pub fn is_rotation(&self) -> bool {
        matches!(self.committee_change, CommitteeChange::Rotate(_))
    }
}

/// Validates light client updates against a trusted snapshot.
///
/// Pure with respect to its inputs: the same snapshot and update always
/// give the same answer, and validations may run concurrently.
#[derive(Clone)]
pub struct UpdateValidator {
    config: Arc<ChainConfig>,
    periods: PeriodCalculator,
    proofs: Arc<dyn MerkleProofVerifier>,
    domains: Arc<dyn DomainComputer>,
    signatures: Arc<dyn SignatureEngine>,
}

impl UpdateValidator {
    /// A validator using SHA-256 proofs, beacon domains and `blst` signatures.
    pub fn new(config: Arc<ChainConfig>) -> Result<Self, ConfigError> {
        Self::with_collaborators(
            config,
            Arc::new(Sha256MerkleVerifier),
            Arc::new(BeaconDomainComputer),
            Arc::new(BlstSignatureEngine),
        )
    }

    pub fn with_collaborators(
        config: Arc<ChainConfig>,
        proofs: Arc<dyn MerkleProofVerifier>,
        domains: Arc<dyn DomainComputer>,
        signatures: Arc<dyn SignatureEngine>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            periods: PeriodCalculator::new(&config),
            config,
            proofs,
            domains,
            signatures,
        })
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn periods(&self) -> &PeriodCalculator {
        &self.periods
    }

    pub(crate) fn verify_proof(&self, leaf: &Root, branch: &[Root], location: ProofLocation, root: &Root) -> bool {
        self.proofs
            .verify(leaf, branch, location.depth, location.gindex, root)
    }

    /// Check `update` against `snapshot` and describe its effect.
    ///
    /// Checks run in a fixed order and stop at the first failure:
    /// structure, slot ordering, period adjacency, committee selection,
    /// finality proof, committee proof, quorum, signature.
    pub fn validate(
        &self,
        snapshot: &LightClientSnapshot,
        update: &LightClientUpdate,
    ) -> Result<ValidatedEffect, RejectReason> {
        self.check_structure(update)?;

        // 1. The update must advance us forward, no replaying old updates
        let update_slot = update.attested_header.slot;
        let snapshot_slot = snapshot.header.slot;
        if update_slot <= snapshot_slot {
            return Err(RejectReason::StaleUpdate {
                update_slot,
                snapshot_slot,
            });
        }

        // 2. Same period or exactly the next one
        let update_period = self.periods.period_of(update_slot);
        let snapshot_period = self.periods.period_of(snapshot_slot);
        let rotation = if update_period == snapshot_period {
            false
        } else if self.periods.is_next_period(snapshot_slot, update_slot) {
            true
        } else {
            return Err(RejectReason::InvalidPeriod {
                update_period,
                snapshot_period,
            });
        };

        // 3. A rotation is signed by the staged committee. Until one is proven,
        // the bootstrap committee carries over into the next period.
        let signers = match (rotation, &snapshot.next_sync_committee) {
            (true, Some(next_sync_committee)) => next_sync_committee,
            _ => &snapshot.current_sync_committee,
        };

        // 4. Finality: the finalized header is committed to in the attested state
        if let Some(finalized_header) = &update.finalized_header {
            if finalized_header.slot > update_slot
                || !self.verify_proof(
                    &finalized_header.hash_tree_root(),
                    &update.finality_branch,
                    self.config.finality_proof,
                    &update.attested_header.state_root,
                )
            {
                return Err(RejectReason::InvalidFinalityProof);
            }
        }

        // 5. Next committee: proven against the finalized state, which fixed it.
        // A finalized state from period p holds the committee for p + 1, so the
        // finalized header must sit in the attested period.
        let finalized_period = update
            .finalized_header
            .as_ref()
            .map(|header| self.periods.period_of(header.slot));
        let finalized_in_period = finalized_period.map_or(true, |period| period == update_period);
        let committee_change = if rotation {
            if !finalized_in_period {
                return Err(RejectReason::InvalidCommitteeProof);
            }
            CommitteeChange::Rotate(self.prove_next_committee(update)?)
        } else if snapshot.next_sync_committee.is_none()
            && update.next_sync_committee.is_some()
            && finalized_in_period
        {
            CommitteeChange::Stage(self.prove_next_committee(update)?)
        } else {
            CommitteeChange::None
        };

        // 6. Quorum
        let participants = update.sync_aggregate.num_participants();
        let committee_size = self.config.sync_committee_size;
        if !self.config.quorum.is_met(participants, committee_size) {
            return Err(RejectReason::InsufficientParticipants {
                participants,
                required: self.config.quorum.min_participants(committee_size),
                committee_size,
            });
        }

        // 7. Aggregate signature of the participating signers
        self.verify_sync_aggregate(signers, update)?;

        trace!(
            slot = update_slot,
            period = update_period,
            participants,
            rotation,
            "light client update validated"
        );

        Ok(ValidatedEffect {
            header: update.attested_header.clone(),
            committee_change,
            class: update.class(),
            participants,
        })
    }

    fn check_structure(&self, update: &LightClientUpdate) -> Result<(), RejectReason> {
        let committee_size = self.config.sync_committee_size;

        expect_len(
            "sync_committee_bits",
            committee_size,
            update.sync_aggregate.sync_committee_bits.len(),
        )?;

        if let Some(next_sync_committee) = &update.next_sync_committee {
            expect_len(
                "next_sync_committee",
                committee_size,
                next_sync_committee.pubkeys.len(),
            )?;
            expect_len(
                "next_sync_committee_branch",
                self.config.next_sync_committee_proof.depth,
                update.next_sync_committee_branch.len(),
            )?;
        } else {
            expect_len(
                "next_sync_committee_branch",
                0,
                update.next_sync_committee_branch.len(),
            )?;
        }

        let finality_depth = if update.finalized_header.is_some() {
            self.config.finality_proof.depth
        } else {
            0
        };
        expect_len(
            "finality_branch",
            finality_depth,
            update.finality_branch.len(),
        )
    }

    fn prove_next_committee(
        &self,
        update: &LightClientUpdate,
    ) -> Result<Arc<SyncCommittee>, RejectReason> {
        let (Some(next_sync_committee), Some(finalized_header)) =
            (&update.next_sync_committee, &update.finalized_header)
        else {
            return Err(RejectReason::InvalidCommitteeProof);
        };

        if !self.verify_proof(
            &next_sync_committee.hash_tree_root(),
            &update.next_sync_committee_branch,
            self.config.next_sync_committee_proof,
            &finalized_header.state_root,
        ) {
            return Err(RejectReason::InvalidCommitteeProof);
        }

        Ok(Arc::new(next_sync_committee.clone()))
    }

    fn verify_sync_aggregate(
        &self,
        committee: &SyncCommittee,
        update: &LightClientUpdate,
    ) -> Result<(), RejectReason> {
        let domain = self.domains.signing_domain(
            &update.fork_version,
            &self.config.genesis_validators_root,
            &self.config.domain_sync_committee,
        );
        let signing_root = self
            .domains
            .signing_root(&update.attested_header.hash_tree_root(), &domain);

        let participant_pubkeys = update
            .sync_aggregate
            .participant_indices()
            .filter_map(|index| committee.pubkeys.get(index))
            .collect::<Vec<_>>();

        match self.signatures.fast_aggregate_verify(
            &participant_pubkeys,
            &signing_root,
            &update.sync_aggregate.sync_committee_signature,
        ) {
            Ok(true) => Ok(()),
            Ok(false) => Err(RejectReason::InvalidSignature {
                reason: "aggregate signature does not verify against the participating committee members".to_string(),
            }),
            Err(error) => {
                debug!(%error, "sync aggregate could not be decoded");
                Err(RejectReason::InvalidSignature {
                    reason: error.to_string(),
                })
            }
        }
    }
}

fn expect_len(field: &'static str, expected: usize, actual: usize) -> Result<(), RejectReason> {
    if expected != actual {
        return Err(RejectReason::MalformedInput {
            field,
            expected,
            actual,
        });
    }
    Ok(())
}
