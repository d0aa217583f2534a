//! Deterministic committees, headers and signed updates for tests.
//!
//! Everything here produces valid proofs and real BLS signatures, so tests
//! exercise the same code paths as production input.

use std::sync::Arc;

use blst::min_pk::{AggregatePublicKey, AggregateSignature, SecretKey};

use crate::config::{ChainConfig, ProofLocation};
use crate::consensus::domain::{compute_domain, compute_signing_root};
use crate::consensus::signature::ETH_BLS_DST;
use crate::merkle::compute_merkle_root;
use crate::ssz::{sha256, HashTreeRoot};
use crate::types::beacon::*;

/// Compressed point at infinity, the aggregate of zero signatures.
pub const INFINITY_SIGNATURE: [u8; BLS_SIGNATURE_LEN] = {
    let mut bytes = [0u8; BLS_SIGNATURE_LEN];
    bytes[0] = 0xc0;
    bytes
};

/// A sync committee along with its members' secret keys.
pub struct TestCommittee {
    pub secret_keys: Vec<SecretKey>,
    pub committee: SyncCommittee,
}

impl TestCommittee {
    /// `size` members, keys derived from `seed` and the member index.
    pub fn generate(size: usize, seed: u8) -> Self {
        let secret_keys = (0..size)
            .map(|index| {
                let mut ikm = [0x42u8; 32];
                ikm[..8].copy_from_slice(&(index as u64).to_le_bytes());
                ikm[8] = seed;
                SecretKey::key_gen(&ikm, &[]).expect("ikm is 32 bytes")
            })
            .collect::<Vec<_>>();

        let public_keys = secret_keys
            .iter()
            .map(|sk| sk.sk_to_pk())
            .collect::<Vec<_>>();
        let aggregate = AggregatePublicKey::aggregate(&public_keys.iter().collect::<Vec<_>>(), false)
            .expect("non-empty committee")
            .to_public_key();

        Self {
            committee: SyncCommittee {
                pubkeys: public_keys
                    .iter()
                    .map(|pk| BlsPublicKey(pk.to_bytes()))
                    .collect(),
                aggregate_pubkey: BlsPublicKey(aggregate.to_bytes()),
            },
            secret_keys,
        }
    }

    pub fn size(&self) -> usize {
        self.secret_keys.len()
    }

    /// Sign `message` with the first `participants` members.
    pub fn sign(&self, message: &Root, participants: usize) -> SyncAggregate {
        let mut bits = SyncCommitteeBits::repeat(false, self.size());
        for index in 0..participants {
            bits.set(index, true);
        }

        let signatures = self.secret_keys[..participants]
            .iter()
            .map(|sk| sk.sign(message, ETH_BLS_DST, &[]))
            .collect::<Vec<_>>();
        let signature = if signatures.is_empty() {
            INFINITY_SIGNATURE
        } else {
            AggregateSignature::aggregate(&signatures.iter().collect::<Vec<_>>(), false)
                .expect("non-empty signature set")
                .to_signature()
                .to_bytes()
        };

        SyncAggregate {
            sync_committee_bits: bits,
            sync_committee_signature: BlsSignature(signature),
        }
    }
}

/// Place `leaf` at `location` under a fresh root.
/// Siblings are `[i; 32]` for level `i`, so branches are easy to tell apart.
pub fn embed_leaf(leaf: &Root, location: ProofLocation) -> (Root, Vec<Root>) {
    let branch = (0..location.depth)
        .map(|level| [level as u8; 32])
        .collect::<Vec<_>>();
    (compute_merkle_root(leaf, &branch, location.gindex), branch)
}

/// A header at `slot` with roots derived from the slot.
pub fn header_at(slot: Slot) -> BeaconBlockHeader {
    BeaconBlockHeader {
        slot,
        proposer_index: slot % 7,
        parent_root: sha256(&slot.wrapping_sub(1).to_le_bytes()),
        state_root: sha256(&[&slot.to_le_bytes()[..], b"state"].concat()),
        body_root: sha256(&[&slot.to_le_bytes()[..], b"body"].concat()),
    }
}

/// Two consecutive committees on a chain, and builders for updates they sign.
pub struct Harness {
    pub config: ChainConfig,
    pub current: TestCommittee,
    pub next: TestCommittee,
}

impl Harness {
    pub fn new(config: ChainConfig) -> Self {
        let size = config.sync_committee_size;
        Self {
            config,
            current: TestCommittee::generate(size, 1),
            next: TestCommittee::generate(size, 2),
        }
    }

    /// The minimal preset: 32 members, 64-slot periods.
    pub fn minimal() -> Self {
        Self::new(ChainConfig::minimal())
    }

    pub fn snapshot(&self, slot: Slot, next: Option<&TestCommittee>) -> LightClientSnapshot {
        LightClientSnapshot {
            header: header_at(slot),
            current_sync_committee: Arc::new(self.current.committee.clone()),
            next_sync_committee: next.map(|committee| Arc::new(committee.committee.clone())),
        }
    }

    /// A bootstrap at `slot` proving the current committee.
    pub fn bootstrap(&self, slot: Slot) -> LightClientBootstrap {
        let mut header = header_at(slot);
        let (state_root, branch) = embed_leaf(
            &self.current.committee.hash_tree_root(),
            self.config.current_sync_committee_proof,
        );
        header.state_root = state_root;

        LightClientBootstrap {
            header,
            current_sync_committee: self.current.committee.clone(),
            current_sync_committee_branch: branch,
        }
    }

    /// An optimistic update at `slot` signed by the first `participants` of `signer`.
    pub fn optimistic_update(
        &self,
        signer: &TestCommittee,
        slot: Slot,
        participants: usize,
    ) -> LightClientUpdate {
        let update = LightClientUpdate {
            attested_header: header_at(slot),
            next_sync_committee: None,
            next_sync_committee_branch: Vec::new(),
            finalized_header: None,
            finality_branch: Vec::new(),
            sync_aggregate: signer.sign(&[0u8; 32], 0),
            fork_version: [0u8; 4],
        };
        self.sign(signer, update, participants)
    }

    /// A finalized update at `slot` whose finalized header is one slot older.
    pub fn finalized_update(
        &self,
        signer: &TestCommittee,
        slot: Slot,
        participants: usize,
        next: Option<&TestCommittee>,
    ) -> LightClientUpdate {
        self.finalized_update_with(signer, slot, slot.saturating_sub(1), participants, next)
    }

    /// A finalized update with explicit attested and finalized slots.
    /// When `next` is given its committee is proven against the finalized state.
    pub fn finalized_update_with(
        &self,
        signer: &TestCommittee,
        attested_slot: Slot,
        finalized_slot: Slot,
        participants: usize,
        next: Option<&TestCommittee>,
    ) -> LightClientUpdate {
        let mut finalized_header = header_at(finalized_slot);
        let mut next_sync_committee_branch = Vec::new();
        if let Some(next) = next {
            let (state_root, branch) = embed_leaf(
                &next.committee.hash_tree_root(),
                self.config.next_sync_committee_proof,
            );
            finalized_header.state_root = state_root;
            next_sync_committee_branch = branch;
        }

        let mut attested_header = header_at(attested_slot);
        let (state_root, finality_branch) =
            embed_leaf(&finalized_header.hash_tree_root(), self.config.finality_proof);
        attested_header.state_root = state_root;

        let update = LightClientUpdate {
            attested_header,
            next_sync_committee: next.map(|next| next.committee.clone()),
            next_sync_committee_branch,
            finalized_header: Some(finalized_header),
            finality_branch,
            sync_aggregate: signer.sign(&[0u8; 32], 0),
            fork_version: [0u8; 4],
        };
        self.sign(signer, update, participants)
    }

    /// Re-sign `update` under the fork active at its attested slot.
    pub fn sign(
        &self,
        signer: &TestCommittee,
        mut update: LightClientUpdate,
        participants: usize,
    ) -> LightClientUpdate {
        update.fork_version = self
            .config
            .fork_version_at_slot(update.attested_header.slot);
        let domain = compute_domain(
            &self.config.domain_sync_committee,
            &update.fork_version,
            &self.config.genesis_validators_root,
        );
        let signing_root =
            compute_signing_root(&update.attested_header.hash_tree_root(), &domain);
        update.sync_aggregate = signer.sign(&signing_root, participants);
        update
    }
}
