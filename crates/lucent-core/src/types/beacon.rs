use std::sync::Arc;

use bitvec::prelude::{BitVec, Lsb0};
use serde::{Deserialize, Serialize};

use super::hex_serde;

/// Number of bytes in a BLS12-381 public key (compressed).
pub const BLS_PUBKEY_LEN: usize = 48;

/// Number of bytes in a BLS12-381 signature (compressed).
pub const BLS_SIGNATURE_LEN: usize = 96;

/// A 32-byte SSZ root.
pub type Root = [u8; 32];

/// Four-byte fork version.
pub type ForkVersion = [u8; 4];

/// Four-byte domain type tag.
pub type DomainType = [u8; 4];

/// 32-byte signing domain: domain type followed by the truncated fork data root.
pub type Domain = [u8; 32];

/// Slot number.
pub type Slot = u64;

/// Bitvector indicating which sync committee members signed.
pub type SyncCommitteeBits = BitVec<u8, Lsb0>;

/// A BLS12-381 public key (48 bytes, compressed G1 point).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlsPublicKey(pub [u8; BLS_PUBKEY_LEN]);

impl Serialize for BlsPublicKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(self.0)))
    }
}

impl<'de> Deserialize<'de> for BlsPublicKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = hex_serde::decode_prefixed(&String::deserialize(deserializer)?)
            .map_err(serde::de::Error::custom)?;
        Self::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

impl BlsPublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, &'static str> {
        let arr: [u8; BLS_PUBKEY_LEN] = bytes
            .try_into()
            .map_err(|_| "Invalid BLS public key length")?;
        Ok(Self(arr))
    }
}

/// A BLS12-381 signature (96 bytes, compressed G2 point).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlsSignature(pub [u8; BLS_SIGNATURE_LEN]);

impl Serialize for BlsSignature {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(self.0)))
    }
}

impl<'de> Deserialize<'de> for BlsSignature {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = hex_serde::decode_prefixed(&String::deserialize(deserializer)?)
            .map_err(serde::de::Error::custom)?;
        Self::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

impl BlsSignature {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, &'static str> {
        let arr: [u8; BLS_SIGNATURE_LEN] = bytes
            .try_into()
            .map_err(|_| "Invalid BLS signature length")?;
        Ok(Self(arr))
    }
}

/// A beacon chain block header.
/// `state_root` is the anchor every light client Merkle proof is checked against.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconBlockHeader {
    /// Slot number of this block.
    pub slot: Slot,
    /// Index of the validator who proposed this block.
    pub proposer_index: u64,
    /// Root hash of the parent beacon block.
    #[serde(with = "hex_serde")]
    pub parent_root: Root,
    /// Root hash of the beacon state after processing this block.
    #[serde(with = "hex_serde")]
    pub state_root: Root,
    /// Root hash of the block body.
    #[serde(with = "hex_serde")]
    pub body_root: Root,
}

/// A sync committee: the validators that sign off on the chain head for one period.
///
/// Never mutated once built. Snapshots hold committees behind `Arc` and swap the
/// pointer on rotation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCommittee {
    pub pubkeys: Vec<BlsPublicKey>,
    /// Aggregate of all `pubkeys`.
    pub aggregate_pubkey: BlsPublicKey,
}

impl SyncCommittee {
    /// Check the committee has exactly `size` members.
    pub fn validate(&self, size: usize) -> Result<(), String> {
        if self.pubkeys.len() != size {
            return Err(format!(
                "sync committee must have exactly {size} members, got {}",
                self.pubkeys.len()
            ));
        }
        Ok(())
    }
}

/// The aggregate BLS signature from the sync committee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncAggregate {
    /// Bit i is set iff committee member i signed.
    #[serde(with = "hex_serde::bits")]
    pub sync_committee_bits: SyncCommitteeBits,
    /// The aggregated BLS signature from all participating members.
    pub sync_committee_signature: BlsSignature,
}

impl SyncAggregate {
    /// Count how many sync committee members participated (set bits).
    pub fn num_participants(&self) -> usize {
        self.sync_committee_bits.count_ones()
    }

    /// Check if a specific committee member (by index) participated.
    pub fn has_participant(&self, index: usize) -> bool {
        self.sync_committee_bits
            .get(index)
            .map(|bit| *bit)
            .unwrap_or(false)
    }

    /// Indices of all participating committee members, ascending.
    pub fn participant_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.sync_committee_bits.iter_ones()
    }
}

/// A light client update from the beacon chain.
///
/// Untrusted input. Only its validated effects are ever persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightClientUpdate {
    /// The header that the sync committee is attesting to.
    pub attested_header: BeaconBlockHeader,
    /// The committee for the period after the attested one (rotation and staging updates).
    #[serde(default)]
    pub next_sync_committee: Option<SyncCommittee>,
    /// Merkle branch proving `next_sync_committee` against the finalized state root.
    #[serde(default, with = "hex_serde::branch")]
    pub next_sync_committee_branch: Vec<Root>,
    /// Finalized header embedded in the attested state. Absent for optimistic updates.
    #[serde(default)]
    pub finalized_header: Option<BeaconBlockHeader>,
    /// Merkle branch proving `finalized_header` against the attested state root.
    #[serde(default, with = "hex_serde::branch")]
    pub finality_branch: Vec<Root>,
    /// The aggregate signature from the sync committee.
    pub sync_aggregate: SyncAggregate,
    /// Fork version the committee signed under.
    #[serde(with = "hex_serde")]
    pub fork_version: ForkVersion,
}

impl LightClientUpdate {
    pub fn class(&self) -> UpdateClass {
        if self.finalized_header.is_some() {
            UpdateClass::Finalized
        } else {
            UpdateClass::Optimistic
        }
    }
}

/// Whether an update proves finality or only attests a head.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateClass {
    Finalized,
    Optimistic,
}

/// A light client bootstrap: the initial data needed to start syncing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightClientBootstrap {
    /// The beacon block header at the checkpoint.
    pub header: BeaconBlockHeader,
    /// The current sync committee at the checkpoint.
    pub current_sync_committee: SyncCommittee,
    /// Merkle branch proving `current_sync_committee` against `header.state_root`.
    #[serde(with = "hex_serde::branch")]
    pub current_sync_committee_branch: Vec<Root>,
}

/// The trusted state of the light client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LightClientSnapshot {
    /// Most recently accepted header.
    pub header: BeaconBlockHeader,
    /// Committee for `period(header.slot)`.
    pub current_sync_committee: Arc<SyncCommittee>,
    /// Committee for `period(header.slot) + 1`, once proven.
    pub next_sync_committee: Option<Arc<SyncCommittee>>,
}

/// Optimistic head projection served to subscribers.
/// Has the same shape as a gossiped optimistic update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestHeadUpdate {
    pub attested_header: BeaconBlockHeader,
    pub sync_aggregate: SyncAggregate,
}

impl LatestHeadUpdate {
    /// Turn a gossiped optimistic update into a full update signed under `fork_version`.
    pub fn into_update(self, fork_version: ForkVersion) -> LightClientUpdate {
        LightClientUpdate {
            attested_header: self.attested_header,
            next_sync_committee: None,
            next_sync_committee_branch: Vec::new(),
            finalized_header: None,
            finality_branch: Vec::new(),
            sync_aggregate: self.sync_aggregate,
            fork_version,
        }
    }
}

/// Finalized head projection served to subscribers.
/// Has the same shape as a gossiped finality update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedHeadUpdate {
    pub attested_header: BeaconBlockHeader,
    pub finalized_header: BeaconBlockHeader,
    #[serde(with = "hex_serde::branch")]
    pub finality_branch: Vec<Root>,
    pub sync_aggregate: SyncAggregate,
}

impl FinalizedHeadUpdate {
    /// Turn a gossiped finality update into a full update signed under `fork_version`.
    pub fn into_update(self, fork_version: ForkVersion) -> LightClientUpdate {
        LightClientUpdate {
            attested_header: self.attested_header,
            next_sync_committee: None,
            next_sync_committee_branch: Vec::new(),
            finalized_header: Some(self.finalized_header),
            finality_branch: self.finality_branch,
            sync_aggregate: self.sync_aggregate,
            fork_version,
        }
    }
}

impl From<&LightClientUpdate> for LatestHeadUpdate {
    fn from(update: &LightClientUpdate) -> Self {
        Self {
            attested_header: update.attested_header.clone(),
            sync_aggregate: update.sync_aggregate.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_aggregate_participation() {
        let mut bytes = vec![0u8; 64]; // 512 bits
        bytes[0] = 0b11111111; // First 8 members participated
        bytes[1] = 0b00000001; // 9th member

        let aggregate = SyncAggregate {
            sync_committee_bits: SyncCommitteeBits::from_vec(bytes),
            sync_committee_signature: BlsSignature([0u8; 96]),
        };

        assert_eq!(aggregate.num_participants(), 9);
        assert!(aggregate.has_participant(0));
        assert!(aggregate.has_participant(7));
        assert!(aggregate.has_participant(8));
        assert!(!aggregate.has_participant(9));
        assert!(!aggregate.has_participant(4096));
        assert_eq!(
            aggregate.participant_indices().collect::<Vec<_>>(),
            (0..9).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_update_json_roundtrip_keeps_optional_fields_empty() {
        let update = LatestHeadUpdate {
            attested_header: BeaconBlockHeader {
                slot: 77,
                proposer_index: 3,
                parent_root: [0x11; 32],
                state_root: [0x22; 32],
                body_root: [0x33; 32],
            },
            sync_aggregate: SyncAggregate {
                sync_committee_bits: SyncCommitteeBits::from_vec(vec![0xF0; 4]),
                sync_committee_signature: BlsSignature([0xAB; 96]),
            },
        }
        .into_update([0x04, 0, 0, 0]);

        let json = serde_json::to_string(&update).unwrap();
        assert!(json.contains("\"parent_root\":\"0x1111"));
        assert!(json.contains("\"sync_committee_bits\":\"0xf0f0f0f0\""));

        let decoded: LightClientUpdate = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, update);
        assert_eq!(decoded.class(), UpdateClass::Optimistic);
    }

    #[test]
    fn test_pubkey_rejects_wrong_length() {
        let result: Result<BlsPublicKey, _> = serde_json::from_str("\"0xaabb\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_committee_size_validation() {
        let committee = SyncCommittee {
            pubkeys: vec![BlsPublicKey([0u8; 48]); 100],
            aggregate_pubkey: BlsPublicKey([0u8; 48]),
        };
        assert!(committee.validate(512).is_err());
        assert!(committee.validate(100).is_ok());
    }
}
