//! Light client gossip topics and payload decoding.
//!
//! Topics follow the beacon gossip layout
//! `/eth2/{fork_digest}/{name}/{encoding}`. Payloads are the JSON objects the
//! beacon API serves for the same messages. Nothing decoded here is trusted:
//! every update still goes through `lucent-core` validation.

use lucent_core::consensus::domain::compute_fork_digest;
use lucent_core::types::hex_serde;
use lucent_core::{
    BeaconBlockHeader, ChainConfig, FinalizedHeadUpdate, LatestHeadUpdate, LightClientUpdate,
    Root, SyncAggregate, SyncCommittee,
};
use serde::{Deserialize, Serialize};

use crate::FeedError;

pub const FINALITY_UPDATE_TOPIC_NAME: &str = "light_client_finality_update";
pub const OPTIMISTIC_UPDATE_TOPIC_NAME: &str = "light_client_optimistic_update";
pub const COMMITTEE_UPDATE_TOPIC_NAME: &str = "light_client_update";

/// Payload encoding suffix.
pub const ENCODING: &str = "json";

/// Which light client message a topic carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateKind {
    /// Finalized header plus the attested header that proves it.
    Finality,
    /// Attested header only. Lowest latency, weakest guarantee.
    Optimistic,
    /// Full update carrying the next sync committee.
    Committee,
}

impl UpdateKind {
    pub const ALL: [UpdateKind; 3] = [Self::Finality, Self::Optimistic, Self::Committee];

    pub fn topic_name(&self) -> &'static str {
        match self {
            Self::Finality => FINALITY_UPDATE_TOPIC_NAME,
            Self::Optimistic => OPTIMISTIC_UPDATE_TOPIC_NAME,
            Self::Committee => COMMITTEE_UPDATE_TOPIC_NAME,
        }
    }

    /// Determine the message kind from a topic string.
    pub fn from_topic(topic: &str) -> Option<Self> {
        let name = topic.trim_matches('/').split('/').nth(2)?;
        Self::ALL.into_iter().find(|kind| kind.topic_name() == name)
    }
}

/// Full topic string for `kind` under a fork digest.
pub fn topic(kind: UpdateKind, fork_digest: [u8; 4]) -> String {
    format!(
        "/eth2/{}/{}/{ENCODING}",
        hex::encode(fork_digest),
        kind.topic_name()
    )
}

/// All light client topics for the fork active at `slot`.
pub fn topics_at_slot(config: &ChainConfig, slot: u64) -> Vec<String> {
    let digest = compute_fork_digest(
        &config.fork_version_at_slot(slot),
        &config.genesis_validators_root,
    );
    UpdateKind::ALL
        .into_iter()
        .map(|kind| topic(kind, digest))
        .collect()
}

/// A message received from the network.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    /// The topic this message was received on.
    pub topic: String,
    /// The raw payload bytes.
    pub data: Vec<u8>,
    /// The peer that propagated this message to us.
    pub source_peer: Option<String>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, data: Vec<u8>, source_peer: Option<&str>) -> Self {
        Self {
            topic: topic.into(),
            data,
            source_peer: source_peer.map(str::to_string),
        }
    }
}

/// Wire form of a full committee update. Carries no fork version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeUpdateMessage {
    pub attested_header: BeaconBlockHeader,
    pub next_sync_committee: SyncCommittee,
    #[serde(with = "hex_serde::branch")]
    pub next_sync_committee_branch: Vec<Root>,
    pub finalized_header: BeaconBlockHeader,
    #[serde(with = "hex_serde::branch")]
    pub finality_branch: Vec<Root>,
    pub sync_aggregate: SyncAggregate,
}

impl CommitteeUpdateMessage {
    pub fn into_update(self, fork_version: [u8; 4]) -> LightClientUpdate {
        LightClientUpdate {
            attested_header: self.attested_header,
            next_sync_committee: Some(self.next_sync_committee),
            next_sync_committee_branch: self.next_sync_committee_branch,
            finalized_header: Some(self.finalized_header),
            finality_branch: self.finality_branch,
            sync_aggregate: self.sync_aggregate,
            fork_version,
        }
    }
}

impl TryFrom<&LightClientUpdate> for CommitteeUpdateMessage {
    type Error = FeedError;

    fn try_from(update: &LightClientUpdate) -> Result<Self, Self::Error> {
        let (Some(next_sync_committee), Some(finalized_header)) =
            (&update.next_sync_committee, &update.finalized_header)
        else {
            return Err(FeedError::Decode {
                kind: UpdateKind::Committee,
                reason: "update carries no next sync committee or finalized header".to_string(),
            });
        };

        Ok(Self {
            attested_header: update.attested_header.clone(),
            next_sync_committee: next_sync_committee.clone(),
            next_sync_committee_branch: update.next_sync_committee_branch.clone(),
            finalized_header: finalized_header.clone(),
            finality_branch: update.finality_branch.clone(),
            sync_aggregate: update.sync_aggregate.clone(),
        })
    }
}

/// Decode a payload of `kind`, filling in the fork version from the schedule
/// at the attested slot.
pub fn decode_update(
    kind: UpdateKind,
    data: &[u8],
    config: &ChainConfig,
) -> Result<LightClientUpdate, FeedError> {
    let decode_error = |e: serde_json::Error| FeedError::Decode {
        kind,
        reason: e.to_string(),
    };

    let update = match kind {
        UpdateKind::Finality => serde_json::from_slice::<FinalizedHeadUpdate>(data)
            .map_err(decode_error)?
            .into_update([0u8; 4]),
        UpdateKind::Optimistic => serde_json::from_slice::<LatestHeadUpdate>(data)
            .map_err(decode_error)?
            .into_update([0u8; 4]),
        UpdateKind::Committee => serde_json::from_slice::<CommitteeUpdateMessage>(data)
            .map_err(decode_error)?
            .into_update([0u8; 4]),
    };

    let fork_version = config.fork_version_at_slot(update.attested_header.slot);
    Ok(LightClientUpdate {
        fork_version,
        ..update
    })
}

#[cfg(test)]
mod tests {
    use lucent_core::test_utils::Harness;

    use super::*;

    #[test]
    fn test_kind_from_topic() {
        let digest = [0x6a, 0x95, 0xa1, 0xa9];
        for kind in UpdateKind::ALL {
            assert_eq!(UpdateKind::from_topic(&topic(kind, digest)), Some(kind));
        }
        assert_eq!(
            topic(UpdateKind::Finality, digest),
            "/eth2/6a95a1a9/light_client_finality_update/json"
        );
        assert_eq!(UpdateKind::from_topic("/eth2/6a95a1a9/beacon_block/json"), None);
        assert_eq!(UpdateKind::from_topic("light_client_update"), None);
    }

    #[test]
    fn test_topics_follow_fork_schedule() {
        let config = ChainConfig::mainnet();
        let deneb_slot = 269_568 * 32;
        let topics = topics_at_slot(&config, deneb_slot);
        assert_eq!(topics.len(), 3);
        assert!(topics.iter().all(|topic| topic.starts_with("/eth2/6a95a1a9/")));
        assert_ne!(topics_at_slot(&config, 0), topics);
    }

    #[test]
    fn test_decode_fills_fork_version() {
        let harness = Harness::minimal();
        let update = harness.finalized_update(&harness.current, 20, 32, Some(&harness.next));

        let finality = FinalizedHeadUpdate {
            attested_header: update.attested_header.clone(),
            finalized_header: update.finalized_header.clone().unwrap(),
            finality_branch: update.finality_branch.clone(),
            sync_aggregate: update.sync_aggregate.clone(),
        };
        let data = serde_json::to_vec(&finality).unwrap();
        let decoded = decode_update(UpdateKind::Finality, &data, &harness.config).unwrap();
        assert_eq!(decoded.fork_version, update.fork_version);
        assert_eq!(decoded.finalized_header, update.finalized_header);
        assert!(decoded.next_sync_committee.is_none());

        let committee = CommitteeUpdateMessage::try_from(&update).unwrap();
        let data = serde_json::to_vec(&committee).unwrap();
        assert_eq!(
            decode_update(UpdateKind::Committee, &data, &harness.config).unwrap(),
            update
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let config = ChainConfig::minimal();
        assert!(matches!(
            decode_update(UpdateKind::Optimistic, b"{\"attested_header\":1}", &config),
            Err(FeedError::Decode {
                kind: UpdateKind::Optimistic,
                ..
            })
        ));

        let harness = Harness::minimal();
        let optimistic = harness.optimistic_update(&harness.current, 5, 32);
        assert!(CommitteeUpdateMessage::try_from(&optimistic).is_err());
    }
}
