use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use lucent_core::ssz::sha256;
use lucent_core::{RejectReason, Root, SnapshotStore, UpdateClass, ValidatedEffect};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::gossip::{decode_update, InboundMessage, UpdateKind};
use crate::peer::PeerScore;
use crate::stats::SyncStats;
use crate::FeedError;

/// Feed tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// How many recent payload hashes to remember for duplicate suppression.
    pub dedup_capacity: usize,
    /// Bound of the inbound message queue.
    pub channel_capacity: usize,
    /// Verdicts needed before a peer can be flagged.
    pub disconnect_min_updates: u64,
    /// Peers whose share of valid updates drops below this are flagged.
    pub disconnect_min_reputation: f64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            dedup_capacity: 1024,
            channel_capacity: 256,
            disconnect_min_updates: 10,
            disconnect_min_reputation: 0.5,
        }
    }
}

/// Why a message was dropped without penalizing its sender.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Same topic and payload as a recent message.
    Duplicate,
    /// Valid-looking, but not newer than the current snapshot.
    Stale,
}

/// The outcome for one inbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Accept(ValidatedEffect),
    Ignore(IgnoreReason),
    Reject(FeedError),
}

/// Funnels inbound messages into a `SnapshotStore`.
///
/// The feed owns its dedup cache, peer scores and stats. Run it as the single
/// consumer of an mpsc queue, or call `handle` directly.
pub struct UpdateFeed {
    store: Arc<SnapshotStore>,
    config: FeedConfig,
    seen: LruCache<Root, ()>,
    peers: HashMap<String, PeerScore>,
    stats: SyncStats,
}

/// Bounded queue for feeding messages to `UpdateFeed::run`.
pub fn inbound_channel(
    config: &FeedConfig,
) -> (mpsc::Sender<InboundMessage>, mpsc::Receiver<InboundMessage>) {
    mpsc::channel(config.channel_capacity.max(1))
}

impl UpdateFeed {
    pub fn new(store: Arc<SnapshotStore>, config: FeedConfig) -> Self {
        let capacity = NonZeroUsize::new(config.dedup_capacity).unwrap_or(NonZeroUsize::MIN);
        let head_slot = store.snapshot().header.slot;

        Self {
            store,
            config,
            seen: LruCache::new(capacity),
            peers: HashMap::new(),
            stats: SyncStats {
                head_slot,
                ..Default::default()
            },
        }
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    pub fn peer_score(&self, peer: &str) -> Option<&PeerScore> {
        self.peers.get(peer)
    }

    /// Peers that should be disconnected, sorted by id.
    pub fn peers_to_disconnect(&self) -> Vec<&str> {
        let mut peers = self
            .peers
            .iter()
            .filter(|(_, score)| {
                score.should_disconnect(
                    self.config.disconnect_min_updates,
                    self.config.disconnect_min_reputation,
                )
            })
            .map(|(peer, _)| peer.as_str())
            .collect::<Vec<_>>();
        peers.sort_unstable();
        peers
    }

    /// Classify, decode, deduplicate and apply one message.
    pub fn handle(&mut self, message: &InboundMessage) -> Verdict {
        self.stats.messages_received += 1;

        let id = sha256(&[message.topic.as_bytes(), &message.data].concat());
        if self.seen.put(id, ()).is_some() {
            self.stats.messages_duplicate += 1;
            return Verdict::Ignore(IgnoreReason::Duplicate);
        }

        let verdict = match self.process(message) {
            Ok(effect) => Verdict::Accept(effect),
            Err(FeedError::Rejected(RejectReason::StaleUpdate { .. })) => {
                Verdict::Ignore(IgnoreReason::Stale)
            }
            Err(error) => Verdict::Reject(error),
        };

        match &verdict {
            Verdict::Accept(effect) => {
                self.stats.messages_accepted += 1;
                self.stats.head_slot = effect.header.slot;
                if effect.class == UpdateClass::Finalized {
                    self.stats.finalized_slot = self
                        .store
                        .latest_finalized_head_update()
                        .map(|update| update.finalized_header.slot);
                }
                if effect.is_rotation() {
                    self.stats.committee_rotations += 1;
                }
                self.score(message, PeerScore::record_valid);
            }
            Verdict::Ignore(reason) => {
                self.stats.messages_stale += 1;
                debug!(topic = %message.topic, ?reason, "update ignored");
            }
            Verdict::Reject(error) => {
                self.stats.messages_rejected += 1;
                debug!(
                    topic = %message.topic,
                    peer = message.source_peer.as_deref().unwrap_or("-"),
                    %error,
                    "update rejected"
                );
                self.score(message, PeerScore::record_invalid);
            }
        }

        verdict
    }

    fn process(&mut self, message: &InboundMessage) -> Result<ValidatedEffect, FeedError> {
        let kind = UpdateKind::from_topic(&message.topic)
            .ok_or_else(|| FeedError::UnknownTopic(message.topic.clone()))?;
        self.stats.record_kind(kind);

        let update = decode_update(kind, &message.data, self.store.validator().config())?;
        let slot = update.attested_header.slot;
        self.stats.target_slot = Some(self.stats.target_slot.map_or(slot, |t| t.max(slot)));

        Ok(self.store.apply(&update)?)
    }

    fn score(&mut self, message: &InboundMessage, record: fn(&mut PeerScore)) {
        let Some(peer) = &message.source_peer else {
            return;
        };

        let score = self.peers.entry(peer.clone()).or_default();
        let was_flagged = score.should_disconnect(
            self.config.disconnect_min_updates,
            self.config.disconnect_min_reputation,
        );
        record(score);

        if !was_flagged
            && score.should_disconnect(
                self.config.disconnect_min_updates,
                self.config.disconnect_min_reputation,
            )
        {
            warn!(
                peer,
                reputation = score.reputation(),
                invalid = score.updates_invalid,
                "peer sends too many invalid updates"
            );
        }
    }

    /// Consume messages until every sender is dropped, then return the final stats.
    pub async fn run(mut self, mut inbound: mpsc::Receiver<InboundMessage>) -> SyncStats {
        info!(head_slot = self.stats.head_slot, "update feed started");

        while let Some(message) = inbound.recv().await {
            self.handle(&message);
        }

        info!(summary = %self.stats.summary(), "update feed stopped");
        self.stats
    }
}
