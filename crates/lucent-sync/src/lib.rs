//! # Lucent Sync
//!
//! The inbound side of the light client: takes raw messages from whatever
//! transport delivers them, turns them into updates and feeds them to a
//! `lucent_core::SnapshotStore`.
//!
//! ## Trust Model
//!
//! The feed trusts NOTHING. Peers can:
//! - Send invalid data → rejected by lucent-core validation, peer scored down
//! - Replay old data → ignored as stale or duplicate, peer not penalized
//! - Flood the feed → bounded queue and duplicate suppression
//!
//! Verdicts are returned per message so the transport can apply its own
//! peer policy.

pub mod error;
pub mod feed;
pub mod gossip;
pub mod peer;
pub mod stats;

pub use error::FeedError;
pub use feed::{inbound_channel, FeedConfig, IgnoreReason, UpdateFeed, Verdict};
pub use gossip::{decode_update, topic, topics_at_slot, CommitteeUpdateMessage, InboundMessage, UpdateKind};
pub use peer::PeerScore;
pub use stats::SyncStats;
