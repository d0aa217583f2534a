use lucent_core::RejectReason;
use thiserror::Error;

use crate::gossip::UpdateKind;

/// Why the feed refused a message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    #[error("Failed to decode {kind:?} payload: {reason}")]
    Decode { kind: UpdateKind, reason: String },

    #[error(transparent)]
    Rejected(#[from] RejectReason),
}
