use serde::{Deserialize, Serialize};

use crate::gossip::UpdateKind;

/// Counters for everything the feed has seen, and where the head stands.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncStats {
    /// Total messages received across all topics.
    pub messages_received: u64,
    /// Messages applied to the store.
    pub messages_accepted: u64,
    /// Messages that failed decoding or validation (peer sent bad data).
    pub messages_rejected: u64,
    /// Exact repeats of a recent payload.
    pub messages_duplicate: u64,
    /// Well-formed updates that were not newer than the snapshot.
    pub messages_stale: u64,
    pub finality_updates: u64,
    pub optimistic_updates: u64,
    pub committee_updates: u64,
    pub committee_rotations: u64,
    /// Slot of the current snapshot header.
    pub head_slot: u64,
    /// Highest finalized slot served to subscribers.
    pub finalized_slot: Option<u64>,
    /// Slot the network is at, as far as we know.
    pub target_slot: Option<u64>,
}

impl SyncStats {
    pub(crate) fn record_kind(&mut self, kind: UpdateKind) {
        match kind {
            UpdateKind::Finality => self.finality_updates += 1,
            UpdateKind::Optimistic => self.optimistic_updates += 1,
            UpdateKind::Committee => self.committee_updates += 1,
        }
    }

    /// Calculate sync percentage (0.0 - 1.0).
    pub fn sync_percentage(&self) -> f64 {
        match self.target_slot {
            Some(target) if target > 0 => (self.head_slot as f64 / target as f64).min(1.0),
            _ => 0.0,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Feed: {} received ({} accepted, {} rejected, {} duplicate, {} stale) | {} finality, {} optimistic, {} committee | head {} finalized {}",
            self.messages_received,
            self.messages_accepted,
            self.messages_rejected,
            self.messages_duplicate,
            self.messages_stale,
            self.finality_updates,
            self.optimistic_updates,
            self.committee_updates,
            self.head_slot,
            self.finalized_slot
                .map_or_else(|| "-".to_string(), |slot| slot.to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_percentage() {
        let mut stats = SyncStats::default();
        assert_eq!(stats.sync_percentage(), 0.0);

        stats.head_slot = 50;
        stats.target_slot = Some(100);
        assert_eq!(stats.sync_percentage(), 0.5);

        stats.head_slot = 120;
        assert_eq!(stats.sync_percentage(), 1.0);
    }

    #[test]
    fn test_summary() {
        let mut stats = SyncStats {
            messages_received: 100,
            messages_accepted: 95,
            messages_rejected: 3,
            messages_duplicate: 2,
            head_slot: 4242,
            ..Default::default()
        };
        stats.record_kind(UpdateKind::Finality);

        let summary = stats.summary();
        assert!(summary.contains("100 received"));
        assert!(summary.contains("95 accepted"));
        assert!(summary.contains("1 finality"));
        assert!(summary.contains("head 4242 finalized -"));
    }
}
