use serde::{Deserialize, Serialize};

/// Track which peers give us valid vs invalid updates.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PeerScore {
    /// Updates from this peer that got a verdict (duplicates and stale ones don't count).
    pub updates_received: u64,
    pub updates_valid: u64,
    pub updates_invalid: u64,
}

impl PeerScore {
    pub fn record_valid(&mut self) {
        self.updates_received += 1;
        self.updates_valid += 1;
    }

    pub fn record_invalid(&mut self) {
        self.updates_received += 1;
        self.updates_invalid += 1;
    }

    /// Calculate a reputation score (0.0 - 1.0).
    /// Higher is better. Peers with many invalid updates get scored down.
    pub fn reputation(&self) -> f64 {
        if self.updates_received == 0 {
            return 0.5; // Neutral for new peers
        }
        self.updates_valid as f64 / self.updates_received as f64
    }

    /// Whether this peer has sent enough bad data to be dropped.
    pub fn should_disconnect(&self, min_updates: u64, min_reputation: f64) -> bool {
        self.updates_received >= min_updates && self.reputation() < min_reputation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_score_reputation() {
        let mut score = PeerScore::default();
        assert_eq!(score.reputation(), 0.5);

        for _ in 0..10 {
            score.record_valid();
        }
        assert_eq!(score.reputation(), 1.0);

        for _ in 0..5 {
            score.record_invalid();
        }
        assert!((score.reputation() - 0.667).abs() < 0.01);
    }

    #[test]
    fn test_peer_disconnect_threshold() {
        let mut score = PeerScore::default();
        for _ in 0..4 {
            score.record_valid();
        }
        for _ in 0..5 {
            score.record_invalid();
        }
        // Not enough data yet.
        assert!(!score.should_disconnect(10, 0.5));

        score.record_invalid();
        assert!(score.should_disconnect(10, 0.5));
    }
}
