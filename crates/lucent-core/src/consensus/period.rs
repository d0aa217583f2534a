use crate::config::ChainConfig;
use crate::types::beacon::Slot;

/// Maps slots to sync committee periods.
///
/// Periods are never stored; they are always recomputed from a header slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeriodCalculator {
    slots_per_epoch: u64,
    slots_per_period: u64,
}

impl PeriodCalculator {
    /// Only built from a config that passed `ChainConfig::validate`; outside the
    /// crate it is reached through `UpdateValidator::periods`.
    pub(crate) fn new(config: &ChainConfig) -> Self {
        Self {
            slots_per_epoch: config.slots_per_epoch,
            slots_per_period: config.slots_per_sync_committee_period(),
        }
    }

    pub fn slots_per_period(&self) -> u64 {
        self.slots_per_period
    }

    pub fn epoch_of(&self, slot: Slot) -> u64 {
        slot / self.slots_per_epoch
    }

    pub fn period_of(&self, slot: Slot) -> u64 {
        slot / self.slots_per_period
    }

    /// First slot of `period`.
    pub fn period_start_slot(&self, period: u64) -> Slot {
        period.saturating_mul(self.slots_per_period)
    }

    /// True iff `b` falls in the period right after `a`'s.
    pub fn is_next_period(&self, a: Slot, b: Slot) -> bool {
        self.period_of(b) == self.period_of(a) + 1
    }

    pub fn is_same_period(&self, a: Slot, b: Slot) -> bool {
        self.period_of(a) == self.period_of(b)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ConfigError;
    use crate::consensus::validator::UpdateValidator;

    #[test]
    fn test_mainnet_periods() {
        let periods = PeriodCalculator::new(&ChainConfig::mainnet());
        assert_eq!(periods.slots_per_period(), 8192);
        assert_eq!(periods.period_of(0), 0);
        assert_eq!(periods.period_of(8191), 0);
        assert_eq!(periods.period_of(8192), 1);
        assert_eq!(periods.epoch_of(8192), 256);
        assert_eq!(periods.period_start_slot(3), 3 * 8192);
    }

    #[test]
    fn test_zero_lengths_never_reach_the_calculator() {
        for zero_field in ["slots_per_epoch", "epochs_per_sync_committee_period"] {
            let mut config = ChainConfig::minimal();
            match zero_field {
                "slots_per_epoch" => config.slots_per_epoch = 0,
                _ => config.epochs_per_sync_committee_period = 0,
            }
            assert_eq!(
                UpdateValidator::new(Arc::new(config)).err(),
                Some(ConfigError::Zero { field: zero_field })
            );
        }

        let validator = UpdateValidator::new(Arc::new(ChainConfig::minimal())).unwrap();
        assert_eq!(validator.periods().slots_per_period(), 64);
        assert_eq!(validator.periods().epoch_of(64), 8);
    }

    #[test]
    fn test_period_adjacency() {
        let periods = PeriodCalculator::new(&ChainConfig::minimal());
        assert!(periods.is_next_period(1, 64));
        assert!(periods.is_next_period(63, 127));
        assert!(!periods.is_next_period(1, 63));
        assert!(!periods.is_next_period(1, 128));
        assert!(!periods.is_next_period(64, 1));
        assert!(periods.is_same_period(64, 127));
    }
}
