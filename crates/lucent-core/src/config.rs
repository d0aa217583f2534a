//! Chain parameters consumed by the update engine.
//!
//! All of these are chain-level constants owned by the network definition. They
//! are grouped into one struct that is validated once, when a validator is
//! constructed, so the engine never divides by a zero period length or reads a
//! branch at an impossible depth.

use std::path::Path;

use anyhow::Context as _;
use hex_literal::hex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::beacon::{DomainType, ForkVersion, Root, Slot};
use crate::types::hex_serde;

/// Domain type for sync committee signatures.
pub const DOMAIN_SYNC_COMMITTEE: DomainType = [0x07, 0x00, 0x00, 0x00];

/// Ethereum mainnet genesis validators root.
pub const MAINNET_GENESIS_VALIDATORS_ROOT: Root =
    hex!("4b363db94e286120d76eb905340fdd4e54bfe9f06bf33ff6cf5ad27f511bfe95");

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be non-zero")]
    Zero { field: &'static str },

    #[error("{field}: generalized index {gindex} is not at depth {depth}")]
    InvalidProofLocation {
        field: &'static str,
        depth: usize,
        gindex: u64,
    },

    #[error("quorum {numerator}/{denominator} must be a fraction below one")]
    InvalidQuorum { numerator: u64, denominator: u64 },

    #[error("slots_per_epoch * epochs_per_sync_committee_period overflows")]
    PeriodOverflow,

    #[error("sync committee size {0} must be a multiple of 8")]
    UnalignedCommitteeSize(usize),

    #[error("fork schedule must start at epoch 0 and be strictly increasing")]
    InvalidForkSchedule,

    #[error("failed to parse chain config: {0}")]
    Parse(String),
}

/// Where a proven field sits inside a beacon state tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofLocation {
    pub depth: usize,
    pub gindex: u64,
}

impl ProofLocation {
    pub const fn new(depth: usize, gindex: u64) -> Self {
        Self { depth, gindex }
    }

    /// Position of the field among the `2^depth` leaves of its subtree.
    pub fn subtree_index(&self) -> u64 {
        self.gindex - (1 << self.depth)
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        // A generalized index at depth d lies in [2^d, 2^(d+1)).
        if self.depth == 0 || self.depth >= 63 || self.gindex >> self.depth != 1 {
            return Err(ConfigError::InvalidProofLocation {
                field,
                depth: self.depth,
                gindex: self.gindex,
            });
        }
        Ok(())
    }
}

/// Minimum signer fraction: participants must be strictly greater than
/// `numerator / denominator` of the committee.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quorum {
    pub numerator: u64,
    pub denominator: u64,
}

impl Quorum {
    pub const TWO_THIRDS: Quorum = Quorum {
        numerator: 2,
        denominator: 3,
    };

    pub fn is_met(&self, participants: usize, committee_size: usize) -> bool {
        participants as u128 * self.denominator as u128
            > committee_size as u128 * self.numerator as u128
    }

    /// Smallest participant count that meets the quorum.
    pub fn min_participants(&self, committee_size: usize) -> usize {
        (committee_size as u128 * self.numerator as u128 / self.denominator as u128) as usize + 1
    }
}

/// One entry of the fork schedule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fork {
    pub name: String,
    pub epoch: u64,
    #[serde(with = "hex_serde")]
    pub version: ForkVersion,
}

impl Fork {
    pub fn new(name: &str, epoch: u64, version: ForkVersion) -> Self {
        Self {
            name: name.to_string(),
            epoch,
            version,
        }
    }
}

/// Forks ordered by activation epoch. The first one activates at genesis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkSchedule(pub Vec<Fork>);

impl ForkSchedule {
    pub fn iter(&self) -> std::slice::Iter<'_, Fork> {
        self.0.iter()
    }

    /// The fork active at `epoch`.
    pub fn fork_at_epoch(&self, epoch: u64) -> Option<&Fork> {
        self.iter().rev().find(|fork| fork.epoch <= epoch)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let starts_at_genesis = self.0.first().is_some_and(|fork| fork.epoch == 0);
        let increasing = self.0.windows(2).all(|pair| pair[0].epoch < pair[1].epoch);
        if !starts_at_genesis || !increasing {
            return Err(ConfigError::InvalidForkSchedule);
        }
        Ok(())
    }
}

/// Chain parameters for light client validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    /// Human-readable network name, for logs.
    pub name: String,
    pub sync_committee_size: usize,
    pub slots_per_epoch: u64,
    pub epochs_per_sync_committee_period: u64,
    /// Finalized header root inside the attested state.
    pub finality_proof: ProofLocation,
    /// Next sync committee root inside a state.
    pub next_sync_committee_proof: ProofLocation,
    /// Current sync committee root inside the checkpoint state.
    pub current_sync_committee_proof: ProofLocation,
    pub quorum: Quorum,
    #[serde(with = "hex_serde")]
    pub domain_sync_committee: DomainType,
    #[serde(with = "hex_serde")]
    pub genesis_validators_root: Root,
    pub fork_schedule: ForkSchedule,
}

impl ChainConfig {
    /// Ethereum mainnet parameters (Altair state layout).
    pub fn mainnet() -> Self {
        Self {
            name: "mainnet".to_string(),
            sync_committee_size: 512,
            slots_per_epoch: 32,
            epochs_per_sync_committee_period: 256,
            finality_proof: ProofLocation::new(6, 105),
            next_sync_committee_proof: ProofLocation::new(5, 55),
            current_sync_committee_proof: ProofLocation::new(5, 54),
            quorum: Quorum::TWO_THIRDS,
            domain_sync_committee: DOMAIN_SYNC_COMMITTEE,
            genesis_validators_root: MAINNET_GENESIS_VALIDATORS_ROOT,
            fork_schedule: ForkSchedule(vec![
                Fork::new("phase0", 0, [0x00, 0x00, 0x00, 0x00]),
                Fork::new("altair", 74240, [0x01, 0x00, 0x00, 0x00]),
                Fork::new("bellatrix", 144896, [0x02, 0x00, 0x00, 0x00]),
                Fork::new("capella", 194048, [0x03, 0x00, 0x00, 0x00]),
                Fork::new("deneb", 269568, [0x04, 0x00, 0x00, 0x00]),
            ]),
        }
    }

    /// The `minimal` preset used by test networks: small committees, short periods.
    pub fn minimal() -> Self {
        Self {
            name: "minimal".to_string(),
            sync_committee_size: 32,
            slots_per_epoch: 8,
            epochs_per_sync_committee_period: 8,
            genesis_validators_root: [0u8; 32],
            fork_schedule: ForkSchedule(vec![
                Fork::new("phase0", 0, [0x00, 0x00, 0x00, 0x01]),
                Fork::new("altair", 1, [0x01, 0x00, 0x00, 0x01]),
            ]),
            ..Self::mainnet()
        }
    }

    /// Parse a JSON chain config and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a chain config from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read chain config {}", path.display()))?;
        Self::from_json(&json)
            .with_context(|| format!("invalid chain config {}", path.display()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync_committee_size == 0 {
            return Err(ConfigError::Zero {
                field: "sync_committee_size",
            });
        }
        if self.sync_committee_size % 8 != 0 {
            return Err(ConfigError::UnalignedCommitteeSize(
                self.sync_committee_size,
            ));
        }
        if self.slots_per_epoch == 0 {
            return Err(ConfigError::Zero {
                field: "slots_per_epoch",
            });
        }
        if self.epochs_per_sync_committee_period == 0 {
            return Err(ConfigError::Zero {
                field: "epochs_per_sync_committee_period",
            });
        }
        if self
            .slots_per_epoch
            .checked_mul(self.epochs_per_sync_committee_period)
            .is_none()
        {
            return Err(ConfigError::PeriodOverflow);
        }
        self.finality_proof.validate("finality_proof")?;
        self.next_sync_committee_proof
            .validate("next_sync_committee_proof")?;
        self.current_sync_committee_proof
            .validate("current_sync_committee_proof")?;

        let Quorum {
            numerator,
            denominator,
        } = self.quorum;
        if denominator == 0 || numerator >= denominator {
            return Err(ConfigError::InvalidQuorum {
                numerator,
                denominator,
            });
        }

        self.fork_schedule.validate()
    }

    pub fn slots_per_sync_committee_period(&self) -> u64 {
        self.slots_per_epoch * self.epochs_per_sync_committee_period
    }

    /// Fork version active at `slot`, falling back to the genesis fork.
    pub fn fork_version_at_slot(&self, slot: Slot) -> ForkVersion {
        let epoch = slot / self.slots_per_epoch.max(1);
        self.fork_schedule
            .fork_at_epoch(epoch)
            .map(|fork| fork.version)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert_eq!(ChainConfig::mainnet().validate(), Ok(()));
        assert_eq!(ChainConfig::minimal().validate(), Ok(()));
        assert_eq!(ChainConfig::mainnet().slots_per_sync_committee_period(), 8192);
        assert_eq!(ChainConfig::minimal().slots_per_sync_committee_period(), 64);
    }

    #[test]
    fn test_quorum_two_thirds() {
        let quorum = Quorum::TWO_THIRDS;
        assert_eq!(quorum.min_participants(512), 342);
        assert!(quorum.is_met(342, 512));
        assert!(!quorum.is_met(341, 512));

        assert_eq!(quorum.min_participants(32), 22);
        assert!(quorum.is_met(22, 32));
        assert!(!quorum.is_met(21, 32));

        // Exactly two thirds is not enough.
        assert!(!quorum.is_met(2, 3));
    }

    #[test]
    fn test_rejects_zero_constants() {
        let mut config = ChainConfig::minimal();
        config.slots_per_epoch = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::Zero {
                field: "slots_per_epoch"
            })
        );

        let mut config = ChainConfig::minimal();
        config.sync_committee_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inconsistent_proof_location() {
        let mut config = ChainConfig::mainnet();
        config.finality_proof = ProofLocation::new(5, 105);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidProofLocation {
                field: "finality_proof",
                ..
            })
        ));
        assert_eq!(ProofLocation::new(6, 105).subtree_index(), 41);
    }

    #[test]
    fn test_rejects_bad_quorum_and_schedule() {
        let mut config = ChainConfig::mainnet();
        config.quorum = Quorum {
            numerator: 3,
            denominator: 3,
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidQuorum { .. })
        ));

        let mut config = ChainConfig::mainnet();
        config.fork_schedule.0.swap(1, 2);
        assert_eq!(config.validate(), Err(ConfigError::InvalidForkSchedule));

        let mut config = ChainConfig::mainnet();
        config.fork_schedule.0.clear();
        assert_eq!(config.validate(), Err(ConfigError::InvalidForkSchedule));
    }

    #[test]
    fn test_fork_version_at_slot() {
        let config = ChainConfig::mainnet();
        assert_eq!(config.fork_version_at_slot(0), [0x00, 0x00, 0x00, 0x00]);
        assert_eq!(config.fork_version_at_slot(74240 * 32 - 1), [0x00, 0x00, 0x00, 0x00]);
        assert_eq!(config.fork_version_at_slot(74240 * 32), [0x01, 0x00, 0x00, 0x00]);
        assert_eq!(config.fork_version_at_slot(u64::MAX), [0x04, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = ChainConfig::minimal();
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"domain_sync_committee\": \"0x07000000\""));
        assert_eq!(ChainConfig::from_json(&json), Ok(config));

        let broken = json.replace("\"slots_per_epoch\": 8", "\"slots_per_epoch\": 0");
        assert_eq!(
            ChainConfig::from_json(&broken),
            Err(ConfigError::Zero {
                field: "slots_per_epoch"
            })
        );
        assert!(matches!(
            ChainConfig::from_json("{}"),
            Err(ConfigError::Parse(_))
        ));
    }
}
