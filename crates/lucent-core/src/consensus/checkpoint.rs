use thiserror::Error;

use crate::types::beacon::{Root, Slot};
use crate::types::hex_serde;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckpointError {
    #[error("Insufficient checkpoint source agreement: {agreeing}/{total} sources agree (need {required})")]
    InsufficientAgreement {
        agreeing: usize,
        total: usize,
        required: usize,
    },

    #[error("No checkpoint sources available")]
    NoSources,

    #[error("Checkpoint root format invalid: {reason}")]
    InvalidFormat { reason: String },
}

/// A block root enough independent sources agreed on.
///
/// This is the trusted block root handed to `SnapshotStore::bootstrap_from`;
/// everything after it is checked cryptographically.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedCheckpoint {
    pub block_root: Root,
    pub slot: Slot,
    /// How many sources reported this root.
    pub source_agreement: usize,
    pub total_sources: usize,
}

/// Pick the block root reported by the most sources and require that at
/// least `required_agreement` of them agree on it.
///
/// Each source reports `(block_root, slot)`. Ties go to the root seen first.
pub fn verify_checkpoint_consensus(
    reports: &[(Root, Slot)],
    required_agreement: usize,
) -> Result<VerifiedCheckpoint, CheckpointError> {
    let total = reports.len();
    if total == 0 {
        return Err(CheckpointError::NoSources);
    }

    let mut tallies: Vec<(Root, Slot, usize)> = Vec::new();
    for &(root, slot) in reports {
        match tallies.iter_mut().find(|(seen, _, _)| *seen == root) {
            Some((_, _, count)) => *count += 1,
            None => tallies.push((root, slot, 1)),
        }
    }

    let mut best: Option<(Root, Slot, usize)> = None;
    for tally in tallies {
        if best.map_or(true, |(_, _, count)| tally.2 > count) {
            best = Some(tally);
        }
    }
    let (block_root, slot, agreeing) = best.ok_or(CheckpointError::NoSources)?;

    if required_agreement == 0 || agreeing < required_agreement {
        return Err(CheckpointError::InsufficientAgreement {
            agreeing,
            total,
            required: required_agreement,
        });
    }

    Ok(VerifiedCheckpoint {
        block_root,
        slot,
        source_agreement: agreeing,
        total_sources: total,
    })
}

/// Parse a 32-byte block root, with or without a `0x` prefix.
pub fn parse_checkpoint_root(input: &str) -> Result<Root, CheckpointError> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if digits.len() != 64 {
        return Err(CheckpointError::InvalidFormat {
            reason: format!("Expected 64 hex characters, got {}", digits.len()),
        });
    }

    hex_serde::decode_array(digits).map_err(|reason| CheckpointError::InvalidFormat { reason })
}
