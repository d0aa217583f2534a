use blst::min_pk::{PublicKey, Signature};
use blst::BLST_ERROR;
use thiserror::Error;

use crate::types::beacon::{BlsPublicKey, BlsSignature, Root};

/// DST (domain separation tag) for Ethereum BLS signatures.
pub const ETH_BLS_DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("no public keys to verify against")]
    NoParticipants,

    #[error("invalid BLS public key at index {index}: {reason}")]
    InvalidPublicKey { index: usize, reason: String },

    #[error("failed to deserialize signature: {0}")]
    InvalidSignatureEncoding(String),
}

/// Aggregate BLS verification.
pub trait SignatureEngine: Send + Sync {
    /// Verify one signature over `message` by the aggregate of `pubkeys`.
    ///
    /// `Ok(false)` means the signature is well-formed but does not verify;
    /// `Err` means the keys or signature could not be decoded.
    fn fast_aggregate_verify(
        &self,
        pubkeys: &[&BlsPublicKey],
        message: &Root,
        signature: &BlsSignature,
    ) -> Result<bool, SignatureError>;
}

/// BLS12-381 verification backed by `blst`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlstSignatureEngine;

impl SignatureEngine for BlstSignatureEngine {
    fn fast_aggregate_verify(
        &self,
        pubkeys: &[&BlsPublicKey],
        message: &Root,
        signature: &BlsSignature,
    ) -> Result<bool, SignatureError> {
        if pubkeys.is_empty() {
            return Err(SignatureError::NoParticipants);
        }

        let sig = Signature::from_bytes(&signature.0)
            .map_err(|e| SignatureError::InvalidSignatureEncoding(format!("{e:?}")))?;

        let pks = pubkeys
            .iter()
            .enumerate()
            .map(|(index, pk)| {
                PublicKey::key_validate(&pk.0).map_err(|e| SignatureError::InvalidPublicKey {
                    index,
                    reason: format!("{e:?}"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let pk_refs = pks.iter().collect::<Vec<_>>();

        Ok(sig.fast_aggregate_verify(true, message, ETH_BLS_DST, &pk_refs)
            == BLST_ERROR::BLST_SUCCESS)
    }
}
