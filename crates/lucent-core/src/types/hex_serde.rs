//! Serde helpers for `0x`-prefixed hex encoding of fixed-size byte fields.

use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

use super::beacon::{Root, SyncCommitteeBits};

/// Decode a hex string with or without a leading `0x`.
pub(crate) fn decode_prefixed(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(s.strip_prefix("0x").unwrap_or(s))
}

fn encode_prefixed(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub(crate) fn decode_array<const N: usize>(s: &str) -> Result<[u8; N], String> {
    let bytes = decode_prefixed(s).map_err(|e| e.to_string())?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| format!("expected {N} bytes, got {}", bytes.len()))
}

pub fn serialize<S: Serializer, const N: usize>(
    bytes: &[u8; N],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&encode_prefixed(bytes))
}

pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
    deserializer: D,
) -> Result<[u8; N], D::Error> {
    decode_array(&String::deserialize(deserializer)?).map_err(D::Error::custom)
}

/// Merkle branches as a list of hex roots.
pub mod branch {
    use super::*;

    pub fn serialize<S: Serializer>(branch: &[Root], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(branch.iter().map(|node| encode_prefixed(node)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Root>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|node| decode_array(node).map_err(D::Error::custom))
            .collect()
    }
}

/// Sync committee bits as the hex of their little-endian backing bytes.
pub mod bits {
    use super::*;

    pub fn serialize<S: Serializer>(
        bits: &SyncCommitteeBits,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode_prefixed(bits.as_raw_slice()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<SyncCommitteeBits, D::Error> {
        let bytes =
            decode_prefixed(&String::deserialize(deserializer)?).map_err(D::Error::custom)?;
        Ok(SyncCommitteeBits::from_vec(bytes))
    }
}
