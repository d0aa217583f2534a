//! Minimal SSZ merkleization for the containers a light client hashes.
//!
//! Only what the update engine needs: `BeaconBlockHeader`, `SyncCommittee` and
//! the BLS public keys inside it. Every node is SHA-256 over two 32-byte chunks.

use sha2::{Digest, Sha256};

use crate::types::beacon::{BeaconBlockHeader, BlsPublicKey, Root, SyncCommittee};

/// Types that have an SSZ `hash_tree_root`.
pub trait HashTreeRoot {
    fn hash_tree_root(&self) -> Root;
}

/// SHA256 hash of arbitrary data.
pub fn sha256(data: &[u8]) -> Root {
    Sha256::digest(data).into()
}

/// SHA256 hash of two 32-byte values concatenated.
pub fn hash_pair(left: &Root, right: &Root) -> Root {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Encode a u64 as a 32-byte SSZ leaf (little-endian, zero-padded).
pub fn uint64_leaf(value: u64) -> Root {
    let mut leaf = [0u8; 32];
    leaf[..8].copy_from_slice(&value.to_le_bytes());
    leaf
}

/// Merkleize `chunks`, padding with zero chunks up to the next power of two.
pub fn merkleize(chunks: &[Root]) -> Root {
    match chunks.len() {
        0 => [0u8; 32],
        1 => chunks[0],
        len => {
            let width = len.next_power_of_two();
            let mut layer = chunks.to_vec();
            layer.resize(width, [0u8; 32]);

            while layer.len() > 1 {
                layer = layer
                    .chunks_exact(2)
                    .map(|pair| hash_pair(&pair[0], &pair[1]))
                    .collect();
            }
            layer[0]
        }
    }
}

impl HashTreeRoot for BeaconBlockHeader {
    fn hash_tree_root(&self) -> Root {
        merkleize(&[
            uint64_leaf(self.slot),
            uint64_leaf(self.proposer_index),
            self.parent_root,
            self.state_root,
            self.body_root,
        ])
    }
}

impl HashTreeRoot for BlsPublicKey {
    // Bytes48 packs into two chunks, the second right-padded with zeros.
    fn hash_tree_root(&self) -> Root {
        let mut low = [0u8; 32];
        let mut high = [0u8; 32];
        low.copy_from_slice(&self.0[..32]);
        high[..16].copy_from_slice(&self.0[32..]);
        hash_pair(&low, &high)
    }
}

impl HashTreeRoot for SyncCommittee {
    fn hash_tree_root(&self) -> Root {
        let pubkey_roots = self
            .pubkeys
            .iter()
            .map(HashTreeRoot::hash_tree_root)
            .collect::<Vec<_>>();

        hash_pair(
            &merkleize(&pubkey_roots),
            &self.aggregate_pubkey.hash_tree_root(),
        )
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn test_uint64_leaf() {
        let leaf = uint64_leaf(42);
        assert_eq!(leaf[0], 42);
        assert_eq!(leaf[1..8], [0; 7]);
        assert_eq!(leaf[8..32], [0; 24]);
    }

    #[test]
    fn test_hash_pair_is_ordered() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        assert_eq!(hash_pair(&a, &b), hash_pair(&a, &b));
        assert_ne!(hash_pair(&a, &b), hash_pair(&b, &a));

        let mut joined = [0u8; 64];
        joined[..32].copy_from_slice(&a);
        joined[32..].copy_from_slice(&b);
        assert_eq!(hash_pair(&a, &b), sha256(&joined));
    }

    #[test]
    fn test_merkleize_pads_to_power_of_two() {
        let chunks = [[1u8; 32], [2u8; 32], [3u8; 32]];
        let zero = [0u8; 32];
        let expected = hash_pair(
            &hash_pair(&chunks[0], &chunks[1]),
            &hash_pair(&chunks[2], &zero),
        );
        assert_eq!(merkleize(&chunks), expected);
        assert_eq!(merkleize(&chunks[..1]), chunks[0]);
    }

    #[test]
    fn test_default_header_root() {
        // hash_tree_root of an all-zero BeaconBlockHeader: merkleization of 8 zero chunks.
        assert_eq!(
            BeaconBlockHeader::default().hash_tree_root(),
            hex!("c78009fdf07fc56a11f122370658a353aaa542ed63e44c4bc15ff4cd105ab33c")
        );
    }

    #[test]
    fn test_header_root_commits_to_every_field() {
        let base = BeaconBlockHeader::default();
        let mut changed = base.clone();
        changed.body_root = [1u8; 32];
        assert_ne!(base.hash_tree_root(), changed.hash_tree_root());

        let mut changed = base.clone();
        changed.slot = 1;
        assert_ne!(base.hash_tree_root(), changed.hash_tree_root());
    }
}
