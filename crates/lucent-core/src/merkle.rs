//! SSZ Merkle inclusion proofs.
//!
//! https://ethereum.github.io/consensus-specs/ssz/merkle-proofs

use anyhow::ensure;

use crate::ssz::hash_pair;
use crate::types::beacon::Root;

/// Verifies that a leaf sits at a generalized index under a root.
pub trait MerkleProofVerifier: Send + Sync {
    fn verify(
        &self,
        leaf: &Root,
        branch: &[Root],
        depth: usize,
        generalized_index: u64,
        root: &Root,
    ) -> bool;
}

/// The SHA-256 binary Merkle tree used by SSZ.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256MerkleVerifier;

impl MerkleProofVerifier for Sha256MerkleVerifier {
    fn verify(
        &self,
        leaf: &Root,
        branch: &[Root],
        depth: usize,
        generalized_index: u64,
        root: &Root,
    ) -> bool {
        verify_merkle_branch(leaf, branch, depth, generalized_index, root)
    }
}

/// Return the given bit of a generalized index.
/// Passing a leaf index instead gives the same result below `depth`.
fn get_generalized_index_bit(index: u64, position: usize) -> bool {
    position < 64 && (index >> position) & 1 == 1
}

/// Fold `branch` into `leaf` bottom-up. Bit i of `generalized_index` set means
/// the branch node at level i is the left sibling.
pub fn compute_merkle_root(leaf: &Root, branch: &[Root], generalized_index: u64) -> Root {
    branch
        .iter()
        .enumerate()
        .fold(*leaf, |current, (level, node)| {
            if get_generalized_index_bit(generalized_index, level) {
                hash_pair(node, &current)
            } else {
                hash_pair(&current, node)
            }
        })
}

/// Verify a Merkle branch against an expected root.
/// A branch whose length is not `depth` never verifies.
pub fn verify_merkle_branch(
    leaf: &Root,
    branch: &[Root],
    depth: usize,
    generalized_index: u64,
    root: &Root,
) -> bool {
    if branch.len() != depth {
        return false;
    }

    compute_merkle_root(leaf, branch, generalized_index) == *root
}

/// Build a full tree over `leaves` at `depth`, stored as a 1-indexed array:
/// node `i` has children `2i` and `2i + 1`, `tree[1]` is the root.
pub fn merkle_tree(leaves: &[Root], depth: usize) -> anyhow::Result<Vec<Root>> {
    ensure!(depth < 32, "Tree depth {depth} is too large");
    let bottom_length = 1usize << depth;
    ensure!(
        leaves.len() <= bottom_length,
        "Number of leaves is greater than the bottom length (depth too small)"
    );

    let mut tree = vec![[0u8; 32]; bottom_length];
    tree.extend_from_slice(leaves);
    tree.resize(bottom_length * 2, [0u8; 32]);

    for i in (1..bottom_length).rev() {
        tree[i] = hash_pair(&tree[i * 2], &tree[i * 2 + 1]);
    }

    Ok(tree)
}

/// Produce the branch for the leaf at `index` (0-based within the bottom layer),
/// ordered bottom-up as `verify_merkle_branch` expects.
pub fn generate_proof(tree: &[Root], index: u64, depth: usize) -> anyhow::Result<Vec<Root>> {
    ensure!(depth < 32, "Tree depth {depth} is too large");
    ensure!(index < 1 << depth, "Index out of bounds");
    ensure!(tree.len() == 2 << depth, "Tree does not have depth {depth}");

    let mut node = (1u64 << depth) + index;
    let mut proof = Vec::with_capacity(depth);
    while node > 1 {
        proof.push(tree[(node ^ 1) as usize]);
        node >>= 1;
    }

    Ok(proof)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssz::sha256;

    fn leaves(count: usize) -> Vec<Root> {
        (0..count).map(|i| sha256(&i.to_le_bytes())).collect()
    }

    #[test]
    fn test_verify_merkle_branch_trivial() {
        // Single-depth branch: leaf with one sibling
        let leaf = sha256(b"leaf");
        let sibling = sha256(b"sibling");
        let root = hash_pair(&leaf, &sibling);

        assert!(verify_merkle_branch(&leaf, &[sibling], 1, 2, &root));
        // Wrong side should fail
        assert!(!verify_merkle_branch(&leaf, &[sibling], 1, 3, &root));
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let leaf = sha256(b"leaf");
        let sibling = sha256(b"sibling");
        let root = hash_pair(&leaf, &sibling);

        assert!(!verify_merkle_branch(&leaf, &[sibling], 2, 4, &root));
        assert!(!verify_merkle_branch(&leaf, &[sibling, sibling], 1, 2, &root));
        assert!(!verify_merkle_branch(&leaf, &[], 1, 2, &root));
    }

    #[test]
    fn test_generated_proofs_verify_at_every_index() {
        for depth in 1..=5 {
            let leaves = leaves(1 << depth);
            let tree = merkle_tree(&leaves, depth).unwrap();
            let root = tree[1];

            for (index, leaf) in leaves.iter().enumerate() {
                let index = index as u64;
                let proof = generate_proof(&tree, index, depth).unwrap();
                let gindex = (1u64 << depth) + index;

                assert!(verify_merkle_branch(leaf, &proof, depth, gindex, &root));
                // Leaf index and generalized index agree below `depth`.
                assert!(Sha256MerkleVerifier.verify(leaf, &proof, depth, index, &root));
            }
        }
    }

    #[test]
    fn test_any_single_bit_flip_breaks_the_proof() {
        let depth = 4;
        let leaves = leaves(11);
        let tree = merkle_tree(&leaves, depth).unwrap();
        let root = tree[1];
        let index = 6;
        let gindex = (1u64 << depth) + index;
        let leaf = leaves[index as usize];
        let proof = generate_proof(&tree, index, depth).unwrap();
        assert!(verify_merkle_branch(&leaf, &proof, depth, gindex, &root));

        for bit in 0..256 {
            let flip = |value: &Root| {
                let mut flipped = *value;
                flipped[bit / 8] ^= 1 << (bit % 8);
                flipped
            };

            assert!(!verify_merkle_branch(&flip(&leaf), &proof, depth, gindex, &root));
            assert!(!verify_merkle_branch(&leaf, &proof, depth, gindex, &flip(&root)));
            for level in 0..proof.len() {
                let mut tampered = proof.clone();
                tampered[level] = flip(&tampered[level]);
                assert!(!verify_merkle_branch(&leaf, &tampered, depth, gindex, &root));
            }
        }
    }

    #[test]
    fn test_padding_leaves_are_zero() {
        let tree = merkle_tree(&leaves(3), 2).unwrap();
        assert_eq!(tree.len(), 8);
        assert_eq!(tree[7], [0u8; 32]);
        assert!(merkle_tree(&leaves(5), 2).is_err());
        assert!(generate_proof(&tree, 4, 2).is_err());
    }
}
