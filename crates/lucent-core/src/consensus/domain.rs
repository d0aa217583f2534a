use crate::ssz::hash_pair;
use crate::types::beacon::{Domain, DomainType, ForkVersion, Root};

/// Derives signing domains and signing roots.
///
/// The domain binds a signature to a fork and a chain, so the same message
/// cannot be replayed across forks or networks.
pub trait DomainComputer: Send + Sync {
    fn signing_domain(
        &self,
        fork_version: &ForkVersion,
        genesis_validators_root: &Root,
        domain_type: &DomainType,
    ) -> Domain;

    /// Mix an object's `hash_tree_root` with a domain.
    fn signing_root(&self, object_root: &Root, domain: &Domain) -> Root;
}

/// Beacon chain domain separation: `domain_type ++ fork_data_root[..28]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BeaconDomainComputer;

impl DomainComputer for BeaconDomainComputer {
    fn signing_domain(
        &self,
        fork_version: &ForkVersion,
        genesis_validators_root: &Root,
        domain_type: &DomainType,
    ) -> Domain {
        compute_domain(domain_type, fork_version, genesis_validators_root)
    }

    fn signing_root(&self, object_root: &Root, domain: &Domain) -> Root {
        compute_signing_root(object_root, domain)
    }
}

/// Compute the signing root: `hash_tree_root(SigningData { object_root, domain })`.
pub fn compute_signing_root(object_root: &Root, domain: &Domain) -> Root {
    hash_pair(object_root, domain)
}

/// Compute the domain for signing.
/// domain = domain_type + fork_data_root[:28]
pub fn compute_domain(
    domain_type: &DomainType,
    fork_version: &ForkVersion,
    genesis_validators_root: &Root,
) -> Domain {
    let fork_data_root = compute_fork_data_root(fork_version, genesis_validators_root);
    let mut domain = [0u8; 32];
    domain[..4].copy_from_slice(domain_type);
    domain[4..].copy_from_slice(&fork_data_root[..28]);
    domain
}

/// Compute the fork data root from fork version and genesis validators root.
pub fn compute_fork_data_root(fork_version: &ForkVersion, genesis_validators_root: &Root) -> Root {
    // SSZ: fork_version right-padded to one chunk, then genesis_validators_root
    let mut version_chunk = [0u8; 32];
    version_chunk[..4].copy_from_slice(fork_version);
    hash_pair(&version_chunk, genesis_validators_root)
}

/// The 4-byte digest that names gossip topics for a fork.
pub fn compute_fork_digest(fork_version: &ForkVersion, genesis_validators_root: &Root) -> [u8; 4] {
    let fork_data_root = compute_fork_data_root(fork_version, genesis_validators_root);
    let mut digest = [0u8; 4];
    digest.copy_from_slice(&fork_data_root[..4]);
    digest
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;
    use crate::config::{DOMAIN_SYNC_COMMITTEE, MAINNET_GENESIS_VALIDATORS_ROOT};

    #[test]
    fn test_compute_domain() {
        let domain = compute_domain(
            &DOMAIN_SYNC_COMMITTEE,
            &[0x04, 0x00, 0x00, 0x00], // Deneb fork version
            &[0xaa; 32],
        );
        // Domain should start with the domain type
        assert_eq!(&domain[..4], &DOMAIN_SYNC_COMMITTEE);
        // And be deterministic
        let domain2 = BeaconDomainComputer.signing_domain(
            &[0x04, 0x00, 0x00, 0x00],
            &[0xaa; 32],
            &DOMAIN_SYNC_COMMITTEE,
        );
        assert_eq!(domain, domain2);
    }

    #[test]
    fn test_domain_separates_forks_and_chains() {
        let deneb = compute_domain(&DOMAIN_SYNC_COMMITTEE, &[4, 0, 0, 0], &[0xaa; 32]);
        let capella = compute_domain(&DOMAIN_SYNC_COMMITTEE, &[3, 0, 0, 0], &[0xaa; 32]);
        let other_chain = compute_domain(&DOMAIN_SYNC_COMMITTEE, &[4, 0, 0, 0], &[0xbb; 32]);
        assert_ne!(deneb, capella);
        assert_ne!(deneb, other_chain);

        let object_root = [0x42; 32];
        assert_ne!(
            compute_signing_root(&object_root, &deneb),
            compute_signing_root(&object_root, &capella)
        );
    }

    #[test]
    fn test_mainnet_fork_digest() {
        assert_eq!(
            compute_fork_digest(&[0x04, 0x00, 0x00, 0x00], &MAINNET_GENESIS_VALIDATORS_ROOT),
            hex!("6a95a1a9")
        );
    }
}
