//! # Protocol Configuration & Constants
//!
//! Every magic number in crossmint lives here. The Vault and the Facilitator
//! are deployed on different chains by different transactions, possibly
//! weeks apart; the only thing guaranteeing they agree on decimals, slot
//! layout and commitment encodings is that both were compiled against this
//! file.

use crate::types::ChainId;

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// The full version string.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Numeric Parameters
// ---------------------------------------------------------------------------

/// Decimal places of every oracle price. 8, like the Aave V3 price oracle:
/// 2500 USD is `250_000_000_000`.
pub const PRICE_DECIMALS: u32 = 8;

/// One whole quote unit at [`PRICE_DECIMALS`] precision.
pub const PRICE_UNIT: u128 = 100_000_000;

/// Basis point denominator for ratios. 10_000 bps = 100%.
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Default mint ratio: one unit of collateral value authorizes one unit of
/// stable value. Deployments that want a haircut pass a lower ratio.
pub const DEFAULT_MINT_RATIO_BPS: u32 = 10_000;

/// Decimals of the stable asset.
pub const STABLE_ASSET_DECIMALS: u8 = 18;

/// Ray precision (27 decimals) for yield-bearing exchange rates.
pub const RAY: u128 = 1_000_000_000_000_000_000_000_000_000;

// ---------------------------------------------------------------------------
// Storage Layout
// ---------------------------------------------------------------------------

/// Position of the counterpart address in both the Vault's and the
/// Facilitator's storage, left-padded to a full word.
pub const COUNTERPART_SLOT: u64 = 0;

/// Position of the Vault's mint-authorization mapping in its own storage.
/// The Facilitator is constructed with this value as its commitment slot.
pub const VAULT_AUTHORIZATIONS_SLOT: u64 = 1;

/// Position of the Facilitator's burn-commitment mapping in its own storage.
/// The Vault is constructed with this value as its commitment slot.
pub const FACILITATOR_BURNS_SLOT: u64 = 2;

// ---------------------------------------------------------------------------
// Domain Tags
// ---------------------------------------------------------------------------

/// Domain for mint authorization digests. Bump the version suffix if the
/// field encoding ever changes; old and new digests must never collide.
pub const MINT_AUTHORIZATION_DOMAIN: &str = "crossmint mint authorization v1";

/// Domain for burn commitment digests.
pub const BURN_COMMITMENT_DOMAIN: &str = "crossmint burn commitment v1";

/// Domain for storage attestations signed by an attestation committee.
pub const STORAGE_ATTESTATION_DOMAIN: &str = "crossmint storage attestation v1";

/// Domain for block header hashes.
pub const BLOCK_HEADER_DOMAIN: &str = "crossmint block header v1";

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Oldest proof accepted, in blocks behind the newest accepted header of the
/// proven chain. Bounds how long a stale proof stays replayable.
pub const DEFAULT_MAX_PROOF_AGE: u64 = 256;

/// Default number of header reporters that must agree on a block header.
pub const DEFAULT_HEADER_THRESHOLD: usize = 2;

/// Number of past state snapshots a simulated chain keeps for proof serving.
pub const SNAPSHOT_RETENTION: usize = 512;

// ---------------------------------------------------------------------------
// Chains
// ---------------------------------------------------------------------------

/// Ethereum mainnet.
pub const CHAIN_ETHEREUM: ChainId = ChainId(1);

/// Gnosis chain.
pub const CHAIN_GNOSIS: ChainId = ChainId(100);

/// Gnosis Chiado testnet.
pub const CHAIN_CHIADO: ChainId = ChainId(10_200);

/// Ethereum Sepolia testnet.
pub const CHAIN_SEPOLIA: ChainId = ChainId(11_155_111);

/// Returns a friendly name for a chain id, mainly for logging.
pub fn chain_name(chain_id: ChainId) -> String {
    match chain_id {
        CHAIN_ETHEREUM => "ethereum".to_string(),
        CHAIN_GNOSIS => "gnosis".to_string(),
        CHAIN_CHIADO => "chiado".to_string(),
        CHAIN_SEPOLIA => "sepolia".to_string(),
        other => format!("chain-{}", other.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_unit_matches_decimals() {
        assert_eq!(PRICE_UNIT, 10u128.pow(PRICE_DECIMALS));
    }

    #[test]
    fn test_ray_is_27_decimals() {
        assert_eq!(RAY, 10u128.pow(27));
    }

    #[test]
    fn test_commitment_slots_are_distinct() {
        // Both mappings can live on one chain in a same-chain deployment.
        assert_ne!(VAULT_AUTHORIZATIONS_SLOT, FACILITATOR_BURNS_SLOT);
    }

    #[test]
    fn test_domains_are_distinct() {
        let domains = [
            MINT_AUTHORIZATION_DOMAIN,
            BURN_COMMITMENT_DOMAIN,
            STORAGE_ATTESTATION_DOMAIN,
            BLOCK_HEADER_DOMAIN,
        ];
        for (i, a) in domains.iter().enumerate() {
            for b in &domains[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_default_ratio_within_bounds() {
        assert!(DEFAULT_MINT_RATIO_BPS as u128 <= BPS_DENOMINATOR);
        assert!(DEFAULT_MINT_RATIO_BPS > 0);
    }

    #[test]
    fn test_chain_name_formatting() {
        assert_eq!(chain_name(CHAIN_GNOSIS), "gnosis");
        assert_eq!(chain_name(ChainId(31337)), "chain-31337");
    }
}
