//! Swapping the proof backend.
//!
//! The same Vault and Facilitator code, deployed with an Ed25519
//! attestation committee instead of GiriGiriBashi. Only the wiring and the
//! proofs change.

mod common;

use std::sync::Arc;

use common::{admin, user, E18, HOME, TARGET};
use crossmint_contracts::commitment::commitment_slot;
use crossmint_contracts::verifier::{attestation_message, Attestation, VerifierError};
use crossmint_contracts::{
    AttestationVerifier, BurnCommitment, CollateralToken, CommitmentProof, Facilitator,
    FacilitatorError, FacilitatorParams, MintAuthorization, PriceOracle, StableAsset, Vault,
    VaultError, VaultParams, YieldBearingToken,
};
use crossmint_protocol::config::{
    FACILITATOR_BURNS_SLOT, PRICE_UNIT, VAULT_AUTHORIZATIONS_SLOT,
};
use crossmint_protocol::crypto::Keypair;
use crossmint_protocol::storage::StorageValue;
use crossmint_protocol::{Address, CallContext, ChainId};

fn committee() -> Vec<Keypair> {
    (1..=3u8).map(|i| Keypair::from_seed(&[i; 32])).collect()
}

fn attesters(ctx: &CallContext, remote: ChainId) -> Arc<AttestationVerifier> {
    let v = Arc::new(AttestationVerifier::new(ctx, 1, 8).unwrap());
    v.add_chain(ctx, remote).unwrap();
    for k in committee() {
        v.add_member(ctx, k.public_key()).unwrap();
    }
    v.set_threshold(ctx, 2).unwrap();
    v
}

fn attest(
    signers: &[Keypair],
    chain: ChainId,
    block: u64,
    account: &Address,
    slot_base: u64,
    nonce: u64,
    value: StorageValue,
) -> CommitmentProof {
    let slot = commitment_slot(slot_base, nonce);
    let msg = attestation_message(chain, block, account, &slot, &value);
    CommitmentProof::Attestation(Attestation {
        block_number: block,
        value,
        signatures: signers.iter().map(|k| (k.public_key(), k.sign(&msg))).collect(),
    })
}

#[test]
fn round_trip_with_attestation_backend() {
    let home_ctx = CallContext::new(admin(), HOME, 1);
    let target_ctx = CallContext::new(admin(), TARGET, 1);
    let vault_addr = Address::derive("vault");
    let facilitator_addr = Address::derive("facilitator");
    let stable_addr = Address::derive("stable");
    let keys = committee();

    let oracle = Arc::new(PriceOracle::new(&home_ctx));
    let mut collateral = YieldBearingToken::new(Address::derive("aToken"), &home_ctx, 18);
    oracle
        .set_asset_price(&home_ctx, collateral.address(), 2_500 * PRICE_UNIT)
        .unwrap();
    oracle.set_asset_price(&home_ctx, stable_addr, PRICE_UNIT).unwrap();

    let mut vault = Vault::new(
        vault_addr,
        &home_ctx,
        VaultParams {
            stable_asset: stable_addr,
            chain_id: HOME,
            target_chain_id: TARGET,
            commitment_slot: FACILITATOR_BURNS_SLOT,
            mint_ratio_bps: 10_000,
            counterpart: Some(facilitator_addr),
        },
        oracle,
        attesters(&home_ctx, TARGET),
    )
    .unwrap();
    let mut facilitator = Facilitator::new(
        facilitator_addr,
        &target_ctx,
        FacilitatorParams {
            stable_asset: stable_addr,
            chain_id: TARGET,
            target_chain_id: HOME,
            commitment_slot: VAULT_AUTHORIZATIONS_SLOT,
            counterpart: Some(vault_addr),
        },
        attesters(&target_ctx, HOME),
    )
    .unwrap();
    let mut stable = StableAsset::new(stable_addr, &target_ctx, 18);
    stable.set_minter(&target_ctx, facilitator_addr).unwrap();

    collateral.mint(&home_ctx, user(), 100 * E18).unwrap();
    collateral
        .approve(&home_ctx.with_caller(user()), vault_addr, u128::MAX)
        .unwrap();

    // Deposit and mint.
    let user_home = home_ctx.with_caller(user());
    let auth = vault.mint(&user_home, &mut collateral, user(), 100 * E18).unwrap();

    let one = attest(&keys[..1], HOME, 1, &vault_addr, VAULT_AUTHORIZATIONS_SLOT, 0, auth.digest());
    let err = facilitator
        .mint(&target_ctx, &mut stable, user(), auth.amount, 0, &one)
        .unwrap_err();
    assert!(matches!(
        err,
        FacilitatorError::CommitmentMismatch {
            source: VerifierError::InsufficientAttestations { valid: 1, threshold: 2 },
            ..
        }
    ));

    let two = attest(&keys[..2], HOME, 1, &vault_addr, VAULT_AUTHORIZATIONS_SLOT, 0, auth.digest());
    facilitator
        .mint(&target_ctx, &mut stable, user(), auth.amount, 0, &two)
        .unwrap();
    assert_eq!(stable.balance_of(&user()), 250_000 * E18);

    // Burn and release.
    let user_target = target_ctx.with_caller(user());
    stable.approve(&user_target, facilitator_addr, auth.amount).unwrap();
    let burn = facilitator
        .burn_and_release_collateral(&user_target, &mut stable, collateral.address(), user(), auth.amount)
        .unwrap();

    let proof = attest(&keys, TARGET, 1, &facilitator_addr, FACILITATOR_BURNS_SLOT, 0, burn.digest());
    let released = vault
        .verify_burn_and_release_collateral(&home_ctx, &mut collateral, user(), burn.amount, burn.nonce, &proof)
        .unwrap();
    assert_eq!(released, 100 * E18);
    assert_eq!(collateral.balance_of(&user()), 100 * E18);
}

#[test]
fn rejected_release_leaves_attested_head_unchanged() {
    let home_ctx = CallContext::new(admin(), HOME, 1);
    let vault_addr = Address::derive("vault");
    let facilitator_addr = Address::derive("facilitator");
    let stable_addr = Address::derive("stable");
    let keys = committee();

    let oracle = Arc::new(PriceOracle::new(&home_ctx));
    let mut collateral = YieldBearingToken::new(Address::derive("aToken"), &home_ctx, 18);
    oracle
        .set_asset_price(&home_ctx, collateral.address(), 2_500 * PRICE_UNIT)
        .unwrap();
    oracle.set_asset_price(&home_ctx, stable_addr, PRICE_UNIT).unwrap();
    let verifier = attesters(&home_ctx, TARGET);
    let mut vault = Vault::new(
        vault_addr,
        &home_ctx,
        VaultParams {
            stable_asset: stable_addr,
            chain_id: HOME,
            target_chain_id: TARGET,
            commitment_slot: FACILITATOR_BURNS_SLOT,
            mint_ratio_bps: 10_000,
            counterpart: Some(facilitator_addr),
        },
        oracle,
        verifier.clone(),
    )
    .unwrap();

    collateral.mint(&home_ctx, user(), 100 * E18).unwrap();
    let user_home = home_ctx.with_caller(user());
    collateral.approve(&user_home, vault_addr, u128::MAX).unwrap();
    let auth = vault.mint(&user_home, &mut collateral, user(), 100 * E18).unwrap();

    // Correctly attested, but for more than the position ever minted.
    let over = BurnCommitment {
        nonce: 0,
        user: user(),
        collateral_asset: collateral.address(),
        amount: auth.amount + 1,
        source_chain: TARGET,
    };
    let proof = attest(&keys, TARGET, 50, &facilitator_addr, FACILITATOR_BURNS_SLOT, 0, over.digest());
    let err = vault
        .verify_burn_and_release_collateral(&home_ctx, &mut collateral, user(), over.amount, 0, &proof)
        .unwrap_err();
    assert!(matches!(err, VaultError::ReleaseExceedsDeposit { .. }));
    assert_eq!(verifier.head(TARGET), Some(0));
    assert!(!vault.is_released(0));

    let exact = BurnCommitment {
        nonce: 1,
        amount: auth.amount,
        ..over
    };
    let proof = attest(&keys, TARGET, 50, &facilitator_addr, FACILITATOR_BURNS_SLOT, 1, exact.digest());
    let released = vault
        .verify_burn_and_release_collateral(&home_ctx, &mut collateral, user(), exact.amount, 1, &proof)
        .unwrap();
    assert_eq!(released, 100 * E18);
    assert_eq!(verifier.head(TARGET), Some(50));
}

#[test]
fn failed_mint_leaves_attested_head_unchanged() {
    let target_ctx = CallContext::new(admin(), TARGET, 1);
    let vault_addr = Address::derive("vault");
    let facilitator_addr = Address::derive("facilitator");
    let stable_addr = Address::derive("stable");
    let keys = committee();

    let verifier = attesters(&target_ctx, HOME);
    let mut facilitator = Facilitator::new(
        facilitator_addr,
        &target_ctx,
        FacilitatorParams {
            stable_asset: stable_addr,
            chain_id: TARGET,
            target_chain_id: HOME,
            commitment_slot: VAULT_AUTHORIZATIONS_SLOT,
            counterpart: Some(vault_addr),
        },
        verifier.clone(),
    )
    .unwrap();
    // No minter set yet, so the stable asset refuses the Facilitator.
    let mut stable = StableAsset::new(stable_addr, &target_ctx, 18);

    let auth = MintAuthorization {
        nonce: 0,
        recipient: user(),
        amount: 1_000 * E18,
        source_chain: HOME,
    };
    let proof = attest(&keys, HOME, 20, &vault_addr, VAULT_AUTHORIZATIONS_SLOT, 0, auth.digest());
    assert!(facilitator
        .mint(&target_ctx, &mut stable, user(), auth.amount, 0, &proof)
        .is_err());
    assert_eq!(verifier.head(HOME), Some(0));
    assert!(!facilitator.is_consumed(0));

    stable.set_minter(&target_ctx, facilitator_addr).unwrap();
    facilitator
        .mint(&target_ctx, &mut stable, user(), auth.amount, 0, &proof)
        .unwrap();
    assert_eq!(verifier.head(HOME), Some(20));
}

#[test]
fn storage_proofs_rejected_by_attestation_backend() {
    let ctx = CallContext::new(admin(), HOME, 1);
    let verifier = attesters(&ctx, TARGET);
    let mut chain = crossmint_protocol::storage::Chain::new(TARGET);
    let mut storage = crossmint_protocol::storage::ContractStorage::new();
    let slot = commitment_slot(FACILITATOR_BURNS_SLOT, 0);
    storage.store(slot, [1u8; 32]);
    let mut snap = crossmint_protocol::storage::StateSnapshot::new();
    let account = Address::derive("facilitator");
    snap.insert(account, storage);
    chain.seal(snap);

    let proof = CommitmentProof::Storage(chain.prove_storage(1, &account, &slot).unwrap());
    use crossmint_contracts::CommitmentVerifier;
    assert_eq!(
        verifier.verify(TARGET, &account, &slot, &[1u8; 32], &proof),
        Err(VerifierError::UnsupportedProof)
    );
}
