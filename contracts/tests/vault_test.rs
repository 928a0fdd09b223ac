//! Integration tests for the Vault's release path.
//!
//! Every test here reaches the Vault with a burn that really happened on
//! the target chain, then varies what the relayer submits: replays,
//! overclaims, stale or mismatched proofs, wrong counterparts.

mod common;

use std::sync::Arc;

use common::*;
use crossmint_contracts::verifier::VerifierError;
use crossmint_contracts::{CollateralToken, Vault, VaultError, VaultParams};
use crossmint_protocol::config::{DEFAULT_MINT_RATIO_BPS, FACILITATOR_BURNS_SLOT};
use crossmint_protocol::storage::StateSnapshot;
use crossmint_protocol::{Address, ErrorKind};

/// Deposit, mint and burn `collateral` worth; returns the burn.
fn burned(h: &mut Harness, collateral: u128) -> crossmint_contracts::BurnCommitment {
    let auth = h.deposit(collateral).unwrap();
    h.relay_mint(&auth).unwrap();
    h.burn(auth.amount).unwrap()
}

// ---------------------------------------------------------------------------
// Replay & Over-release
// ---------------------------------------------------------------------------

#[test]
fn double_release_rejected() {
    let mut h = Harness::new();
    let burn = burned(&mut h, 100 * E18);
    h.relay_release(&burn).unwrap();
    let balance = h.collateral.balance_of(&user());

    let err = h.relay_release(&burn).unwrap_err();
    assert_eq!(err, VaultError::AlreadyReleased { nonce: 0 });
    assert_eq!(err.kind(), ErrorKind::Replay);
    assert_eq!(h.collateral.balance_of(&user()), balance);
}

#[test]
fn over_release_rejected() {
    let mut h = Harness::new();
    let whale = Address::derive("whale");
    let asset = h.collateral.address();

    // The user holds a small position.
    let auth = h.deposit(E18).unwrap();
    h.relay_mint(&auth).unwrap();

    // A whale mints much more and hands it to the user.
    let ctx = h.home_ctx(admin());
    h.collateral.mint(&ctx, whale, 50 * E18).unwrap();
    h.collateral
        .approve(&ctx.with_caller(whale), h.vault.address(), u128::MAX)
        .unwrap();
    let whale_auth = h
        .vault
        .mint(&h.home_ctx(whale), &mut h.collateral, whale, 50 * E18)
        .unwrap();
    h.relay_mint(&whale_auth).unwrap();
    h.stable
        .transfer(&h.target_ctx(whale), user(), whale_auth.amount)
        .unwrap();

    // The user burns everything against their own small position.
    let burn = h.burn(auth.amount + whale_auth.amount).unwrap();
    let err = h.relay_release(&burn).unwrap_err();
    assert_eq!(
        err,
        VaultError::ReleaseExceedsDeposit {
            requested: auth.amount + whale_auth.amount,
            outstanding: auth.amount,
        }
    );
    assert!(!h.vault.is_released(burn.nonce));
    assert_eq!(h.vault.position(&user(), &asset).unwrap().collateral, E18);
    assert_eq!(h.collateral.balance_of(&h.vault.address()), 51 * E18);
}

// ---------------------------------------------------------------------------
// Proof Failures
// ---------------------------------------------------------------------------

#[test]
fn forged_amount_rejected_and_collateral_stays_locked() {
    let mut h = Harness::new();
    let burn = burned(&mut h, 100 * E18);
    h.seal_target();
    let proof = h.burn_proof(burn.nonce);

    // Claim a smaller burn than was committed.
    let err = h
        .release_with(user(), burn.amount - 1, burn.nonce, &proof)
        .unwrap_err();
    assert!(matches!(
        vault_verifier_error(&err),
        Some(VerifierError::ValueMismatch { .. })
    ));
    assert_eq!(h.collateral.balance_of(&h.vault.address()), 100 * E18);
    assert!(!h.vault.is_released(burn.nonce));

    // Claim someone else's collateral.
    let err = h
        .release_with(Address::derive("thief"), burn.amount, burn.nonce, &proof)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Verification);

    // The honest claim still goes through.
    assert_eq!(
        h.release_with(user(), burn.amount, burn.nonce, &proof).unwrap(),
        100 * E18
    );
}

#[test]
fn proof_for_another_slot_rejected() {
    let mut h = Harness::new();
    let auth = h.deposit(10 * E18).unwrap();
    h.relay_mint(&auth).unwrap();
    let first = h.burn(auth.amount / 2).unwrap();
    let second = h.burn(auth.amount / 2).unwrap();
    h.seal_target();

    // Burn 1's proof offered for burn 0.
    let wrong = h.burn_proof(second.nonce);
    let err = h
        .release_with(user(), first.amount, first.nonce, &wrong)
        .unwrap_err();
    assert!(matches!(
        vault_verifier_error(&err),
        Some(VerifierError::InvalidProof(_))
    ));
}

#[test]
fn stale_proof_rejected_then_fresh_one_accepted() {
    let mut h = Harness::new();
    let burn = burned(&mut h, 5 * E18);
    h.seal_target();
    let old = h.burn_proof(burn.nonce);

    for _ in 0..=MAX_PROOF_AGE {
        h.seal_target();
    }
    let err = h
        .release_with(user(), burn.amount, burn.nonce, &old)
        .unwrap_err();
    assert!(matches!(
        vault_verifier_error(&err),
        Some(VerifierError::StaleProof { .. })
    ));
    assert!(err.kind().is_retryable());

    assert_eq!(h.relay_release(&burn).unwrap(), 5 * E18);
}

#[test]
fn unreported_header_rejected_until_reported() {
    let mut h = Harness::new();
    let burn = burned(&mut h, 5 * E18);

    // Seal without reporting.
    let mut snap = StateSnapshot::new();
    snap.insert(h.facilitator.address(), h.facilitator.storage().clone());
    let header = h.target.seal(snap);
    let proof = h.burn_proof(burn.nonce);

    let err = h
        .release_with(user(), burn.amount, burn.nonce, &proof)
        .unwrap_err();
    assert!(matches!(
        vault_verifier_error(&err),
        Some(VerifierError::UnknownHeader { .. })
    ));

    for r in reporters() {
        h.home_verifier
            .report_header(&h.home.context(r), TARGET, header.number, header.state_root)
            .unwrap();
    }
    assert_eq!(
        h.release_with(user(), burn.amount, burn.nonce, &proof).unwrap(),
        5 * E18
    );
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn mismatched_counterpart_blocks_release() {
    let mut h = Harness::new();
    let burn = burned(&mut h, 5 * E18);
    h.seal_target();
    let proof = h.burn_proof(burn.nonce);

    // A second Vault bound to an address that is not the Facilitator.
    let mut misbound = Vault::new(
        Address::derive("vault-2"),
        &h.home_ctx(admin()),
        VaultParams {
            stable_asset: h.stable.address(),
            chain_id: HOME,
            target_chain_id: TARGET,
            commitment_slot: FACILITATOR_BURNS_SLOT,
            mint_ratio_bps: DEFAULT_MINT_RATIO_BPS,
            counterpart: Some(Address::derive("impostor")),
        },
        h.oracle.clone(),
        h.home_verifier.clone(),
    )
    .unwrap();

    let err = misbound
        .verify_burn_and_release_collateral(
            &h.home_ctx(user()),
            &mut h.collateral,
            user(),
            burn.amount,
            burn.nonce,
            &proof,
        )
        .unwrap_err();
    assert!(matches!(err, VaultError::CommitmentMismatch { .. }));
}

#[test]
fn wrong_target_chain_blocks_release() {
    let mut h = Harness::new();
    let burn = burned(&mut h, 5 * E18);
    h.seal_target();
    let proof = h.burn_proof(burn.nonce);

    // Expects its Facilitator on a chain the verifier does not track.
    let mut vault = Vault::new(
        Address::derive("vault-3"),
        &h.home_ctx(admin()),
        VaultParams {
            stable_asset: h.stable.address(),
            chain_id: HOME,
            target_chain_id: crossmint_protocol::ChainId(10_200),
            commitment_slot: FACILITATOR_BURNS_SLOT,
            mint_ratio_bps: DEFAULT_MINT_RATIO_BPS,
            counterpart: Some(h.facilitator.address()),
        },
        h.oracle.clone(),
        h.home_verifier.clone(),
    )
    .unwrap();
    let err = vault
        .verify_burn_and_release_collateral(
            &h.home_ctx(user()),
            &mut h.collateral,
            user(),
            burn.amount,
            burn.nonce,
            &proof,
        )
        .unwrap_err();
    assert!(matches!(
        vault_verifier_error(&err),
        Some(VerifierError::UnknownChain(_))
    ));
}

#[test]
fn vault_deployed_on_wrong_chain_fails() {
    let h = Harness::new();
    let err = Vault::new(
        Address::derive("vault-4"),
        &h.target_ctx(admin()),
        VaultParams {
            stable_asset: h.stable.address(),
            chain_id: HOME,
            target_chain_id: TARGET,
            commitment_slot: FACILITATOR_BURNS_SLOT,
            mint_ratio_bps: DEFAULT_MINT_RATIO_BPS,
            counterpart: None,
        },
        h.oracle.clone(),
        h.home_verifier.clone(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn price_unavailable_leaves_position_unchanged() {
    let mut h = Harness::new();
    let asset = h.collateral.address();
    let auth = h.deposit(E18).unwrap();
    let before = h.vault.position(&user(), &asset);

    // A fresh oracle without the stable price.
    let ctx = h.home_ctx(admin());
    let empty = Arc::new(crossmint_contracts::PriceOracle::new(&ctx));
    empty.set_asset_price(&ctx, asset, 1).unwrap();
    let mut vault = Vault::new(
        Address::derive("vault-5"),
        &ctx,
        VaultParams {
            stable_asset: h.stable.address(),
            chain_id: HOME,
            target_chain_id: TARGET,
            commitment_slot: FACILITATOR_BURNS_SLOT,
            mint_ratio_bps: DEFAULT_MINT_RATIO_BPS,
            counterpart: Some(h.facilitator.address()),
        },
        empty,
        h.home_verifier.clone(),
    )
    .unwrap();
    h.collateral
        .approve(&h.home_ctx(user()), vault.address(), u128::MAX)
        .unwrap();
    let err = vault
        .mint(&h.home_ctx(user()), &mut h.collateral, user(), E18)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PriceUnavailable);
    assert!(vault.position(&user(), &asset).is_none());
    assert_eq!(h.vault.position(&user(), &asset), before);
    assert_eq!(auth.nonce, 0);
}

#[test]
fn wrong_commitment_slot_blocks_release() {
    let mut h = Harness::new();
    let burn = burned(&mut h, 5 * E18);
    h.seal_target();
    let proof = h.burn_proof(burn.nonce);

    // Reads the Facilitator's burns from the authorizations position.
    let mut vault = Vault::new(
        Address::derive("vault-6"),
        &h.home_ctx(admin()),
        VaultParams {
            stable_asset: h.stable.address(),
            chain_id: HOME,
            target_chain_id: TARGET,
            commitment_slot: crossmint_protocol::config::VAULT_AUTHORIZATIONS_SLOT,
            mint_ratio_bps: DEFAULT_MINT_RATIO_BPS,
            counterpart: Some(h.facilitator.address()),
        },
        h.oracle.clone(),
        h.home_verifier.clone(),
    )
    .unwrap();
    let err = vault
        .verify_burn_and_release_collateral(
            &h.home_ctx(user()),
            &mut h.collateral,
            user(),
            burn.amount,
            burn.nonce,
            &proof,
        )
        .unwrap_err();
    assert!(matches!(
        vault_verifier_error(&err),
        Some(VerifierError::InvalidProof(_))
    ));
}

#[test]
fn unset_counterpart_blocks_mint_until_bound() {
    let mut h = Harness::new();
    let mut vault = Vault::new(
        Address::derive("vault-7"),
        &h.home_ctx(admin()),
        VaultParams {
            stable_asset: h.stable.address(),
            chain_id: HOME,
            target_chain_id: TARGET,
            commitment_slot: FACILITATOR_BURNS_SLOT,
            mint_ratio_bps: DEFAULT_MINT_RATIO_BPS,
            counterpart: None,
        },
        h.oracle.clone(),
        h.home_verifier.clone(),
    )
    .unwrap();
    h.collateral
        .approve(&h.home_ctx(user()), vault.address(), u128::MAX)
        .unwrap();

    let err = vault
        .mint(&h.home_ctx(user()), &mut h.collateral, user(), E18)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(h.collateral.balance_of(&user()), 1_000 * E18);

    // Only the admin binds, and only once.
    let err = vault
        .set_account(&h.home_ctx(user()), h.facilitator.address())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    vault
        .set_account(&h.home_ctx(admin()), h.facilitator.address())
        .unwrap();
    let err = vault
        .set_account(&h.home_ctx(admin()), Address::derive("elsewhere"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(vault.counterpart(), Some(h.facilitator.address()));

    let auth = vault
        .mint(&h.home_ctx(user()), &mut h.collateral, user(), E18)
        .unwrap();
    assert_eq!(auth.amount, 2_500 * E18);
}
