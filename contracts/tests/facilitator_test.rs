//! Integration tests for the Facilitator's mint and burn paths.

mod common;

use common::*;
use crossmint_contracts::commitment::commitment_slot;
use crossmint_contracts::verifier::VerifierError;
use crossmint_contracts::{CommitmentProof, FacilitatorError, MintAuthorization};
use crossmint_protocol::config::VAULT_AUTHORIZATIONS_SLOT;
use crossmint_protocol::storage::{ContractStorage, StateSnapshot};
use crossmint_protocol::{Address, ErrorKind};

fn facilitator_verifier_error(err: &FacilitatorError) -> Option<&VerifierError> {
    match err {
        FacilitatorError::CommitmentMismatch { source, .. } => Some(source),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Mint
// ---------------------------------------------------------------------------

#[test]
fn replayed_authorization_rejected() {
    let mut h = Harness::new();
    let auth = h.deposit(E18).unwrap();
    h.relay_mint(&auth).unwrap();

    let err = h.relay_mint(&auth).unwrap_err();
    assert_eq!(err, FacilitatorError::ReplayedAuthorization { nonce: 0 });
    assert_eq!(err.kind(), ErrorKind::Replay);
    assert_eq!(h.stable.balance_of(&user()), auth.amount);
    assert_eq!(h.facilitator.total_minted(), auth.amount);
}

#[test]
fn inflated_amount_rejected() {
    let mut h = Harness::new();
    let auth = h.deposit(E18).unwrap();
    let inflated = MintAuthorization {
        amount: auth.amount * 2,
        ..auth
    };
    let err = h.relay_mint(&inflated).unwrap_err();
    assert!(matches!(
        facilitator_verifier_error(&err),
        Some(VerifierError::ValueMismatch { .. })
    ));
    assert_eq!(h.stable.total_supply(), 0);

    // A failed attempt does not consume the nonce.
    assert!(!h.facilitator.is_consumed(auth.nonce));
    h.relay_mint(&auth).unwrap();
}

#[test]
fn redirected_recipient_rejected() {
    let mut h = Harness::new();
    let auth = h.deposit(E18).unwrap();
    let redirected = MintAuthorization {
        recipient: Address::derive("mallory"),
        ..auth
    };
    assert!(h.relay_mint(&redirected).is_err());
    assert_eq!(h.stable.balance_of(&Address::derive("mallory")), 0);
}

#[test]
fn authorization_from_another_contract_rejected() {
    let mut h = Harness::new();
    let forged = MintAuthorization {
        nonce: 0,
        recipient: user(),
        amount: 1_000 * E18,
        source_chain: HOME,
    };

    // A contract on the home chain writes a perfect-looking authorization
    // into its own storage.
    let fake = Address::derive("fake-vault");
    let slot = commitment_slot(VAULT_AUTHORIZATIONS_SLOT, 0);
    let mut storage = ContractStorage::new();
    storage.store(slot, forged.digest());
    let mut snap = StateSnapshot::new();
    snap.insert(h.vault.address(), h.vault.storage().clone());
    snap.insert(fake, storage);
    let header = h.home.seal(snap);
    for r in reporters() {
        h.target_verifier
            .report_header(&h.target.context(r), HOME, header.number, header.state_root)
            .unwrap();
    }

    let proof = CommitmentProof::Storage(h.home.prove_storage(header.number, &fake, &slot).unwrap());
    let err = h
        .facilitator
        .mint(
            &h.target_ctx(Address::derive("relayer")),
            &mut h.stable,
            user(),
            forged.amount,
            0,
            &proof,
        )
        .unwrap_err();
    assert!(matches!(
        facilitator_verifier_error(&err),
        Some(VerifierError::InvalidProof(_))
    ));
    assert_eq!(h.stable.total_supply(), 0);
}

#[test]
fn mint_on_wrong_chain_rejected() {
    let mut h = Harness::new();
    let auth = h.deposit(E18).unwrap();
    h.seal_home();
    let proof = h.authorization_proof(auth.nonce);
    let err = h
        .facilitator
        .mint(
            &h.home_ctx(Address::derive("relayer")),
            &mut h.stable,
            auth.recipient,
            auth.amount,
            auth.nonce,
            &proof,
        )
        .unwrap_err();
    assert!(matches!(err, FacilitatorError::WrongChain { .. }));
}

#[test]
fn counterpart_set_once() {
    let mut h = Harness::new();
    let err = h
        .facilitator
        .set_account(&h.target_ctx(admin()), Address::derive("other-vault"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    let err = h
        .facilitator
        .set_account(&h.target_ctx(user()), Address::derive("other-vault"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(h.facilitator.counterpart(), Some(h.vault.address()));
}

// ---------------------------------------------------------------------------
// Burn
// ---------------------------------------------------------------------------

#[test]
fn burn_without_balance_rejected() {
    let mut h = Harness::new();
    let err = h.burn(1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    assert_eq!(h.facilitator.burn_nonce(), 0);
}

#[test]
fn burn_nonces_are_monotonic() {
    let mut h = Harness::new();
    let auth = h.deposit(E18).unwrap();
    h.relay_mint(&auth).unwrap();
    let a = h.burn(10).unwrap();
    let b = h.burn(10).unwrap();
    let c = h.burn(10).unwrap();
    assert_eq!((a.nonce, b.nonce, c.nonce), (0, 1, 2));
    assert_eq!(h.facilitator.total_minted(), auth.amount - 30);
}
