//! Client signs, engine verifies and settles.

use std::sync::Arc;

use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use x402_core::codec;
use x402_core::engine::PaymentEngine;
use x402_core::ledger::{InMemoryNonceLedger, NonceLedger};
use x402_core::proto::{
    ErrorReason, PaymentPayload, PriceRequirement, SchemePayload, SettlementResult,
    VerificationResult,
};
use x402_core::submitter::SimulatedSubmitter;
use x402_core::timestamp::UnixTimestamp;
use x402_evm::exact::client::sign_authorization;
use x402_evm::{Eip3009Verifier, payment_header};

const NOW: u64 = 1_750_000_000;

fn now() -> UnixTimestamp {
    UnixTimestamp::from_secs(NOW)
}

fn requirement() -> PriceRequirement {
    PriceRequirement::exact(
        "base-sepolia",
        "1000000",
        "0x209693Bc6afc0C5328bA36FaF03C514EF312287C",
        "0x036CbD53842c5426634e7929541eC2318f3dCF7e",
    )
    .with_timeout(60)
}

fn engine() -> PaymentEngine<Eip3009Verifier> {
    PaymentEngine::new(
        Eip3009Verifier::new(),
        Arc::new(InMemoryNonceLedger::new()),
        Arc::new(SimulatedSubmitter::new()),
    )
}

async fn header_for(signer: &PrivateKeySigner, req: &PriceRequirement) -> String {
    payment_header(signer, req, now()).await.unwrap()
}

/// Re-encodes `header` after letting `f` edit the decoded payload.
fn tampered(header: &str, f: impl FnOnce(&mut PaymentPayload)) -> String {
    let mut payload = codec::decode(header).unwrap();
    f(&mut payload);
    codec::encode(&payload)
}

#[tokio::test]
async fn test_full_flow() {
    let signer = PrivateKeySigner::random();
    let req = requirement();
    let engine = engine();
    let header = header_for(&signer, &req).await;

    assert_eq!(
        engine.verify_payment_at(&header, &req, now()),
        VerificationResult::valid(signer.address())
    );
    // Verification is repeatable and leaves no trace.
    assert!(engine.verify_payment_at(&header, &req, now()).is_valid());
    assert!(engine.ledger().is_empty());

    let settled = engine.settle_payment_at(&header, &req, now()).await;
    let SettlementResult::Success {
        payer,
        transaction,
        network,
    } = settled
    else {
        panic!("expected success, got {settled:?}");
    };
    assert_eq!(payer, signer.address());
    assert!(!transaction.is_empty());
    assert_eq!(network, "base-sepolia");

    let SchemePayload::Exact(exact) = codec::decode(&header).unwrap().payload;
    assert!(
        engine
            .ledger()
            .contains(&exact.authorization.nonce, exact.authorization.valid_before)
    );
}

#[tokio::test]
async fn test_replay_after_settlement() {
    let signer = PrivateKeySigner::random();
    let req = requirement();
    let engine = engine();
    let header = header_for(&signer, &req).await;

    assert!(engine.settle_payment_at(&header, &req, now()).await.is_success());
    assert_eq!(
        engine.verify_payment_at(&header, &req, now()).reason(),
        Some(ErrorReason::NonceReused)
    );
    assert_eq!(
        engine.settle_payment_at(&header, &req, now()).await,
        SettlementResult::failure(ErrorReason::NonceReused, "base-sepolia")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_settlements_have_one_winner() {
    let signer = PrivateKeySigner::random();
    let req = Arc::new(requirement());
    let engine = Arc::new(engine());
    let header = Arc::new(header_for(&signer, &req).await);

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let req = Arc::clone(&req);
            let header = Arc::clone(&header);
            tokio::spawn(async move { engine.settle_payment_at(&header, &req, now()).await })
        })
        .collect();

    let mut successes = 0;
    for task in tasks {
        match task.await.unwrap() {
            SettlementResult::Success { .. } => successes += 1,
            SettlementResult::Failure { reason, .. } => {
                assert_eq!(reason, ErrorReason::NonceReused);
            }
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(engine.ledger().len(), 1);
}

#[tokio::test]
async fn test_tampering_after_signing_is_rejected() {
    let signer = PrivateKeySigner::random();
    let req = requirement();
    let engine = engine();
    let header = header_for(&signer, &req).await;

    // The matcher would catch value and recipient edits against `req`, so the
    // requirement is edited to match the tampered payload.
    let bumped = tampered(&header, |p| {
        let SchemePayload::Exact(e) = &mut p.payload;
        e.authorization.value = "2000000".to_owned();
    });
    let mut bumped_req = req.clone();
    bumped_req.max_amount_required = "2000000".to_owned();
    assert_eq!(
        engine.verify_payment_at(&bumped, &bumped_req, now()).reason(),
        Some(ErrorReason::BadSignature)
    );

    let thief = Address::repeat_byte(0x77);
    let redirected = tampered(&header, |p| {
        let SchemePayload::Exact(e) = &mut p.payload;
        e.authorization.to = thief;
    });
    let mut thief_req = req.clone();
    thief_req.pay_to = thief.to_string();
    assert_eq!(
        engine.verify_payment_at(&redirected, &thief_req, now()).reason(),
        Some(ErrorReason::BadSignature)
    );

    let renonced = tampered(&header, |p| {
        let SchemePayload::Exact(e) = &mut p.payload;
        e.authorization.nonce.0[0] ^= 0xff;
    });
    assert_eq!(
        engine.verify_payment_at(&renonced, &req, now()).reason(),
        Some(ErrorReason::BadSignature)
    );
}

#[tokio::test]
async fn test_expiry_boundary() {
    let signer = PrivateKeySigner::random();
    let req = requirement();
    let engine = engine();
    let header = header_for(&signer, &req).await;
    let valid_before = NOW + 60;

    assert!(
        engine
            .verify_payment_at(&header, &req, UnixTimestamp::from_secs(valid_before))
            .is_valid()
    );
    assert_eq!(
        engine
            .verify_payment_at(&header, &req, UnixTimestamp::from_secs(valid_before + 1))
            .reason(),
        Some(ErrorReason::Expired)
    );
}

#[tokio::test]
async fn test_amount_mismatch() {
    let signer = PrivateKeySigner::random();
    let mut cheap = requirement();
    cheap.max_amount_required = "999999".to_owned();
    let header = header_for(&signer, &cheap).await;

    assert_eq!(
        engine().verify_payment_at(&header, &requirement(), now()).reason(),
        Some(ErrorReason::AmountMismatch)
    );
}

#[tokio::test]
async fn test_unknown_network_is_rejected() {
    let signer = PrivateKeySigner::random();
    let req = requirement();
    let header = header_for(&signer, &req).await;

    let moved = tampered(&header, |p| p.network = "mars".to_owned());
    let mut mars = req.clone();
    mars.network = "mars".to_owned();
    assert_eq!(
        engine().verify_payment_at(&moved, &mars, now()).reason(),
        Some(ErrorReason::SchemeOrNetworkMismatch)
    );
}

#[tokio::test]
async fn test_submission_failure() {
    let signer = PrivateKeySigner::random();
    let req = requirement();
    let engine = PaymentEngine::new(
        Eip3009Verifier::new(),
        Arc::new(InMemoryNonceLedger::new()),
        Arc::new(SimulatedSubmitter::unavailable()),
    );
    let exact = sign_authorization(&signer, &req, now()).await.unwrap();
    let header = codec::encode(&PaymentPayload::exact("base-sepolia", exact));

    assert_eq!(
        engine.settle_payment_at(&header, &req, now()).await,
        SettlementResult::failure(ErrorReason::SubmissionError, "base-sepolia")
    );
    assert_eq!(engine.ledger().len(), 1);
}

#[tokio::test]
async fn test_shared_ledger_spans_engines() {
    let signer = PrivateKeySigner::random();
    let req = requirement();
    let ledger: Arc<dyn NonceLedger> = Arc::new(InMemoryNonceLedger::new());
    let first = PaymentEngine::new(
        Eip3009Verifier::new(),
        Arc::clone(&ledger),
        Arc::new(SimulatedSubmitter::new()),
    );
    let second = PaymentEngine::new(
        Eip3009Verifier::new(),
        Arc::clone(&ledger),
        Arc::new(SimulatedSubmitter::new()),
    );
    let header = header_for(&signer, &req).await;

    assert!(first.settle_payment_at(&header, &req, now()).await.is_success());
    assert_eq!(
        second.verify_payment_at(&header, &req, now()).reason(),
        Some(ErrorReason::NonceReused)
    );
}
