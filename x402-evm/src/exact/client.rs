//! Client-side signing of `exact` payments.
//!
//! Produces the payment header a buyer sends in answer to a
//! [`PriceRequirement`]: an ERC-3009 authorization for exactly the required
//! amount to `payTo`, signed over the same domain [`Eip3009Verifier`] checks.
//!
//! [`Eip3009Verifier`]: super::Eip3009Verifier

use std::future::Future;
use std::sync::Arc;

use alloy_primitives::{Address, B256, Bytes, Signature};
use alloy_signer_local::PrivateKeySigner;
use rand::RngExt;
use rand::rng;
use x402_core::codec;
use x402_core::proto::{ExactAuthorization, ExactPayload, PaymentPayload, PriceRequirement};
use x402_core::timestamp::UnixTimestamp;
use x402_core::verifier::SignatureError;

use super::types::DomainResolver;

/// How far `validAfter` is backdated, so the authorization is usable at once
/// even with some clock skew between client and chain.
pub const VALID_AFTER_SKEW_SECONDS: u64 = 10 * 60;

/// Errors from building a signed payment.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The requirement's `payTo` is not an address.
    #[error("invalid recipient address `{0}`")]
    InvalidRecipient(String),
    /// The signing domain or message could not be built.
    #[error(transparent)]
    Domain(#[from] SignatureError),
    /// The signer failed to produce a signature.
    #[error("signing failed: {0}")]
    Signing(String),
}

/// A trait that abstracts signing operations, allowing both owned signers and Arc-wrapped signers.
///
/// Alloy's `Signer` trait is not implemented for `Arc<T>`, and `PrivateKeySigner`
/// is commonly shared that way.
pub trait SignerLike: Send + Sync {
    /// Returns the address of the signer.
    fn address(&self) -> Address;

    /// Signs the given prehash.
    fn sign_hash(
        &self,
        hash: &B256,
    ) -> impl Future<Output = Result<Signature, alloy_signer::Error>> + Send;
}

impl SignerLike for PrivateKeySigner {
    fn address(&self) -> Address {
        Self::address(self)
    }

    async fn sign_hash(&self, hash: &B256) -> Result<Signature, alloy_signer::Error> {
        alloy_signer::Signer::sign_hash(self, hash).await
    }
}

impl<T: SignerLike> SignerLike for Arc<T> {
    fn address(&self) -> Address {
        (**self).address()
    }

    async fn sign_hash(&self, hash: &B256) -> Result<Signature, alloy_signer::Error> {
        (**self).sign_hash(hash).await
    }
}

/// Signs an authorization for `requirement` over the built-in network table.
///
/// See [`sign_authorization_with`].
///
/// # Errors
///
/// Returns [`ClientError`] if the requirement cannot be signed.
pub async fn sign_authorization<S: SignerLike>(
    signer: &S,
    requirement: &PriceRequirement,
    now: UnixTimestamp,
) -> Result<ExactPayload, ClientError> {
    sign_authorization_with(signer, requirement, now, &DomainResolver::default()).await
}

/// Signs an authorization for `requirement`, resolving the domain with `resolver`.
///
/// The authorization pays exactly `maxAmountRequired` to `payTo`, is valid
/// from ten minutes before `now` until `now + maxTimeoutSeconds`, and carries
/// a fresh random nonce.
///
/// # Errors
///
/// Returns [`ClientError`] if `payTo` is not an address, the network or
/// asset cannot be resolved, the amount is not an integer, or signing fails.
pub async fn sign_authorization_with<S: SignerLike>(
    signer: &S,
    requirement: &PriceRequirement,
    now: UnixTimestamp,
    resolver: &DomainResolver,
) -> Result<ExactPayload, ClientError> {
    let to: Address = requirement
        .pay_to
        .parse()
        .map_err(|_| ClientError::InvalidRecipient(requirement.pay_to.clone()))?;
    let nonce: [u8; 32] = rng().random();

    let authorization = ExactAuthorization {
        from: signer.address(),
        to,
        value: requirement.max_amount_required.clone(),
        valid_after: now.saturating_sub(VALID_AFTER_SKEW_SECONDS),
        valid_before: now + requirement.max_timeout_seconds,
        nonce: B256::from(nonce),
    };

    let hash = resolver.signing_hash(&authorization, requirement)?;
    let signature = signer
        .sign_hash(&hash)
        .await
        .map_err(|e| ClientError::Signing(e.to_string()))?;

    Ok(ExactPayload {
        signature: Bytes::from(signature.as_bytes().to_vec()),
        authorization,
    })
}

/// Signs an authorization for `requirement` and encodes it as a payment header.
///
/// # Errors
///
/// Returns [`ClientError`] if the requirement cannot be signed.
pub async fn payment_header<S: SignerLike>(
    signer: &S,
    requirement: &PriceRequirement,
    now: UnixTimestamp,
) -> Result<String, ClientError> {
    let exact = sign_authorization(signer, requirement, now).await?;
    let payload = PaymentPayload::exact(requirement.network.clone(), exact);
    Ok(codec::encode(&payload))
}
