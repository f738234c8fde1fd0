//! Signature verification seam.
//!
//! The engine is chain-agnostic; it hands the signed body and the requirement
//! to a [`SignatureVerifier`] and only looks at whether a payer came back.

use alloy_primitives::Address;

use crate::proto::{ErrorReason, ExactPayload, PriceRequirement};

/// Errors from checking the signature of an `exact` payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// The requirement names a network the verifier has no chain id for.
    #[error("unknown network `{0}`")]
    UnknownNetwork(String),
    /// The requirement's asset is not a 20-byte hex address.
    #[error("invalid asset address `{0}`")]
    InvalidAsset(String),
    /// The authorized value is not a decimal integer that fits in 256 bits.
    #[error("invalid authorization value `{0}`")]
    InvalidAmount(String),
    /// The signature is neither 65 bytes nor a 64-byte compact signature.
    #[error("malformed signature of {0} bytes")]
    MalformedSignature(usize),
    /// No public key could be recovered from the signature.
    #[error("signer recovery failed: {0}")]
    Recovery(String),
    /// A key was recovered, but it does not belong to the claimed payer.
    #[error("signature recovers to {recovered}, expected {expected}")]
    SignerMismatch {
        /// The payer the authorization names.
        expected: Address,
        /// The address the signature actually recovers to.
        recovered: Address,
    },
}

impl SignatureError {
    /// Maps this error onto the stable reason reported to callers.
    #[must_use]
    pub const fn reason(&self) -> ErrorReason {
        match self {
            Self::UnknownNetwork(_) => ErrorReason::SchemeOrNetworkMismatch,
            Self::InvalidAsset(_)
            | Self::InvalidAmount(_)
            | Self::MalformedSignature(_)
            | Self::Recovery(_)
            | Self::SignerMismatch { .. } => ErrorReason::BadSignature,
        }
    }
}

/// Recovers and checks the signer of an `exact` payload.
///
/// `Ok(payer)` means the signature over the typed authorization, under the
/// domain derived from `requirement`, recovers to `payload.authorization.from`.
/// Implementations never panic on hostile input.
pub trait SignatureVerifier: Send + Sync {
    /// Verifies the signature of `payload` under the domain of `requirement`.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError`] on any structural or cryptographic failure.
    fn verify(
        &self,
        payload: &ExactPayload,
        requirement: &PriceRequirement,
    ) -> Result<Address, SignatureError>;
}

impl<T: SignatureVerifier + ?Sized> SignatureVerifier for std::sync::Arc<T> {
    fn verify(
        &self,
        payload: &ExactPayload,
        requirement: &PriceRequirement,
    ) -> Result<Address, SignatureError> {
        (**self).verify(payload, requirement)
    }
}
