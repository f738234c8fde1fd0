//! Hand-off of verified payments to the chain.
//!
//! Settlement ends by passing the payload to a [`ChainSubmitter`]. Real
//! submitters broadcast `transferWithAuthorization`; [`SimulatedSubmitter`]
//! stands in for one and derives a deterministic transaction reference.

use std::future::Future;
use std::pin::Pin;

use alloy_primitives::keccak256;

use crate::proto::{PaymentPayload, PriceRequirement, SchemePayload};

/// A boxed, `Send` future, used where a trait method must be async and object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outcome of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Transaction reference (e.g. a `0x`-prefixed hash).
    pub transaction: String,
    /// Network the transfer was submitted on.
    pub network: String,
}

/// Errors returned by a [`ChainSubmitter`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    /// The submitter could not be reached.
    #[error("submitter unavailable: {0}")]
    Unavailable(String),
    /// The submitter refused or reverted the transfer.
    #[error("submission rejected: {0}")]
    Rejected(String),
}

/// Submits verified payments for on-chain execution.
pub trait ChainSubmitter: Send + Sync {
    /// Submits `payload`, already verified against `requirement`.
    fn submit<'a>(
        &'a self,
        payload: &'a PaymentPayload,
        requirement: &'a PriceRequirement,
    ) -> BoxFuture<'a, Result<Submission, SubmitError>>;
}

/// A [`ChainSubmitter`] that performs no I/O.
///
/// In its default mode it succeeds with `keccak256(signature || nonce)` as the
/// transaction reference, on the requirement's network. Built with
/// [`SimulatedSubmitter::unavailable`], every submission fails.
#[derive(Debug, Clone, Default)]
pub struct SimulatedSubmitter {
    fail_with: Option<String>,
}

impl SimulatedSubmitter {
    /// Creates a submitter that accepts every payment.
    #[must_use]
    pub const fn new() -> Self {
        Self { fail_with: None }
    }

    /// Creates a submitter that fails every payment.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            fail_with: Some("simulated chain is offline".to_owned()),
        }
    }
}

impl ChainSubmitter for SimulatedSubmitter {
    fn submit<'a>(
        &'a self,
        payload: &'a PaymentPayload,
        requirement: &'a PriceRequirement,
    ) -> BoxFuture<'a, Result<Submission, SubmitError>> {
        Box::pin(async move {
            if let Some(reason) = &self.fail_with {
                return Err(SubmitError::Unavailable(reason.clone()));
            }
            let digest = match &payload.payload {
                SchemePayload::Exact(exact) => {
                    let mut preimage = exact.signature.to_vec();
                    preimage.extend_from_slice(exact.authorization.nonce.as_slice());
                    keccak256(preimage)
                }
            };
            Ok(Submission {
                transaction: digest.to_string(),
                network: requirement.network.clone(),
            })
        })
    }
}
