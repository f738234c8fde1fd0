//! Verification and settlement of payment headers.
//!
//! [`PaymentEngine`] ties the pieces together:
//!
//! ```text
//! header ─► codec ─► ledger (read) ─► matcher ─► verifier ─► VerificationResult
//!                                                    │
//!                         settle: ledger.consume ◄───┘ ─► submitter ─► SettlementResult
//! ```
//!
//! Every failure is reported as an [`ErrorReason`] inside the result; the
//! engine methods themselves never return `Err`.

use std::sync::Arc;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::codec;
use crate::config::EngineConfig;
use crate::ledger::NonceLedger;
use crate::matcher::match_requirement;
use crate::proto::{
    ErrorReason, PaymentPayload, PriceRequirement, SchemePayload, SettlementResult,
    VerificationResult,
};
use crate::submitter::ChainSubmitter;
use crate::timestamp::UnixTimestamp;
use crate::verifier::SignatureVerifier;

/// Verifies and settles payment headers against price requirements.
///
/// The engine is `Send + Sync` when its verifier is, and is meant to be shared
/// behind an [`Arc`]. Two engines only see each other's settlements if they
/// were built with the same ledger.
pub struct PaymentEngine<V> {
    verifier: V,
    ledger: Arc<dyn NonceLedger>,
    submitter: Arc<dyn ChainSubmitter>,
    retention_grace_seconds: u64,
}

impl<V> std::fmt::Debug for PaymentEngine<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentEngine")
            .field("consumed_nonces", &self.ledger.len())
            .field("retention_grace_seconds", &self.retention_grace_seconds)
            .finish_non_exhaustive()
    }
}

impl<V: SignatureVerifier> PaymentEngine<V> {
    /// Creates an engine with the default nonce retention grace.
    pub fn new(
        verifier: V,
        ledger: Arc<dyn NonceLedger>,
        submitter: Arc<dyn ChainSubmitter>,
    ) -> Self {
        Self {
            verifier,
            ledger,
            submitter,
            retention_grace_seconds: EngineConfig::default().retention_grace_seconds,
        }
    }

    /// Applies the engine-level settings of `config`.
    #[must_use]
    pub fn with_config(mut self, config: &EngineConfig) -> Self {
        self.retention_grace_seconds = config.retention_grace_seconds;
        self
    }

    /// Returns the ledger this engine records settlements in.
    #[must_use]
    pub fn ledger(&self) -> &Arc<dyn NonceLedger> {
        &self.ledger
    }

    /// Verifies `header` against `requirement` at the current system time.
    #[must_use]
    pub fn verify_payment(
        &self,
        header: &str,
        requirement: &PriceRequirement,
    ) -> VerificationResult {
        self.verify_payment_at(header, requirement, UnixTimestamp::now())
    }

    /// Verifies `header` against `requirement` as of `now`.
    ///
    /// Read-only: the ledger is consulted but never changed, so repeated calls
    /// with the same inputs return the same result until a settlement lands.
    #[must_use]
    #[cfg_attr(feature = "telemetry", instrument(skip_all, fields(network = %requirement.network)))]
    pub fn verify_payment_at(
        &self,
        header: &str,
        requirement: &PriceRequirement,
        now: UnixTimestamp,
    ) -> VerificationResult {
        match codec::decode(header) {
            Ok(payload) => self.verify_decoded(&payload, requirement, now),
            Err(_e) => {
                #[cfg(feature = "telemetry")]
                tracing::debug!(error = %_e, "payment header rejected");
                VerificationResult::invalid(ErrorReason::Malformed)
            }
        }
    }

    fn verify_decoded(
        &self,
        payload: &PaymentPayload,
        requirement: &PriceRequirement,
        now: UnixTimestamp,
    ) -> VerificationResult {
        let claimed = payload.payload.payer();

        if self
            .ledger
            .contains(&payload.payload.nonce(), payload.payload.valid_before())
        {
            return VerificationResult::invalid_with_payer(ErrorReason::NonceReused, claimed);
        }
        if let Err(reason) = match_requirement(payload, requirement, now) {
            #[cfg(feature = "telemetry")]
            tracing::debug!(%reason, payer = %claimed, "requirement mismatch");
            return VerificationResult::invalid_with_payer(reason, claimed);
        }

        let checked = match &payload.payload {
            SchemePayload::Exact(exact) => self.verifier.verify(exact, requirement),
        };
        match checked {
            Ok(payer) => VerificationResult::valid(payer),
            Err(e) => {
                #[cfg(feature = "telemetry")]
                tracing::debug!(error = %e, payer = %claimed, "signature rejected");
                VerificationResult::invalid_with_payer(e.reason(), claimed)
            }
        }
    }

    /// Settles `header` against `requirement` at the current system time.
    pub async fn settle_payment(
        &self,
        header: &str,
        requirement: &PriceRequirement,
    ) -> SettlementResult {
        self.settle_payment_at(header, requirement, UnixTimestamp::now())
            .await
    }

    /// Settles `header` against `requirement` as of `now`.
    ///
    /// The payload is verified again, then its nonce is consumed and it is
    /// handed to the submitter. Of several concurrent settlements of one nonce
    /// only the one that consumes it reaches the submitter; the others fail
    /// with [`ErrorReason::NonceReused`]. A nonce stays consumed when the
    /// submitter fails.
    #[cfg_attr(feature = "telemetry", instrument(skip_all, fields(network = %requirement.network)))]
    pub async fn settle_payment_at(
        &self,
        header: &str,
        requirement: &PriceRequirement,
        now: UnixTimestamp,
    ) -> SettlementResult {
        let network = requirement.network.as_str();
        let Ok(payload) = codec::decode(header) else {
            return SettlementResult::failure(ErrorReason::Malformed, network);
        };

        let payer = match self.verify_decoded(&payload, requirement, now) {
            VerificationResult::Valid { payer } => payer,
            VerificationResult::Invalid { reason, .. } => {
                return SettlementResult::failure(reason, network);
            }
        };

        let nonce = payload.payload.nonce();
        if !self.ledger.consume(nonce, payload.payload.valid_before()) {
            #[cfg(feature = "telemetry")]
            tracing::debug!(%nonce, "lost settlement race");
            return SettlementResult::failure(ErrorReason::NonceReused, network);
        }
        #[cfg(feature = "telemetry")]
        tracing::debug!(%nonce, %payer, "nonce consumed");

        match self.submitter.submit(&payload, requirement).await {
            Ok(submission) => {
                #[cfg(feature = "telemetry")]
                tracing::info!(tx = %submission.transaction, %payer, "payment settled");
                SettlementResult::Success {
                    payer,
                    transaction: submission.transaction,
                    network: submission.network,
                }
            }
            Err(_e) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(error = %_e, %nonce, "submission failed");
                SettlementResult::failure(ErrorReason::SubmissionError, network)
            }
        }
    }

    /// Evicts nonces whose authorization expired more than the retention grace
    /// before `now`. Returns the number of nonces removed.
    ///
    /// Evicted nonces cannot be replayed: the ledger's purge watermark keeps
    /// them consumed even for a caller whose `now` lags this one.
    pub fn purge_expired_nonces(&self, now: UnixTimestamp) -> usize {
        let cutoff = now.saturating_sub(self.retention_grace_seconds);
        let purged = self.ledger.purge_expired(cutoff);
        #[cfg(feature = "telemetry")]
        tracing::debug!(purged, %cutoff, "purged expired nonces");
        purged
    }
}
