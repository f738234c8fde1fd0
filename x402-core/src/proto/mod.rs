//! Protocol types for x402 payment messages.
//!
//! This module defines the wire format types exchanged between a client, the
//! resource owner and the verifying party, and the typed outcomes of
//! verification and settlement.
//!
//! # Key Types
//!
//! - [`v1::PriceRequirement`] / [`v1::PaymentPayload`] - Requirement and signed payment
//! - [`ErrorReason`] - Stable, machine-readable failure codes
//! - [`VerificationResult`] - Outcome of a verify call
//! - [`SettlementResult`] - Outcome of a settle call
//!
//! # Wire Format
//!
//! All types serialize to JSON using camelCase field names.

use alloy_primitives::Address;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display, Formatter};

pub mod v1;

pub use v1::{
    EXACT_SCHEME, ExactAuthorization, ExactPayload, PaymentPayload, PriceRequirement,
    RequirementExtra, SchemePayload, X402_VERSION,
};

/// Machine-readable reason codes for rejected payments.
///
/// The serialized strings are stable; callers surface them verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorReason {
    /// The payload claims a protocol version other than [`X402_VERSION`].
    UnsupportedVersion,
    /// Scheme or network differ from the requirement, or the network is unknown.
    SchemeOrNetworkMismatch,
    /// The authorized value is not exactly the required amount.
    AmountMismatch,
    /// The authorized recipient is not the requirement's `payTo`.
    RecipientMismatch,
    /// `validBefore` is in the past.
    Expired,
    /// The authorization nonce was already settled.
    NonceReused,
    /// The signature does not recover to the claimed payer.
    BadSignature,
    /// The payment header could not be decoded.
    Malformed,
    /// The chain submitter rejected or could not take the settlement.
    SubmissionError,
}

impl ErrorReason {
    /// Returns the stable wire string for this reason.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UnsupportedVersion => "unsupportedVersion",
            Self::SchemeOrNetworkMismatch => "schemeOrNetworkMismatch",
            Self::AmountMismatch => "amountMismatch",
            Self::RecipientMismatch => "recipientMismatch",
            Self::Expired => "expired",
            Self::NonceReused => "nonceReused",
            Self::BadSignature => "badSignature",
            Self::Malformed => "malformed",
            Self::SubmissionError => "submissionError",
        }
    }
}

impl Display for ErrorReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of verifying a payment header against a requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    /// The payload matches the requirement and its signature binds the payer.
    Valid {
        /// The address of the payer.
        payer: Address,
    },
    /// The payload was rejected.
    Invalid {
        /// Why verification failed.
        reason: ErrorReason,
        /// The claimed payer, when the header could be decoded.
        payer: Option<Address>,
    },
}

impl VerificationResult {
    /// Constructs a successful verification result.
    #[must_use]
    pub const fn valid(payer: Address) -> Self {
        Self::Valid { payer }
    }

    /// Constructs a failed verification result without a known payer.
    #[must_use]
    pub const fn invalid(reason: ErrorReason) -> Self {
        Self::Invalid {
            reason,
            payer: None,
        }
    }

    /// Constructs a failed verification result for a decoded payer.
    #[must_use]
    pub const fn invalid_with_payer(reason: ErrorReason, payer: Address) -> Self {
        Self::Invalid {
            reason,
            payer: Some(payer),
        }
    }

    /// Returns `true` if verification succeeded.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// Returns the failure reason, if any.
    #[must_use]
    pub const fn reason(&self) -> Option<ErrorReason> {
        match self {
            Self::Valid { .. } => None,
            Self::Invalid { reason, .. } => Some(*reason),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerificationResultWire {
    is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payer: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    invalid_reason: Option<ErrorReason>,
}

impl Serialize for VerificationResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let wire = match self {
            Self::Valid { payer } => VerificationResultWire {
                is_valid: true,
                payer: Some(*payer),
                invalid_reason: None,
            },
            Self::Invalid { reason, payer } => VerificationResultWire {
                is_valid: false,
                payer: *payer,
                invalid_reason: Some(*reason),
            },
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for VerificationResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = VerificationResultWire::deserialize(deserializer)?;
        if wire.is_valid {
            let payer = wire
                .payer
                .ok_or_else(|| serde::de::Error::missing_field("payer"))?;
            Ok(Self::Valid { payer })
        } else {
            let reason = wire
                .invalid_reason
                .ok_or_else(|| serde::de::Error::missing_field("invalidReason"))?;
            Ok(Self::Invalid {
                reason,
                payer: wire.payer,
            })
        }
    }
}

/// Result of settling a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementResult {
    /// The submitter accepted the transfer.
    Success {
        /// The address that paid.
        payer: Address,
        /// Transaction reference returned by the submitter.
        transaction: String,
        /// Network the submitter settled on.
        network: String,
    },
    /// Settlement did not happen.
    Failure {
        /// Why settlement failed.
        reason: ErrorReason,
        /// The network settlement was requested on.
        network: String,
    },
}

impl SettlementResult {
    /// Constructs a failed settlement result.
    #[must_use]
    pub fn failure(reason: ErrorReason, network: impl Into<String>) -> Self {
        Self::Failure {
            reason,
            network: network.into(),
        }
    }

    /// Returns `true` if the settlement succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the failure reason, if any.
    #[must_use]
    pub const fn reason(&self) -> Option<ErrorReason> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { reason, .. } => Some(*reason),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettlementResultWire {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_reason: Option<ErrorReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payer: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transaction: Option<String>,
    network: String,
}

impl Serialize for SettlementResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let wire = match self {
            Self::Success {
                payer,
                transaction,
                network,
            } => SettlementResultWire {
                success: true,
                error_reason: None,
                payer: Some(*payer),
                transaction: Some(transaction.clone()),
                network: network.clone(),
            },
            Self::Failure { reason, network } => SettlementResultWire {
                success: false,
                error_reason: Some(*reason),
                payer: None,
                transaction: None,
                network: network.clone(),
            },
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SettlementResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = SettlementResultWire::deserialize(deserializer)?;
        if wire.success {
            let payer = wire
                .payer
                .ok_or_else(|| serde::de::Error::missing_field("payer"))?;
            let transaction = wire
                .transaction
                .ok_or_else(|| serde::de::Error::missing_field("transaction"))?;
            Ok(Self::Success {
                payer,
                transaction,
                network: wire.network,
            })
        } else {
            let reason = wire
                .error_reason
                .ok_or_else(|| serde::de::Error::missing_field("errorReason"))?;
            Ok(Self::Failure {
                reason,
                network: wire.network,
            })
        }
    }
}
