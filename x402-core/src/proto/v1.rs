//! Protocol version 1 wire types.
//!
//! Version 1 identifies networks by human-readable name (e.g. `"base-sepolia"`)
//! and carries the scheme tag next to the scheme-specific body:
//!
//! ```json
//! {"x402Version": 1, "scheme": "exact", "network": "base-sepolia", "payload": {...}}
//! ```
//!
//! # Key Types
//!
//! - [`PriceRequirement`] - Payment terms set by the resource owner
//! - [`PaymentPayload`] - Signed payment authorization from the buyer
//! - [`SchemePayload`] - Scheme-tagged body of a payload
//! - [`ExactPayload`] / [`ExactAuthorization`] - ERC-3009 body of the `exact` scheme

use alloy_primitives::{Address, B256, Bytes};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::timestamp::UnixTimestamp;

/// The only protocol version this crate verifies.
pub const X402_VERSION: u64 = 1;

/// Identifier of the ERC-3009 `exact` payment scheme.
pub const EXACT_SCHEME: &str = "exact";

/// Default validity window, in seconds, for requirements built with [`PriceRequirement::exact`].
pub const DEFAULT_MAX_TIMEOUT_SECONDS: u64 = 300;

/// EIP-712 domain metadata attached to a requirement.
///
/// Absent fields fall back to the verifier's configured defaults
/// (`"USD Coin"` / `"2"` unless overridden).
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementExtra {
    /// The token name as used in the EIP-712 domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The token version as used in the EIP-712 domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Payment terms issued by a resource owner for a single challenge.
///
/// Consumed unchanged by the requirement matcher and the signature verifier.
/// `pay_to` and `asset` stay strings: `pay_to` is compared case-insensitively
/// and `asset` is only parsed when the signing domain is built.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRequirement {
    /// The payment scheme (e.g. `"exact"`).
    pub scheme: String,
    /// The network name (e.g. `"base-sepolia"`).
    pub network: String,
    /// Required amount as a decimal integer string in the token's smallest unit.
    pub max_amount_required: String,
    /// The recipient address for payment.
    pub pay_to: String,
    /// The token contract, also the EIP-712 verifying contract.
    pub asset: String,
    /// Maximum time in seconds for payment validity.
    pub max_timeout_seconds: u64,
    /// The resource URL being paid for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    /// Human-readable description of the resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// MIME type of the resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// EIP-712 domain metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<RequirementExtra>,
    /// Optional server-chosen challenge nonce.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

impl PriceRequirement {
    /// Builds an `exact` requirement with the default timeout and no extra data.
    #[must_use]
    pub fn exact(
        network: impl Into<String>,
        max_amount_required: impl Into<String>,
        pay_to: impl Into<String>,
        asset: impl Into<String>,
    ) -> Self {
        Self {
            scheme: EXACT_SCHEME.to_owned(),
            network: network.into(),
            max_amount_required: max_amount_required.into(),
            pay_to: pay_to.into(),
            asset: asset.into(),
            max_timeout_seconds: DEFAULT_MAX_TIMEOUT_SECONDS,
            resource: None,
            description: None,
            mime_type: None,
            extra: None,
            nonce: None,
        }
    }

    /// Sets the EIP-712 domain name and version.
    #[must_use]
    pub fn with_domain(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.extra = Some(RequirementExtra {
            name: Some(name.into()),
            version: Some(version.into()),
        });
        self
    }

    /// Sets the maximum timeout for this requirement.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.max_timeout_seconds = seconds;
        self
    }

    /// Returns the EIP-712 domain name, if the requirement carries one.
    #[must_use]
    pub fn domain_name(&self) -> Option<&str> {
        self.extra.as_ref().and_then(|e| e.name.as_deref())
    }

    /// Returns the EIP-712 domain version, if the requirement carries one.
    #[must_use]
    pub fn domain_version(&self) -> Option<&str> {
        self.extra.as_ref().and_then(|e| e.version.as_deref())
    }
}

/// The ERC-3009 `transferWithAuthorization` parameters signed by the payer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactAuthorization {
    /// The address authorizing the transfer (token owner).
    pub from: Address,
    /// The recipient address for the transfer.
    pub to: Address,
    /// The amount as a decimal integer string in the token's smallest unit.
    pub value: String,
    /// The authorization is not valid before this timestamp.
    pub valid_after: UnixTimestamp,
    /// The authorization is not valid after this timestamp.
    pub valid_before: UnixTimestamp,
    /// A unique 32-byte nonce to prevent replay.
    pub nonce: B256,
}

/// Body of an `exact` scheme payload: the authorization and its signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactPayload {
    /// Detached EIP-712 signature over the authorization.
    pub signature: Bytes,
    /// The structured authorization data that was signed.
    pub authorization: ExactAuthorization,
}

/// Scheme-specific body of a [`PaymentPayload`].
///
/// Each supported scheme is one variant; the wire tag is the payload's
/// `scheme` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemePayload {
    /// ERC-3009 delegated transfer.
    Exact(ExactPayload),
}

impl SchemePayload {
    /// Returns the wire tag of this scheme.
    #[must_use]
    pub const fn scheme(&self) -> &'static str {
        match self {
            Self::Exact(_) => EXACT_SCHEME,
        }
    }

    /// Returns the one-time nonce that binds this payload to a single settlement.
    #[must_use]
    pub const fn nonce(&self) -> B256 {
        match self {
            Self::Exact(p) => p.authorization.nonce,
        }
    }

    /// Returns the time after which this payload can no longer be settled.
    #[must_use]
    pub const fn valid_before(&self) -> UnixTimestamp {
        match self {
            Self::Exact(p) => p.authorization.valid_before,
        }
    }

    /// Returns the address that claims to have signed this payload.
    #[must_use]
    pub const fn payer(&self) -> Address {
        match self {
            Self::Exact(p) => p.authorization.from,
        }
    }
}

/// A signed payment authorization from the buyer, as carried by the payment header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentPayload {
    /// Protocol version claimed by the client. Not restricted at decode time.
    pub x402_version: u64,
    /// The network name (e.g. `"base-sepolia"`).
    pub network: String,
    /// The scheme-tagged signed body.
    pub payload: SchemePayload,
}

impl PaymentPayload {
    /// Wraps an `exact` body into a version 1 payload for `network`.
    #[must_use]
    pub fn exact(network: impl Into<String>, payload: ExactPayload) -> Self {
        Self {
            x402_version: X402_VERSION,
            network: network.into(),
            payload: SchemePayload::Exact(payload),
        }
    }

    /// Returns the scheme tag of the body.
    #[must_use]
    pub const fn scheme(&self) -> &'static str {
        self.payload.scheme()
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentPayloadWire {
    x402_version: u64,
    scheme: String,
    network: String,
    payload: serde_json::Value,
}

impl Serialize for PaymentPayload {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let body = match &self.payload {
            SchemePayload::Exact(p) => serde_json::to_value(p),
        }
        .map_err(serde::ser::Error::custom)?;
        let wire = PaymentPayloadWire {
            x402_version: self.x402_version,
            scheme: self.scheme().to_owned(),
            network: self.network.clone(),
            payload: body,
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PaymentPayload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = PaymentPayloadWire::deserialize(deserializer)?;
        let payload = match wire.scheme.as_str() {
            EXACT_SCHEME => ExactPayload::deserialize(wire.payload)
                .map(SchemePayload::Exact)
                .map_err(serde::de::Error::custom)?,
            other => {
                return Err(serde::de::Error::custom(format!(
                    "unsupported scheme `{other}`"
                )));
            }
        };
        Ok(Self {
            x402_version: wire.x402_version,
            network: wire.network,
            payload,
        })
    }
}
