//! Signer recovery for ERC-3009 `exact` payloads.

use alloy_primitives::{Address, Signature};
#[cfg(feature = "telemetry")]
use tracing::instrument;
use x402_core::config::EngineConfig;
use x402_core::proto::{ExactPayload, PriceRequirement};
use x402_core::verifier::{SignatureError, SignatureVerifier};

use super::types::DomainResolver;
use crate::networks::NetworkRegistry;

/// Verifies EOA signatures over `TransferWithAuthorization` typed data.
///
/// Accepts 65-byte `r || s || v` signatures and 64-byte ERC-2098 compact
/// signatures. The signer is recovered from the EIP-712 signing hash and must
/// equal the authorization's `from`.
#[derive(Debug, Clone, Default)]
pub struct Eip3009Verifier {
    resolver: DomainResolver,
}

impl Eip3009Verifier {
    /// Creates a verifier over the built-in networks and USDC domain defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a verifier over a custom network table.
    #[must_use]
    pub fn with_networks(networks: NetworkRegistry) -> Self {
        Self {
            resolver: DomainResolver::new(networks),
        }
    }

    /// Creates a verifier from configuration.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            resolver: DomainResolver::from_config(config),
        }
    }

    /// Returns the domain resolver this verifier checks signatures under.
    #[must_use]
    pub const fn resolver(&self) -> &DomainResolver {
        &self.resolver
    }
}

fn parse_signature(bytes: &[u8]) -> Result<Signature, SignatureError> {
    match bytes.len() {
        65 => Signature::from_raw(bytes).map_err(|e| SignatureError::Recovery(e.to_string())),
        64 => Ok(Signature::from_erc2098(bytes)),
        len => Err(SignatureError::MalformedSignature(len)),
    }
}

impl SignatureVerifier for Eip3009Verifier {
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(
        network = %requirement.network,
        from = %payload.authorization.from,
    )))]
    fn verify(
        &self,
        payload: &ExactPayload,
        requirement: &PriceRequirement,
    ) -> Result<Address, SignatureError> {
        let hash = self
            .resolver
            .signing_hash(&payload.authorization, requirement)?;
        let signature = parse_signature(&payload.signature)?;
        let recovered = signature
            .recover_address_from_prehash(&hash)
            .map_err(|e| SignatureError::Recovery(e.to_string()))?;

        let expected = payload.authorization.from;
        if recovered == expected {
            Ok(recovered)
        } else {
            Err(SignatureError::SignerMismatch {
                expected,
                recovered,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{B256, Bytes};
    use alloy_signer::SignerSync;
    use alloy_signer_local::PrivateKeySigner;
    use x402_core::proto::ExactAuthorization;
    use x402_core::timestamp::UnixTimestamp;

    fn requirement() -> PriceRequirement {
        PriceRequirement::exact(
            "base-sepolia",
            "1000000",
            "0x209693Bc6afc0C5328bA36FaF03C514EF312287C",
            "0x036CbD53842c5426634e7929541eC2318f3dCF7e",
        )
    }

    fn signed(signer: &PrivateKeySigner, req: &PriceRequirement) -> ExactPayload {
        let authorization = ExactAuthorization {
            from: signer.address(),
            to: req.pay_to.parse().unwrap(),
            value: req.max_amount_required.clone(),
            valid_after: UnixTimestamp::from_secs(1_700_000_000),
            valid_before: UnixTimestamp::from_secs(1_700_000_300),
            nonce: B256::repeat_byte(0x33),
        };
        let hash = DomainResolver::default()
            .signing_hash(&authorization, req)
            .unwrap();
        let signature = signer.sign_hash_sync(&hash).unwrap();
        ExactPayload {
            signature: Bytes::from(signature.as_bytes().to_vec()),
            authorization,
        }
    }

    #[test]
    fn test_recovers_payer_of_valid_signature() {
        let signer = PrivateKeySigner::random();
        let req = requirement();
        let payload = signed(&signer, &req);
        assert_eq!(
            Eip3009Verifier::new().verify(&payload, &req),
            Ok(signer.address())
        );
    }

    #[test]
    fn test_accepts_compact_signature() {
        let signer = PrivateKeySigner::random();
        let req = requirement();
        let mut payload = signed(&signer, &req);
        let full = parse_signature(&payload.signature).unwrap();
        payload.signature = Bytes::from(full.as_erc2098().to_vec());
        assert_eq!(payload.signature.len(), 64);
        assert_eq!(
            Eip3009Verifier::new().verify(&payload, &req),
            Ok(signer.address())
        );
    }

    #[test]
    fn test_tampered_fields_break_signature() {
        let signer = PrivateKeySigner::random();
        let req = requirement();
        let verifier = Eip3009Verifier::new();

        let mut payload = signed(&signer, &req);
        payload.authorization.value = "2000000".to_owned();
        assert!(matches!(
            verifier.verify(&payload, &req),
            Err(SignatureError::SignerMismatch { .. })
        ));

        let mut payload = signed(&signer, &req);
        payload.authorization.to = Address::repeat_byte(0x66);
        assert!(matches!(
            verifier.verify(&payload, &req),
            Err(SignatureError::SignerMismatch { .. })
        ));

        let mut payload = signed(&signer, &req);
        payload.authorization.nonce = B256::repeat_byte(0x34);
        assert!(matches!(
            verifier.verify(&payload, &req),
            Err(SignatureError::SignerMismatch { .. })
        ));
    }

    #[test]
    fn test_wrong_claimed_payer_is_rejected() {
        let signer = PrivateKeySigner::random();
        let req = requirement();
        let mut payload = signed(&signer, &req);
        payload.authorization.from = PrivateKeySigner::random().address();
        assert!(verifier_rejects(&payload, &req));
    }

    #[test]
    fn test_domain_name_is_bound() {
        let signer = PrivateKeySigner::random();
        let req = requirement();
        let payload = signed(&signer, &req);
        let renamed = req.with_domain("Not USDC", "2");
        assert!(verifier_rejects(&payload, &renamed));
    }

    #[test]
    fn test_malformed_signatures_are_errors() {
        let signer = PrivateKeySigner::random();
        let req = requirement();
        let verifier = Eip3009Verifier::new();

        let mut payload = signed(&signer, &req);
        payload.signature = Bytes::from(vec![0x01, 0x02, 0x03]);
        assert_eq!(
            verifier.verify(&payload, &req),
            Err(SignatureError::MalformedSignature(3))
        );

        payload.signature = Bytes::from(vec![0u8; 65]);
        assert!(verifier.verify(&payload, &req).is_err());

        payload.signature = Bytes::new();
        assert_eq!(
            verifier.verify(&payload, &req),
            Err(SignatureError::MalformedSignature(0))
        );
    }

    #[test]
    fn test_unknown_network_is_explicit() {
        let signer = PrivateKeySigner::random();
        let req = requirement();
        let payload = signed(&signer, &req);
        let mut elsewhere = req;
        elsewhere.network = "mars".to_owned();
        assert_eq!(
            Eip3009Verifier::new().verify(&payload, &elsewhere),
            Err(SignatureError::UnknownNetwork("mars".to_owned()))
        );
    }

    #[test]
    fn test_configured_network_is_served() {
        let mut config = EngineConfig::default();
        config.networks.insert("local-anvil".to_owned(), 31337);
        let mut req = requirement();
        req.network = "local-anvil".to_owned();

        let signer = PrivateKeySigner::random();
        let authorization = signed(&signer, &requirement()).authorization;
        let verifier = Eip3009Verifier::from_config(&config);
        let hash = verifier
            .resolver()
            .signing_hash(&authorization, &req)
            .unwrap();
        let payload = ExactPayload {
            signature: Bytes::from(signer.sign_hash_sync(&hash).unwrap().as_bytes().to_vec()),
            authorization,
        };
        assert_eq!(verifier.verify(&payload, &req), Ok(signer.address()));
    }

    fn verifier_rejects(payload: &ExactPayload, req: &PriceRequirement) -> bool {
        matches!(
            Eip3009Verifier::new().verify(payload, req),
            Err(SignatureError::SignerMismatch { .. })
        )
    }
}
