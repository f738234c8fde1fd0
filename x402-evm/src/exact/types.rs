//! EIP-712 typed data for ERC-3009 `transferWithAuthorization`.
//!
//! Both the verifier and the client signer derive the signing hash through
//! [`DomainResolver`], so a payload signed by one is checked by the other over
//! exactly the same domain and message.

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::{Eip712Domain, SolStruct, eip712_domain, sol};
use x402_core::config::EngineConfig;
use x402_core::proto::{ExactAuthorization, PriceRequirement};
use x402_core::verifier::SignatureError;

use crate::networks::{DEFAULT_TOKEN_NAME, DEFAULT_TOKEN_VERSION, EVM_NETWORKS, NetworkRegistry};

sol!(
    /// Solidity-compatible struct definition for ERC-3009 `transferWithAuthorization`.
    ///
    /// Authorizes moving `value` tokens from `from` to `to`, valid strictly
    /// between `validAfter` and `validBefore`, identified by `nonce`.
    #[derive(Debug, PartialEq, Eq)]
    struct TransferWithAuthorization {
        address from;
        address to;
        uint256 value;
        uint256 validAfter;
        uint256 validBefore;
        bytes32 nonce;
    }
);

impl TransferWithAuthorization {
    /// Builds the typed message for `auth`.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::InvalidAmount`] if `auth.value` is not a
    /// decimal integer that fits in 256 bits.
    pub fn try_from_authorization(auth: &ExactAuthorization) -> Result<Self, SignatureError> {
        let value = U256::from_str_radix(&auth.value, 10)
            .map_err(|_| SignatureError::InvalidAmount(auth.value.clone()))?;
        Ok(Self {
            from: auth.from,
            to: auth.to,
            value,
            validAfter: U256::from(auth.valid_after.as_secs()),
            validBefore: U256::from(auth.valid_before.as_secs()),
            nonce: auth.nonce,
        })
    }
}

/// Derives the EIP-712 domain of a requirement.
///
/// The domain is `{name, version, chainId, verifyingContract}` where name and
/// version come from the requirement's `extra` (or the configured defaults),
/// the chain id from the network table, and the verifying contract is the
/// requirement's asset.
#[derive(Debug, Clone)]
pub struct DomainResolver {
    networks: NetworkRegistry,
    default_name: String,
    default_version: String,
}

impl Default for DomainResolver {
    fn default() -> Self {
        Self::new(NetworkRegistry::from_networks(EVM_NETWORKS))
    }
}

impl DomainResolver {
    /// Creates a resolver over `networks` with the USDC domain defaults.
    #[must_use]
    pub fn new(networks: NetworkRegistry) -> Self {
        Self {
            networks,
            default_name: DEFAULT_TOKEN_NAME.to_owned(),
            default_version: DEFAULT_TOKEN_VERSION.to_owned(),
        }
    }

    /// Creates a resolver from configuration: built-in plus configured
    /// networks, and the configured domain defaults.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            networks: NetworkRegistry::from_config(config),
            default_name: config.default_token_name.clone(),
            default_version: config.default_token_version.clone(),
        }
    }

    /// Returns the network table used for chain id lookups.
    #[must_use]
    pub const fn networks(&self) -> &NetworkRegistry {
        &self.networks
    }

    /// Builds the EIP-712 domain for `requirement`.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::UnknownNetwork`] if the network has no chain
    /// id, or [`SignatureError::InvalidAsset`] if the asset is not an address.
    pub fn domain(&self, requirement: &PriceRequirement) -> Result<Eip712Domain, SignatureError> {
        let chain_id = self
            .networks
            .chain_id_by_name(&requirement.network)
            .ok_or_else(|| SignatureError::UnknownNetwork(requirement.network.clone()))?;
        let asset: Address = requirement
            .asset
            .parse()
            .map_err(|_| SignatureError::InvalidAsset(requirement.asset.clone()))?;
        let name = requirement
            .domain_name()
            .unwrap_or(self.default_name.as_str())
            .to_owned();
        let version = requirement
            .domain_version()
            .unwrap_or(self.default_version.as_str())
            .to_owned();

        Ok(eip712_domain! {
            name: name,
            version: version,
            chain_id: chain_id,
            verifying_contract: asset,
        })
    }

    /// Computes the EIP-712 signing hash of `auth` under the domain of `requirement`.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError`] if the domain cannot be built or the value
    /// is not a valid `uint256`.
    pub fn signing_hash(
        &self,
        auth: &ExactAuthorization,
        requirement: &PriceRequirement,
    ) -> Result<B256, SignatureError> {
        let domain = self.domain(requirement)?;
        let message = TransferWithAuthorization::try_from_authorization(auth)?;
        Ok(message.eip712_signing_hash(&domain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, keccak256};
    use x402_core::timestamp::UnixTimestamp;

    fn requirement() -> PriceRequirement {
        PriceRequirement::exact(
            "base-sepolia",
            "1000000",
            "0x209693Bc6afc0C5328bA36FaF03C514EF312287C",
            "0x036CbD53842c5426634e7929541eC2318f3dCF7e",
        )
    }

    fn authorization() -> ExactAuthorization {
        ExactAuthorization {
            from: address!("0x857b06519E91e3A54538791bDbb0E22373e36b66"),
            to: address!("0x209693Bc6afc0C5328bA36FaF03C514EF312287C"),
            value: "1000000".to_owned(),
            valid_after: UnixTimestamp::from_secs(1_740_672_089),
            valid_before: UnixTimestamp::from_secs(1_740_672_154),
            nonce: B256::repeat_byte(0x5a),
        }
    }

    #[test]
    fn test_type_string_matches_erc3009() {
        let expected = "TransferWithAuthorization(address from,address to,uint256 value,uint256 validAfter,uint256 validBefore,bytes32 nonce)";
        assert_eq!(TransferWithAuthorization::eip712_encode_type(), expected);
        assert_eq!(
            TransferWithAuthorization::try_from_authorization(&authorization())
                .unwrap()
                .eip712_type_hash(),
            keccak256(expected)
        );
    }

    #[test]
    fn test_domain_defaults_to_usdc() {
        let domain = DomainResolver::default().domain(&requirement()).unwrap();
        assert_eq!(domain.name.as_deref(), Some("USD Coin"));
        assert_eq!(domain.version.as_deref(), Some("2"));
        assert_eq!(domain.chain_id, Some(U256::from(84532)));
        assert_eq!(
            domain.verifying_contract,
            Some(address!("0x036CbD53842c5426634e7929541eC2318f3dCF7e"))
        );
    }

    #[test]
    fn test_domain_uses_requirement_extra() {
        let req = requirement().with_domain("USDC", "1");
        let domain = DomainResolver::default().domain(&req).unwrap();
        assert_eq!(domain.name.as_deref(), Some("USDC"));
        assert_eq!(domain.version.as_deref(), Some("1"));
    }

    #[test]
    fn test_domain_defaults_follow_config() {
        let config = EngineConfig {
            default_token_name: "Bridged USDC".to_owned(),
            ..EngineConfig::default()
        };
        let domain = DomainResolver::from_config(&config).domain(&requirement()).unwrap();
        assert_eq!(domain.name.as_deref(), Some("Bridged USDC"));
    }

    #[test]
    fn test_domain_rejects_unknown_network_and_bad_asset() {
        let resolver = DomainResolver::default();
        let mut req = requirement();
        req.network = "mars".to_owned();
        assert_eq!(
            resolver.domain(&req).unwrap_err(),
            SignatureError::UnknownNetwork("mars".to_owned())
        );

        let mut req = requirement();
        req.asset = "0xUSDC".to_owned();
        assert_eq!(
            resolver.domain(&req).unwrap_err(),
            SignatureError::InvalidAsset("0xUSDC".to_owned())
        );
    }

    #[test]
    fn test_signing_hash_binds_every_field() {
        let resolver = DomainResolver::default();
        let req = requirement();
        let base = resolver.signing_hash(&authorization(), &req).unwrap();

        let mut other = authorization();
        other.value = "1000001".to_owned();
        assert_ne!(resolver.signing_hash(&other, &req).unwrap(), base);

        let mut other = authorization();
        other.valid_after = UnixTimestamp::from_secs(0);
        assert_ne!(resolver.signing_hash(&other, &req).unwrap(), base);

        let mut on_mainnet = req.clone();
        on_mainnet.network = "base".to_owned();
        assert_ne!(resolver.signing_hash(&authorization(), &on_mainnet).unwrap(), base);
    }

    #[test]
    fn test_signing_hash_rejects_non_integer_value() {
        let mut auth = authorization();
        auth.value = "1.5".to_owned();
        assert_eq!(
            DomainResolver::default()
                .signing_hash(&auth, &requirement())
                .unwrap_err(),
            SignatureError::InvalidAmount("1.5".to_owned())
        );
    }
}
