//! EVM network names and their EIP-155 chain ids.
//!
//! x402 v1 names networks by a short human-readable string. The chain id that
//! goes into the EIP-712 domain is looked up here, by the verifier and by the
//! client signer alike, so both sides bind the same domain.

use std::collections::HashMap;

use x402_core::config::EngineConfig;

/// A known network and its EIP-155 chain id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkInfo {
    /// Human-readable network name (e.g. `"base-sepolia"`).
    pub name: &'static str,
    /// EIP-155 chain id.
    pub chain_id: u64,
}

/// Built-in EVM networks.
pub static EVM_NETWORKS: &[NetworkInfo] = &[
    NetworkInfo { name: "base", chain_id: 8453 },
    NetworkInfo { name: "base-sepolia", chain_id: 84532 },
    NetworkInfo { name: "avalanche", chain_id: 43114 },
    NetworkInfo { name: "avalanche-fuji", chain_id: 43113 },
    NetworkInfo { name: "polygon", chain_id: 137 },
    NetworkInfo { name: "polygon-amoy", chain_id: 80002 },
    NetworkInfo { name: "sei", chain_id: 1329 },
    NetworkInfo { name: "sei-testnet", chain_id: 1328 },
    NetworkInfo { name: "iotex", chain_id: 4689 },
    NetworkInfo { name: "peaq", chain_id: 3338 },
    NetworkInfo { name: "ethereum", chain_id: 1 },
    NetworkInfo { name: "sepolia", chain_id: 11_155_111 },
    NetworkInfo { name: "celo", chain_id: 42220 },
];

/// Default EIP-712 domain name for USDC.
pub const DEFAULT_TOKEN_NAME: &str = "USD Coin";

/// Default EIP-712 domain version for USDC.
pub const DEFAULT_TOKEN_VERSION: &str = "2";

/// Lookup table from network name to chain id.
///
/// Names are matched exactly. Unknown names resolve to `None`; callers decide
/// how to reject them.
///
/// # Example
///
/// ```
/// use x402_evm::networks::{EVM_NETWORKS, NetworkRegistry};
///
/// let registry = NetworkRegistry::from_networks(EVM_NETWORKS);
/// assert_eq!(registry.chain_id_by_name("base-sepolia"), Some(84532));
/// assert_eq!(registry.chain_id_by_name("mars"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct NetworkRegistry {
    name_to_chain_id: HashMap<String, u64>,
}

impl NetworkRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-populated from a network info slice.
    #[must_use]
    pub fn from_networks(networks: &[NetworkInfo]) -> Self {
        let mut registry = Self {
            name_to_chain_id: HashMap::with_capacity(networks.len()),
        };
        registry.register(networks);
        registry
    }

    /// Creates a registry of the built-in networks plus those in `config`.
    ///
    /// A configured name that is also built in overrides the built-in id.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut registry = Self::from_networks(EVM_NETWORKS);
        for (name, chain_id) in &config.networks {
            registry.insert(name.clone(), *chain_id);
        }
        registry
    }

    /// Registers additional networks into this registry.
    pub fn register(&mut self, networks: &[NetworkInfo]) {
        for info in networks {
            self.insert(info.name, info.chain_id);
        }
    }

    /// Builder-style method: registers additional networks and returns `self`.
    #[must_use]
    pub fn with_networks(mut self, networks: &[NetworkInfo]) -> Self {
        self.register(networks);
        self
    }

    /// Registers a single network, replacing any previous id for `name`.
    pub fn insert(&mut self, name: impl Into<String>, chain_id: u64) {
        self.name_to_chain_id.insert(name.into(), chain_id);
    }

    /// Looks up the chain id of a network by name.
    #[must_use]
    pub fn chain_id_by_name(&self, name: &str) -> Option<u64> {
        self.name_to_chain_id.get(name).copied()
    }

    /// Returns the number of registered networks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.name_to_chain_id.len()
    }

    /// Returns `true` if no networks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name_to_chain_id.is_empty()
    }
}
