//! Engine configuration.
//!
//! Loaded from a TOML file. `$VAR` and `${VAR}` references anywhere in the
//! file are replaced from the process environment before parsing.
//!
//! # Example Configuration
//!
//! ```toml
//! retention_grace_seconds = 120
//! default_token_name = "USD Coin"
//! default_token_version = "2"
//!
//! [networks]
//! local-anvil = 31337
//! rollup = "${ROLLUP_CHAIN_ID}"
//! ```
//!
//! # Environment Variables
//!
//! - `X402_CONFIG`: path of the configuration file (default: `x402.toml`)
//! - anything referenced by `$VAR` in the file

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "X402_CONFIG";

/// File read when [`CONFIG_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "x402.toml";

/// Errors from loading an [`EngineConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Tunables shared by the engine and the EVM verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds a consumed nonce is kept after its authorization expires.
    #[serde(default = "default_retention_grace_seconds")]
    pub retention_grace_seconds: u64,

    /// EIP-712 domain name used when a requirement carries none.
    #[serde(default = "default_token_name")]
    pub default_token_name: String,

    /// EIP-712 domain version used when a requirement carries none.
    #[serde(default = "default_token_version")]
    pub default_token_version: String,

    /// Extra network name to chain id entries, added to the built-in table.
    #[serde(default, deserialize_with = "deserialize_networks")]
    pub networks: HashMap<String, u64>,
}

fn default_retention_grace_seconds() -> u64 {
    60
}

fn default_token_name() -> String {
    "USD Coin".to_owned()
}

fn default_token_version() -> String {
    "2".to_owned()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retention_grace_seconds: default_retention_grace_seconds(),
            default_token_name: default_token_name(),
            default_token_version: default_token_version(),
            networks: HashMap::new(),
        }
    }
}

/// Chain ids may be written as integers or, after `$VAR` expansion, as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum ChainIdEntry {
    Number(u64),
    Text(String),
}

fn deserialize_networks<'de, D>(deserializer: D) -> Result<HashMap<String, u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = HashMap::<String, ChainIdEntry>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(name, entry)| {
            let id = match entry {
                ChainIdEntry::Number(id) => id,
                ChainIdEntry::Text(text) => text.trim().parse().map_err(|_| {
                    serde::de::Error::custom(format!(
                        "chain id for `{name}` is not an integer: `{text}`"
                    ))
                })?,
            };
            Ok((name, id))
        })
        .collect()
}

impl EngineConfig {
    /// Loads configuration from the path in `X402_CONFIG`, falling back to
    /// `x402.toml` in the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());
        Self::load_from(path)
    }

    /// Loads configuration from `path`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = if path.exists() {
            std::fs::read_to_string(path)?
        } else {
            String::new()
        };
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text, expanding environment references.
    ///
    /// # Errors
    ///
    /// Returns an error if the expanded text is not valid configuration.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let expanded = expand_vars(content, |name| std::env::var(name).ok());
        Ok(toml::from_str(&expanded)?)
    }
}

/// Replaces `$VAR` and `${VAR}` in `input` using `lookup`.
///
/// References `lookup` cannot resolve are kept verbatim, as is a lone `$`.
fn expand_vars(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, consumed) = if let Some(inner) = after.strip_prefix('{') {
            match inner.find('}') {
                Some(end) => (&inner[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        match (name.is_empty(), lookup(name)) {
            (false, Some(value)) => out.push_str(&value),
            _ => out.push_str(&rest[pos..=pos + consumed]),
        }
        rest = &after[consumed..];
    }

    out.push_str(rest);
    out
}
