//! EVM "exact" payment scheme.
//!
//! The `exact` scheme pays a fixed amount with an ERC-3009
//! `transferWithAuthorization` signed as EIP-712 typed data.
//!
//! - [`Eip3009Verifier`] recovers the signer of a payload
//! - [`DomainResolver`] derives the signing domain of a requirement
//! - `client` (feature `client`) signs payloads for a requirement

pub mod types;
pub mod verifier;

#[cfg(feature = "client")]
pub mod client;

pub use types::{DomainResolver, TransferWithAuthorization};
pub use verifier::Eip3009Verifier;
